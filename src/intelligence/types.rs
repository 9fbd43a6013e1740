use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::FindingCategory;
use crate::models::{DrugIdentity, Finding, ObservationSet};

use super::annotate::EntitySpan;
use super::emergency::EscalationAction;
use super::format::DisplayRecord;

// ---------------------------------------------------------------------------
// DiagnosticReport
// ---------------------------------------------------------------------------

/// Flags and recommendations as two parallel blocks, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub flags: Vec<String>,
    pub recommendations: Vec<String>,
}

impl DiagnosticReport {
    /// Build from diagnostic findings. Other categories are ignored.
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut report = Self::default();
        for finding in findings
            .iter()
            .filter(|f| f.category == FindingCategory::Diagnostic)
        {
            report.flags.push(finding.summary.clone());
            report.recommendations.extend(
                finding
                    .action_steps()
                    .into_iter()
                    .map(|step| format!("→ {}", step)),
            );
        }
        report
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Counts & results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub diagnostic: usize,
    pub interaction: usize,
    pub red_flag: usize,
}

impl FindingCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for f in findings {
            match f.category {
                FindingCategory::Diagnostic => counts.diagnostic += 1,
                FindingCategory::Interaction => counts.interaction += 1,
                FindingCategory::RedFlag => counts.red_flag += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.diagnostic + self.interaction + self.red_flag
    }
}

/// Result of analyzing one free-text clinical note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub observations: ObservationSet,
    /// Medication, condition and dosage mentions.
    pub mentions: Vec<EntitySpan>,
    /// Red flags first, then staged diagnostic findings.
    pub findings: Vec<Finding>,
    pub display: Vec<DisplayRecord>,
    pub diagnostic: DiagnosticReport,
    pub escalations: Vec<EscalationAction>,
    pub counts: FindingCounts,
    pub processing_time_ms: u64,
    pub evaluated_at: NaiveDateTime,
}

/// Result of checking a medication list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionReport {
    /// Ranked by severity, ties in pair-discovery order.
    pub findings: Vec<Finding>,
    pub display: Vec<DisplayRecord>,
    pub recognized: Vec<DrugIdentity>,
    /// Inputs excluded from analysis: unresolved tokens and identities with no monograph.
    pub unrecognized: Vec<String>,
    pub escalations: Vec<EscalationAction>,
    pub processing_time_ms: u64,
    pub evaluated_at: NaiveDateTime,
}

impl InteractionReport {
    /// Distinguishes "no drugs recognized" from "no interactions found".
    pub fn recognized_count(&self) -> usize {
        self.recognized.len()
    }
}

// ---------------------------------------------------------------------------
// ClinicalError
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClinicalError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Reference data load failed ({0}): {1}")]
    ReferenceDataLoad(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    ReferenceDataParse(String, String),

    #[error("Reference data invalid: {0}")]
    InvalidReferenceData(String),
}

// ---------------------------------------------------------------------------
// RuleEngine trait
// ---------------------------------------------------------------------------

/// The clinical rule evaluation engine.
pub trait RuleEngine {
    /// Extract vitals/labs from a note, stage them, and screen for red flags.
    fn analyze_text(&self, text: &str) -> Result<TextAnalysis, ClinicalError>;

    /// Resolve interactions across a medication list, gated by patient conditions.
    fn check_medications(&self, drugs: &[String], conditions: &[String]) -> InteractionReport;
}
