use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{FindingCategory, Severity};

/// Namespace for deterministic finding ids.
const FINDING_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_09a4_3b7e_5d21_9e40_2a8c_71d3_f5b6);

/// A structured, severity-tagged result of one diagnostic rule, interaction rule,
/// or red-flag screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// UUIDv5 over category, rule and subjects; stable across runs.
    pub id: Uuid,
    pub category: FindingCategory,
    pub severity: Severity,
    /// Reference-table key of the rule that produced this finding.
    pub rule_id: String,
    /// Canonical drug names for interactions, condition name otherwise.
    pub subjects: Vec<String>,
    pub summary: String,
    pub rationale: String,
    /// Recommended action. Never empty.
    pub action: String,
    /// Clinical effects, impact statement or literature reference, when known.
    pub evidence: Option<String>,
    pub locale_note: Option<String>,
}

impl Finding {
    pub fn new(
        category: FindingCategory,
        severity: Severity,
        rule_id: &str,
        subjects: Vec<String>,
        summary: String,
        rationale: String,
        action: String,
    ) -> Self {
        let key = format!("{}:{}:{}", category.as_str(), rule_id, subjects.join("+"));
        Self {
            id: Uuid::new_v5(&FINDING_NAMESPACE, key.as_bytes()),
            category,
            severity,
            rule_id: rule_id.to_string(),
            subjects,
            summary,
            rationale,
            action,
            evidence: None,
            locale_note: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Option<String>) -> Self {
        self.evidence = evidence.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_locale_note(mut self, note: Option<String>) -> Self {
        self.locale_note = note;
        self
    }

    /// Action split into its individual steps.
    pub fn action_steps(&self) -> Vec<&str> {
        self.action
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}
