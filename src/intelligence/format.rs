use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{FindingCategory, Severity};
use crate::models::Finding;

use super::messages::MessageTemplates;

/// A finding laid out for display. `rank` is 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub finding_id: Uuid,
    pub rank: usize,
    pub category: FindingCategory,
    pub severity: Severity,
    pub heading: String,
    pub lines: Vec<String>,
    pub locale_note: Option<String>,
}

/// Lay out findings in the order given. Never drops or reorders a finding.
pub fn format_findings(findings: &[Finding]) -> Vec<DisplayRecord> {
    findings
        .iter()
        .enumerate()
        .map(|(i, finding)| format_finding(i + 1, finding))
        .collect()
}

fn format_finding(rank: usize, finding: &Finding) -> DisplayRecord {
    let mut lines = Vec::new();
    if !finding.rationale.trim().is_empty() {
        lines.push(format!("Why: {}", finding.rationale.trim()));
    }
    for step in finding.action_steps() {
        lines.push(format!("→ {}", step));
    }
    if let Some(evidence) = &finding.evidence {
        lines.push(format!("Evidence: {}", evidence));
    }

    DisplayRecord {
        finding_id: finding.id,
        rank,
        category: finding.category,
        severity: finding.severity,
        heading: format!(
            "[{}] {}",
            finding.severity.as_str().to_uppercase(),
            finding.summary
        ),
        lines,
        locale_note: finding.locale_note.clone(),
    }
}

/// Plain-text report. An empty record list renders the no-findings line.
pub fn render_text(records: &[DisplayRecord]) -> String {
    if records.is_empty() {
        return MessageTemplates::no_findings().to_string();
    }

    records
        .iter()
        .map(|record| {
            let mut block = vec![format!("{}. {}", record.rank, record.heading)];
            block.extend(record.lines.iter().map(|l| format!("   {}", l)));
            if let Some(note) = &record.locale_note {
                block.push(format!("   Local resource: {}", note));
            }
            block.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
