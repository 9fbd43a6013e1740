use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{FindingCategory, Severity};
use crate::models::Finding;

use super::interaction::ALLERGY_MARKER;
use super::messages::MessageTemplates;

/// Escalation handler for findings that must not wait in a ranked list.
pub struct EmergencyProtocol;

impl EmergencyProtocol {
    /// Emergency-severity findings, plus red flags (allergy matches, acute
    /// event screens) at High or above. Input order is kept.
    pub fn process_findings(findings: &[Finding]) -> Vec<EscalationAction> {
        findings
            .iter()
            .filter(|f| Self::requires_escalation(f))
            .map(|finding| {
                let escalation = Self::classify(finding);
                EscalationAction {
                    finding_id: finding.id,
                    escalation,
                    banner: MessageTemplates::escalation_banner(&finding.summary),
                    next_step: finding
                        .action_steps()
                        .first()
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                    review_priority: true,
                    acknowledgement_steps: match escalation {
                        EscalationType::AllergyMatch | EscalationType::SuspectedAcuteEvent => 2,
                        EscalationType::SevereInteraction => 1,
                    },
                }
            })
            .collect()
    }

    fn requires_escalation(finding: &Finding) -> bool {
        finding.severity == Severity::Emergency
            || (finding.category == FindingCategory::RedFlag && finding.severity >= Severity::High)
    }

    fn classify(finding: &Finding) -> EscalationType {
        let is_allergy = finding.subjects.first().map(String::as_str) == Some(ALLERGY_MARKER);
        match finding.category {
            FindingCategory::RedFlag if is_allergy => EscalationType::AllergyMatch,
            FindingCategory::Interaction => EscalationType::SevereInteraction,
            _ => EscalationType::SuspectedAcuteEvent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationAction {
    pub finding_id: Uuid,
    pub escalation: EscalationType,
    /// Banner shown above all other output.
    pub banner: String,
    /// First recommended action step.
    pub next_step: String,
    /// Whether to move the finding to the top of the clinician's review queue.
    pub review_priority: bool,
    /// Number of confirmations needed before the banner can be cleared.
    pub acknowledgement_steps: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationType {
    SuspectedAcuteEvent,
    AllergyMatch,
    SevereInteraction,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(category: FindingCategory, severity: Severity, subjects: &[&str]) -> Finding {
        Finding::new(
            category,
            severity,
            "rule",
            subjects.iter().map(|s| s.to_string()).collect(),
            "Red flag: findings suggest possible myocardial infarction".into(),
            String::new(),
            "Refer to cardiology immediately\nRecord ECG".into(),
        )
    }

    #[test]
    fn emergency_red_flag_escalates() {
        let f = make(FindingCategory::RedFlag, Severity::Emergency, &["myocardial infarction"]);
        let actions = EmergencyProtocol::process_findings(&[f]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].escalation, EscalationType::SuspectedAcuteEvent);
        assert_eq!(actions[0].acknowledgement_steps, 2);
        assert_eq!(actions[0].next_step, "Refer to cardiology immediately");
        assert!(actions[0].banner.starts_with("Urgent:"));
    }

    #[test]
    fn high_allergy_red_flag_escalates_as_allergy() {
        let f = make(FindingCategory::RedFlag, Severity::High, &[ALLERGY_MARKER, "penicillin"]);
        let actions = EmergencyProtocol::process_findings(&[f]);
        assert_eq!(actions[0].escalation, EscalationType::AllergyMatch);
    }

    #[test]
    fn high_interaction_does_not_escalate() {
        let f = make(FindingCategory::Interaction, Severity::High, &["aspirin", "warfarin"]);
        assert!(EmergencyProtocol::process_findings(&[f]).is_empty());
    }

    #[test]
    fn emergency_interaction_escalates() {
        let f = make(FindingCategory::Interaction, Severity::Emergency, &["a", "b"]);
        let actions = EmergencyProtocol::process_findings(&[f]);
        assert_eq!(actions[0].escalation, EscalationType::SevereInteraction);
        assert_eq!(actions[0].acknowledgement_steps, 1);
    }

    #[test]
    fn routine_findings_skip() {
        let f = make(FindingCategory::Diagnostic, Severity::High, &["hypertension"]);
        assert!(EmergencyProtocol::process_findings(&[f]).is_empty());
    }
}
