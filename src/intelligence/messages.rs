use crate::models::enums::Measure;
use crate::models::ObservationSet;

use super::helpers::format_measure;

const MEASURES: [Measure; 5] = [
    Measure::Systolic,
    Measure::Diastolic,
    Measure::FastingGlucose,
    Measure::Hba1c,
    Measure::TotalCholesterol,
];

/// Message template builder for findings and rendered reports.
pub struct MessageTemplates;

impl MessageTemplates {
    /// Fill `{measure}` placeholders from observed values. Placeholders with
    /// no observed value are left as written.
    pub fn fill(template: &str, observations: &ObservationSet) -> String {
        MEASURES.iter().fold(template.to_string(), |acc, measure| {
            match observations.measure(*measure) {
                Some(value) => acc.replace(
                    &format!("{{{}}}", measure.as_str()),
                    &format_measure(value),
                ),
                None => acc,
            }
        })
    }

    /// Red-flag summary.
    pub fn red_flag(condition: &str) -> String {
        format!("Red flag: findings suggest possible {}", condition)
    }

    pub fn red_flag_rationale(matched: &[&str]) -> String {
        format!("Note mentions: {}", matched.join(", "))
    }

    /// Pair summary. `headline` is the rule's risk or impact statement.
    pub fn interaction(drug_a: &str, drug_b: &str, headline: &str) -> String {
        format!("{} + {}: {}", drug_a, drug_b, headline)
    }

    /// Allergy cross-reaction summary.
    pub fn allergy(allergen: &str, medications: &[String]) -> String {
        format!(
            "Allergy alert: {} belongs to the {} class flagged as an allergy",
            medications.join(", "),
            allergen,
        )
    }

    pub fn evidence(clinical_effects: &str, references: &str) -> Option<String> {
        match (clinical_effects.trim(), references.trim()) {
            ("", "") => None,
            (effects, "") => Some(effects.to_string()),
            ("", refs) => Some(format!("Source: {}", refs)),
            (effects, refs) => Some(format!("{} (Source: {})", effects, refs)),
        }
    }

    /// Shown when an analysis produced no findings.
    pub fn no_findings() -> &'static str {
        "No significant clinical findings detected"
    }

    /// Escalation banner for an emergency finding.
    pub fn escalation_banner(summary: &str) -> String {
        format!("Urgent: {}. Review before any other finding.", summary)
    }
}
