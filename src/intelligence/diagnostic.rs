use serde::{Deserialize, Serialize};

use crate::models::enums::{Condition, FindingCategory, Measure, Severity};
use crate::models::{Finding, ObservationSet};

use super::messages::MessageTemplates;
use super::reference::KnowledgeStore;

// ---------------------------------------------------------------------------
// Rule table types (loaded from diagnostic_rules.json)
// ---------------------------------------------------------------------------

/// A numeric band over one measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Strictly greater than.
    Above(f64),
    AtLeast(f64),
    /// Inclusive on both ends.
    Between([f64; 2]),
    /// Inclusive low, exclusive high.
    HalfOpen([f64; 2]),
}

impl Threshold {
    pub fn contains(&self, value: f64) -> bool {
        match self {
            Self::Above(min) => value > *min,
            Self::AtLeast(min) => value >= *min,
            Self::Between([low, high]) => value >= *low && value <= *high,
            Self::HalfOpen([low, high]) => value >= *low && value < *high,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub measure: Measure,
    pub threshold: Threshold,
}

impl Criterion {
    /// An absent measure never matches.
    pub fn matches(&self, observations: &ObservationSet) -> bool {
        observations
            .measure(self.measure)
            .is_some_and(|value| self.threshold.contains(value))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

/// A named severity band with its fixed action bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticTier {
    pub label: String,
    pub severity: Severity,
    #[serde(rename = "match", default)]
    pub match_mode: MatchMode,
    pub criteria: Vec<Criterion>,
    /// Summary template; `{measure}` placeholders are filled from observations.
    pub flag: String,
    pub rationale: String,
    pub actions: Vec<String>,
}

impl DiagnosticTier {
    pub fn matches(&self, observations: &ObservationSet) -> bool {
        if self.criteria.is_empty() {
            return false;
        }
        match self.match_mode {
            MatchMode::Any => self.criteria.iter().any(|c| c.matches(observations)),
            MatchMode::All => self.criteria.iter().all(|c| c.matches(observations)),
        }
    }
}

/// Tiers for one trigger, listed from least to most severe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRule {
    pub id: String,
    pub condition: Condition,
    pub tiers: Vec<DiagnosticTier>,
}

impl DiagnosticRule {
    /// The most severe matching tier. A higher tier supersedes a lower one
    /// whose band also matched.
    pub fn evaluate(&self, observations: &ObservationSet) -> Option<&DiagnosticTier> {
        self.tiers.iter().rev().find(|tier| tier.matches(observations))
    }

    fn measures(&self) -> Vec<Measure> {
        let mut measures: Vec<Measure> = Vec::new();
        for criterion in self.tiers.iter().flat_map(|t| &t.criteria) {
            if !measures.contains(&criterion.measure) {
                measures.push(criterion.measure);
            }
        }
        measures
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Stage observations against every diagnostic rule.
/// Output order is condition order (hypertension, diabetes, lipids), then
/// table order within a condition. Text order never matters.
pub fn classify(observations: &ObservationSet, store: &KnowledgeStore) -> Vec<Finding> {
    let mut rules: Vec<&DiagnosticRule> = store.diagnostic_rules().iter().collect();
    rules.sort_by_key(|rule| rule.condition);

    rules
        .into_iter()
        .filter_map(|rule| {
            let tier = rule.evaluate(observations)?;
            tracing::debug!(rule = %rule.id, tier = %tier.label, "Diagnostic tier matched");
            Some(
                Finding::new(
                    FindingCategory::Diagnostic,
                    tier.severity,
                    &rule.id,
                    vec![rule.condition.as_str().to_string()],
                    MessageTemplates::fill(&tier.flag, observations),
                    format!("{}: {}", tier.label, tier.rationale),
                    tier.actions.join("\n"),
                )
                .with_evidence(observed_values(rule, observations))
                .with_locale_note(store.locale_note(&rule.id).map(str::to_string)),
            )
        })
        .collect()
}

/// "Observed: 150/95 mmHg" for the observations a rule reads.
fn observed_values(rule: &DiagnosticRule, observations: &ObservationSet) -> Option<String> {
    let measures = rule.measures();
    let values: Vec<String> = observations
        .iter()
        .filter(|obs| measures.iter().any(|m| obs.measure(*m).is_some()))
        .map(|obs| obs.display_value())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(format!("Observed: {}", values.join(", ")))
    }
}

// ---------------------------------------------------------------------------
// Red-flag screen
// ---------------------------------------------------------------------------

/// Screen text for urgent conditions. Localized condition terms are
/// translated first. One finding per matching condition.
pub fn detect_red_flags(text: &str, store: &KnowledgeStore) -> Vec<Finding> {
    let translated = store.translate_conditions(text).to_lowercase();

    store
        .red_flags()
        .iter()
        .filter_map(|rule| {
            let matched: Vec<&str> = rule
                .phrases
                .iter()
                .map(String::as_str)
                .filter(|phrase| translated.contains(&phrase.to_lowercase()))
                .collect();
            if matched.is_empty() {
                return None;
            }
            tracing::debug!(rule = %rule.id, matched = matched.len(), "Red flag matched");
            Some(
                Finding::new(
                    FindingCategory::RedFlag,
                    rule.severity,
                    &rule.id,
                    vec![rule.condition.clone()],
                    MessageTemplates::red_flag(&rule.condition),
                    MessageTemplates::red_flag_rationale(&matched),
                    rule.action.clone(),
                )
                .with_locale_note(store.locale_note(&rule.id).map(str::to_string)),
            )
        })
        .collect()
}

/// Red flags ranked ahead of routine staging.
pub fn ranked_text_findings(
    red_flags: Vec<Finding>,
    diagnostic: Vec<Finding>,
) -> Vec<Finding> {
    let mut findings = red_flags;
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    findings.extend(diagnostic);
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClinicalObservation;

    fn bp(systolic: u32, diastolic: u32) -> ObservationSet {
        std::iter::once(ClinicalObservation::BloodPressure {
            systolic,
            diastolic,
        })
        .collect()
    }

    fn hba1c(percent: f64) -> ObservationSet {
        std::iter::once(ClinicalObservation::Hba1c { percent }).collect()
    }

    fn stage_of(observations: &ObservationSet, rule_id: &str) -> Option<String> {
        let store = KnowledgeStore::load_test();
        let rule = store
            .diagnostic_rules()
            .iter()
            .find(|r| r.id == rule_id)
            .unwrap();
        rule.evaluate(observations).map(|t| t.label.clone())
    }

    #[test]
    fn threshold_bands() {
        assert!(Threshold::Above(125.0).contains(126.0));
        assert!(!Threshold::Above(125.0).contains(125.0));
        assert!(Threshold::AtLeast(6.5).contains(6.5));
        assert!(Threshold::Between([130.0, 139.0]).contains(139.0));
        assert!(Threshold::HalfOpen([5.7, 6.5]).contains(5.7));
        assert!(!Threshold::HalfOpen([5.7, 6.5]).contains(6.5));
    }

    #[test]
    fn hypertension_examples() {
        assert_eq!(stage_of(&bp(142, 92), "hypertension").as_deref(), Some("Stage 2"));
        assert_eq!(stage_of(&bp(132, 85), "hypertension").as_deref(), Some("Stage 1"));
        assert_eq!(stage_of(&bp(120, 78), "hypertension"), None);
    }

    #[test]
    fn hypertension_stage_two_supersedes_stage_one() {
        // Systolic in the Stage 1 band, diastolic in Stage 2.
        assert_eq!(stage_of(&bp(135, 95), "hypertension").as_deref(), Some("Stage 2"));
        assert_eq!(stage_of(&bp(150, 70), "hypertension").as_deref(), Some("Stage 2"));
    }

    #[test]
    fn hypertension_grid_matches_thresholds() {
        for systolic in (100..=180).step_by(3) {
            for diastolic in (60..=110).step_by(3) {
                let expected = if systolic >= 140 || diastolic >= 90 {
                    Some("Stage 2")
                } else if (130..=139).contains(&systolic) || (80..=89).contains(&diastolic) {
                    Some("Stage 1")
                } else {
                    None
                };
                assert_eq!(
                    stage_of(&bp(systolic, diastolic), "hypertension").as_deref(),
                    expected,
                    "BP {}/{}",
                    systolic,
                    diastolic
                );
            }
        }
    }

    #[test]
    fn hba1c_examples() {
        assert_eq!(
            stage_of(&hba1c(6.8), "diabetes_hba1c").as_deref(),
            Some("Diabetes confirmed")
        );
        assert_eq!(stage_of(&hba1c(6.0), "diabetes_hba1c").as_deref(), Some("Pre-diabetes"));
        assert_eq!(stage_of(&hba1c(5.2), "diabetes_hba1c"), None);
        assert_eq!(
            stage_of(&hba1c(6.5), "diabetes_hba1c").as_deref(),
            Some("Diabetes confirmed")
        );
    }

    #[test]
    fn classify_orders_by_condition_not_text() {
        let store = KnowledgeStore::load_test();
        let observations: ObservationSet = vec![
            ClinicalObservation::Cholesterol { mg_dl: 240 },
            ClinicalObservation::Hba1c { percent: 7.2 },
            ClinicalObservation::FastingGlucose { mg_dl: 140 },
            ClinicalObservation::BloodPressure {
                systolic: 150,
                diastolic: 95,
            },
        ]
        .into_iter()
        .collect();

        let findings = classify(&observations, &store);
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["hypertension", "diabetes_glucose", "diabetes_hba1c", "hyperlipidemia"]
        );
        assert!(findings.iter().all(|f| !f.action.is_empty()));
        assert!(findings[0].summary.contains("150/95"));
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn classify_empty_observations_yields_nothing() {
        let store = KnowledgeStore::load_test();
        assert!(classify(&ObservationSet::new(), &store).is_empty());
    }

    #[test]
    fn red_flag_chest_pain_is_emergency() {
        let store = KnowledgeStore::load_test();
        let findings = detect_red_flags("58M presenting with Chest Pain radiating to arm", &store);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, FindingCategory::RedFlag);
        assert_eq!(findings[0].severity, Severity::Emergency);
        assert_eq!(findings[0].action, "Refer to cardiology immediately");
    }

    #[test]
    fn red_flag_reads_localized_terms() {
        let store = KnowledgeStore::load_test();
        let findings = detect_red_flags("நோயாளிக்கு நெஞ்சு வலி உள்ளது", &store);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "myocardial_infarction");
    }

    #[test]
    fn red_flag_one_finding_per_condition() {
        let store = KnowledgeStore::load_test();
        let findings = detect_red_flags("fever >4 days, platelet <100,000", &store);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "dengue");
        assert!(findings[0].rationale.contains("platelet <100,000"));
    }

    #[test]
    fn ranked_text_findings_puts_red_flags_first() {
        let store = KnowledgeStore::load_test();
        let red = detect_red_flags("fever >4 days and chest pain", &store);
        let diag = classify(&bp(150, 95), &store);
        let ranked = ranked_text_findings(red, diag);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].severity, Severity::Emergency);
        assert_eq!(ranked[1].rule_id, "dengue");
        assert_eq!(ranked[2].category, FindingCategory::Diagnostic);
    }
}
