use serde::{Deserialize, Serialize};

use crate::models::enums::Severity;
use crate::models::DrugMonograph;

use super::helpers::normalize_condition;

/// An interaction derived from monograph data rather than a direct pair rule.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredInteraction {
    pub rule_id: String,
    pub severity: Severity,
    pub mechanism: String,
    pub impact: String,
    pub management: String,
}

/// Closed set of inference rules (loaded from inference_rules.json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionRule {
    SharedMetabolism(SharedMetabolismRule),
    OverlappingToxicity(OverlappingToxicityRule),
    ConditionGated(ConditionGatedRule),
}

impl InteractionRule {
    pub fn id(&self) -> &str {
        match self {
            Self::SharedMetabolism(r) => &r.id,
            Self::OverlappingToxicity(r) => &r.id,
            Self::ConditionGated(r) => &r.id,
        }
    }

    /// Fallback rules only run for pairs with no direct rule.
    /// Condition-gated rules run for every pair.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::ConditionGated(_))
    }

    pub fn evaluate(
        &self,
        a: &DrugMonograph,
        b: &DrugMonograph,
        conditions: &[String],
    ) -> Option<InferredInteraction> {
        // Mechanism text is built from the name-ordered pair so that
        // (a, b) and (b, a) read the same.
        let (a, b) = if b.identity().as_str() < a.identity().as_str() {
            (b, a)
        } else {
            (a, b)
        };
        match self {
            Self::SharedMetabolism(r) => r.evaluate(a, b),
            Self::OverlappingToxicity(r) => r.evaluate(a, b),
            Self::ConditionGated(r) => r.evaluate(a, b, conditions),
        }
    }
}

// ---------------------------------------------------------------------------
// SharedMetabolism
// ---------------------------------------------------------------------------

/// Overlapping CYP enzyme, or one drug cleared renally while the other
/// lists renal toxicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedMetabolismRule {
    pub id: String,
    pub enzyme_prefix: String,
    pub renal_excretion: String,
    pub renal_toxicity: String,
    pub severity: Severity,
    pub impact: String,
    pub management: String,
}

impl SharedMetabolismRule {
    fn evaluate(&self, a: &DrugMonograph, b: &DrugMonograph) -> Option<InferredInteraction> {
        let mechanism = self
            .shared_enzymes(a, b)
            .map(|enzymes| {
                format!(
                    "Both metabolized by {} → altered concentrations",
                    enzymes.join(", ")
                )
            })
            .or_else(|| self.renal_dependency(a, b))
            .or_else(|| self.renal_dependency(b, a))?;

        Some(InferredInteraction {
            rule_id: self.id.clone(),
            severity: self.severity,
            mechanism,
            impact: self.impact.clone(),
            management: self.management.clone(),
        })
    }

    fn shared_enzymes(&self, a: &DrugMonograph, b: &DrugMonograph) -> Option<Vec<String>> {
        let prefix = self.enzyme_prefix.to_lowercase();
        let shared: Vec<String> = a
            .metabolism
            .iter()
            .filter(|path| path.to_lowercase().starts_with(&prefix))
            .filter(|path| b.metabolism.iter().any(|p| p.eq_ignore_ascii_case(path)))
            .cloned()
            .collect();
        (!shared.is_empty()).then_some(shared)
    }

    fn renal_dependency(&self, cleared: &DrugMonograph, toxic: &DrugMonograph) -> Option<String> {
        let excreted = cleared
            .metabolism
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&self.renal_excretion));
        let harms_kidney = toxic
            .side_effects
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&self.renal_toxicity));
        (excreted && harms_kidney).then(|| {
            format!(
                "{} depends on {}, which {} may reduce ({})",
                cleared.identity().display(),
                self.renal_excretion,
                toxic.identity().display(),
                self.renal_toxicity,
            )
        })
    }
}

// ---------------------------------------------------------------------------
// OverlappingToxicity
// ---------------------------------------------------------------------------

/// Shared side effects. Escalates when a shared effect names the marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlappingToxicityRule {
    pub id: String,
    pub severity: Severity,
    pub escalated_severity: Severity,
    pub escalate_marker: String,
    pub impact: String,
    pub management: String,
}

impl OverlappingToxicityRule {
    fn evaluate(&self, a: &DrugMonograph, b: &DrugMonograph) -> Option<InferredInteraction> {
        let common: Vec<String> = a
            .side_effects
            .iter()
            .map(|s| s.to_lowercase())
            .filter(|s| b.side_effects.iter().any(|o| o.eq_ignore_ascii_case(s)))
            .collect();
        if common.is_empty() {
            return None;
        }

        let marker = self.escalate_marker.to_lowercase();
        let severity = if common.iter().any(|s| s.contains(&marker)) {
            self.escalated_severity
        } else {
            self.severity
        };

        Some(InferredInteraction {
            rule_id: self.id.clone(),
            severity,
            mechanism: format!("Additive {} risk", common.join(", ")),
            impact: self.impact.clone(),
            management: self.management.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// ConditionGated
// ---------------------------------------------------------------------------

/// Fires when the patient has `condition` and either drug's contraindication
/// text mentions the marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGatedRule {
    pub id: String,
    pub condition: String,
    pub contraindication_marker: String,
    pub severity: Severity,
    pub impact: String,
    pub management: String,
}

impl ConditionGatedRule {
    fn evaluate(
        &self,
        a: &DrugMonograph,
        b: &DrugMonograph,
        conditions: &[String],
    ) -> Option<InferredInteraction> {
        let wanted = normalize_condition(&self.condition);
        if !conditions.iter().any(|c| normalize_condition(c) == wanted) {
            return None;
        }

        let marker = self.contraindication_marker.to_lowercase();
        let flagged: Vec<&DrugMonograph> = [a, b]
            .into_iter()
            .filter(|d| d.contraindications.to_lowercase().contains(&marker))
            .collect();
        if flagged.is_empty() {
            return None;
        }

        let mut alternatives: Vec<&str> = Vec::new();
        for alt in flagged.iter().flat_map(|d| &d.alternatives) {
            if !alternatives.contains(&alt.as_str()) {
                alternatives.push(alt);
            }
        }
        let management = if alternatives.is_empty() {
            self.management.clone()
        } else {
            format!("{}: {}", self.management, alternatives.join(", "))
        };

        let names: Vec<String> = flagged.iter().map(|d| d.identity().display()).collect();
        Some(InferredInteraction {
            rule_id: self.id.clone(),
            severity: self.severity,
            mechanism: format!(
                "{} contraindicated in {}",
                names.join(" and "),
                wanted.replace('_', " ")
            ),
            impact: self.impact.clone(),
            management,
        })
    }
}
