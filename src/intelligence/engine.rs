use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;

use super::annotate::{EntityAnnotator, LexiconAnnotator};
use super::diagnostic::{classify, detect_red_flags, ranked_text_findings};
use super::emergency::EmergencyProtocol;
use super::extraction::extract;
use super::format::format_findings;
use super::interaction::resolve_interactions;
use super::reference::KnowledgeStore;
use super::types::{
    ClinicalError, DiagnosticReport, FindingCounts, InteractionReport, RuleEngine, TextAnalysis,
};

/// Default implementation of the rule engine.
/// Runs extraction, red-flag screening, staging and interaction resolution
/// against one shared knowledge store.
pub struct DefaultRuleEngine {
    pub(crate) store: Arc<KnowledgeStore>,
    pub(crate) annotator: Box<dyn EntityAnnotator>,
}

impl DefaultRuleEngine {
    pub fn new(store: Arc<KnowledgeStore>) -> Result<Self, ClinicalError> {
        let annotator = LexiconAnnotator::new(Arc::clone(&store))?;
        Ok(Self::with_annotator(store, Box::new(annotator)))
    }

    /// Swap in a different NER collaborator.
    pub fn with_annotator(store: Arc<KnowledgeStore>, annotator: Box<dyn EntityAnnotator>) -> Self {
        Self { store, annotator }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ClinicalError> {
        Self::new(Arc::new(KnowledgeStore::from_config(config)?))
    }

    /// Engine over the process-wide store.
    pub fn shared() -> Result<Self, ClinicalError> {
        Self::new(KnowledgeStore::shared()?)
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }
}

impl RuleEngine for DefaultRuleEngine {
    fn analyze_text(&self, text: &str) -> Result<TextAnalysis, ClinicalError> {
        let start = Instant::now();

        let observations = extract(text)?;
        let mentions = self.annotator.annotate(text);
        let red_flags = detect_red_flags(text, &self.store);
        let staged = classify(&observations, &self.store);

        let diagnostic = DiagnosticReport::from_findings(&staged);
        let findings = ranked_text_findings(red_flags, staged);
        let counts = FindingCounts::tally(&findings);
        let display = format_findings(&findings);
        let escalations = EmergencyProtocol::process_findings(&findings);

        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            observations = observations.len(),
            mentions = mentions.len(),
            diagnostic = counts.diagnostic,
            red_flags = counts.red_flag,
            escalations = escalations.len(),
            processing_ms = processing_time_ms,
            "Text analysis complete"
        );

        Ok(TextAnalysis {
            observations,
            mentions,
            findings,
            display,
            diagnostic,
            escalations,
            counts,
            processing_time_ms,
            evaluated_at: chrono::Local::now().naive_local(),
        })
    }

    fn check_medications(&self, drugs: &[String], conditions: &[String]) -> InteractionReport {
        let start = Instant::now();

        let outcome = resolve_interactions(drugs, conditions, &self.store);
        let display = format_findings(&outcome.findings);
        let escalations = EmergencyProtocol::process_findings(&outcome.findings);

        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            submitted = drugs.len(),
            recognized = outcome.recognized.len(),
            unrecognized = outcome.unrecognized.len(),
            findings = outcome.findings.len(),
            processing_ms = processing_time_ms,
            "Medication check complete"
        );

        InteractionReport {
            findings: outcome.findings,
            display,
            recognized: outcome.recognized,
            unrecognized: outcome.unrecognized,
            escalations,
            processing_time_ms,
            evaluated_at: chrono::Local::now().naive_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::annotate::EntitySpan;
    use crate::intelligence::emergency::EscalationType;
    use crate::intelligence::format::render_text;
    use crate::models::enums::{FindingCategory, Severity};

    fn engine() -> DefaultRuleEngine {
        DefaultRuleEngine::new(Arc::new(KnowledgeStore::load_test())).unwrap()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Three triggers in one note stay three findings.
    #[test]
    fn end_to_end_note_yields_three_distinct_findings() {
        let analysis = engine()
            .analyze_text("BP: 150/95 mmHg, fasting glucose: 140 mg/dL, HbA1c: 7.2%")
            .unwrap();

        let rules: Vec<&str> = analysis.findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(rules, vec!["hypertension", "diabetes_glucose", "diabetes_hba1c"]);
        assert!(analysis.findings[0].summary.contains("Stage 2"));
        assert!(analysis.findings[2].summary.contains("Diabetes Confirmed"));
        assert_eq!(analysis.counts.diagnostic, 3);
        assert_eq!(analysis.diagnostic.flags.len(), 3);
        assert_eq!(analysis.display.len(), 3);
        assert!(analysis.escalations.is_empty());
        assert!(analysis
            .diagnostic
            .recommendations
            .iter()
            .all(|r| r.starts_with("→ ")));
    }

    #[test]
    fn empty_note_is_error() {
        assert_eq!(engine().analyze_text("   ").unwrap_err(), ClinicalError::EmptyInput);
    }

    #[test]
    fn quiet_note_renders_no_findings() {
        let analysis = engine()
            .analyze_text("BP: 118/76 mmHg, HbA1c: 5.2%")
            .unwrap();
        assert!(analysis.findings.is_empty());
        assert_eq!(
            render_text(&analysis.display),
            "No significant clinical findings detected"
        );
    }

    #[test]
    fn chest_pain_note_escalates_ahead_of_staging() {
        let analysis = engine()
            .analyze_text("c/o chest pain. BP: 132/85 mmHg")
            .unwrap();
        assert_eq!(analysis.findings[0].category, FindingCategory::RedFlag);
        assert_eq!(analysis.findings[0].severity, Severity::Emergency);
        assert_eq!(analysis.findings[1].rule_id, "hypertension");
        assert_eq!(analysis.escalations.len(), 1);
        assert_eq!(
            analysis.escalations[0].escalation,
            EscalationType::SuspectedAcuteEvent
        );
        // Red flags stay out of the staging blocks.
        assert_eq!(analysis.diagnostic.flags.len(), 1);
    }

    #[test]
    fn analysis_reports_mentions() {
        let analysis = engine()
            .analyze_text("On Glucophage 500 mg. HbA1c: 6.0%")
            .unwrap();
        let meds: Vec<&EntitySpan> = analysis
            .mentions
            .iter()
            .filter(|m| m.canonical.as_deref() == Some("metformin"))
            .collect();
        assert_eq!(meds.len(), 1);
    }

    #[test]
    fn medication_check_reports_recognized_subset() {
        let report = engine().check_medications(&names(&["metformin", "zzzdrugname"]), &[]);
        assert!(report.findings.is_empty());
        assert_eq!(report.recognized_count(), 1);
        assert_eq!(report.unrecognized, vec!["zzzdrugname".to_string()]);
    }

    #[test]
    fn medication_check_escalates_allergy() {
        let report = engine().check_medications(&names(&["Amoxicillin", "allergy"]), &[]);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.escalations.len(), 1);
        assert_eq!(report.escalations[0].escalation, EscalationType::AllergyMatch);
    }

    #[test]
    fn custom_annotator_is_used() {
        struct Silent;
        impl EntityAnnotator for Silent {
            fn annotate(&self, _text: &str) -> Vec<EntitySpan> {
                Vec::new()
            }
        }
        let engine =
            DefaultRuleEngine::with_annotator(Arc::new(KnowledgeStore::load_test()), Box::new(Silent));
        let analysis = engine.analyze_text("Metformin 500 mg").unwrap();
        assert!(analysis.mentions.is_empty());
    }

    #[test]
    fn engine_from_default_config_uses_bundled_data() {
        let engine = DefaultRuleEngine::from_config(&EngineConfig::default()).unwrap();
        assert!(engine.store().drug_info("Ecosprin").is_some());
    }
}
