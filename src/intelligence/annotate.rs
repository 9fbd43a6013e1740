use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::enums::EntityCategory;

use super::helpers::normalize_condition;
use super::normalize::NameNormalizer;
use super::reference::KnowledgeStore;
use super::types::ClinicalError;

static RE_DOSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:mg|mcg|ml|g|iu|tablets?|drops|puffs|doses)\b").unwrap()
});

/// One entity mention found in free text. Offsets are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub category: EntityCategory,
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Canonical drug or condition name, when one is known.
    pub canonical: Option<String>,
}

/// Named-entity recognition over clinical notes.
pub trait EntityAnnotator: Send + Sync {
    /// Spans in text order, without duplicates.
    fn annotate(&self, text: &str) -> Vec<EntitySpan>;
}

/// Lexicon-driven annotator built from the knowledge store's vocabularies.
pub struct LexiconAnnotator {
    store: Arc<KnowledgeStore>,
    medications: Option<Regex>,
    conditions: Option<Regex>,
}

impl LexiconAnnotator {
    pub fn new(store: Arc<KnowledgeStore>) -> Result<Self, ClinicalError> {
        let mut medication_terms: Vec<String> = Vec::new();
        for drug in store.drugs() {
            medication_terms.push(drug.name.clone());
            medication_terms.extend(drug.brands.iter().cloned());
        }
        medication_terms.extend(store.aliases().map(|(alias, _)| alias.to_string()));
        medication_terms.extend(store.localized_terms().medications.keys().cloned());

        let mut condition_terms: Vec<String> = store.condition_terms().to_vec();
        condition_terms.extend(store.localized_terms().conditions.keys().cloned());

        Ok(Self {
            medications: lexicon_regex(medication_terms)?,
            conditions: lexicon_regex(condition_terms)?,
            store,
        })
    }

    fn medication_spans(&self, text: &str) -> Vec<EntitySpan> {
        let Some(re) = &self.medications else {
            return Vec::new();
        };
        let normalizer = NameNormalizer::new(&self.store);
        re.find_iter(text)
            .map(|m| EntitySpan {
                category: EntityCategory::Medication,
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                canonical: normalizer
                    .normalize(m.as_str())
                    .map(|id| id.as_str().to_string()),
            })
            .collect()
    }

    fn condition_spans(&self, text: &str) -> Vec<EntitySpan> {
        let Some(re) = &self.conditions else {
            return Vec::new();
        };
        let localized = &self.store.localized_terms().conditions;
        re.find_iter(text)
            .map(|m| {
                let english = localized
                    .get(m.as_str())
                    .map(String::as_str)
                    .unwrap_or(m.as_str());
                EntitySpan {
                    category: EntityCategory::Condition,
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    canonical: Some(normalize_condition(english)),
                }
            })
            .collect()
    }
}

impl EntityAnnotator for LexiconAnnotator {
    fn annotate(&self, text: &str) -> Vec<EntitySpan> {
        let dosages = RE_DOSAGE.find_iter(text).map(|m| EntitySpan {
            category: EntityCategory::Dosage,
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
            canonical: None,
        });

        let mut spans: Vec<EntitySpan> = self
            .medication_spans(text)
            .into_iter()
            .chain(self.condition_spans(text))
            .chain(dosages)
            .collect();
        spans.sort_by_key(|s| (s.start, s.end, s.category.as_str()));
        spans.dedup_by(|a, b| a.start == b.start && a.end == b.end && a.category == b.category);
        spans
    }
}

/// Case-insensitive whole-word alternation, longest terms first so the
/// leftmost match is also the longest. None for an empty vocabulary.
fn lexicon_regex(mut terms: Vec<String>) -> Result<Option<Regex>, ClinicalError> {
    terms.retain(|t| !t.trim().is_empty());
    terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    terms.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    if terms.is_empty() {
        return Ok(None);
    }

    let alternation = terms
        .iter()
        .map(|t| regex::escape(t.trim()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
        .map(Some)
        .map_err(|e| ClinicalError::InvalidReferenceData(format!("lexicon pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator() -> LexiconAnnotator {
        LexiconAnnotator::new(Arc::new(KnowledgeStore::load_test())).unwrap()
    }

    fn by_category(spans: &[EntitySpan], category: EntityCategory) -> Vec<&str> {
        spans
            .iter()
            .filter(|s| s.category == category)
            .map(|s| s.text.as_str())
            .collect()
    }

    #[test]
    fn finds_medications_conditions_and_dosages() {
        let text = "Known hypertension. Started Metformin 500 mg BD and Dolo 650 for fever.";
        let spans = annotator().annotate(text);

        assert_eq!(
            by_category(&spans, EntityCategory::Medication),
            vec!["Metformin", "Dolo 650"]
        );
        assert_eq!(
            by_category(&spans, EntityCategory::Condition),
            vec!["hypertension", "fever"]
        );
        assert_eq!(by_category(&spans, EntityCategory::Dosage), vec!["500 mg"]);
    }

    #[test]
    fn spans_carry_canonical_names() {
        let spans = annotator().annotate("Takes Glucophage; history of Renal Impairment");
        let med = spans
            .iter()
            .find(|s| s.category == EntityCategory::Medication)
            .unwrap();
        assert_eq!(med.canonical.as_deref(), Some("metformin"));
        let condition = spans
            .iter()
            .find(|s| s.category == EntityCategory::Condition)
            .unwrap();
        assert_eq!(condition.canonical.as_deref(), Some("renal_impairment"));
    }

    #[test]
    fn spans_are_in_text_order() {
        let spans = annotator().annotate("fever, then crocin 2 tablets");
        let starts: Vec<usize> = spans.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(spans.len(), 3);
    }

    #[test]
    fn no_partial_word_matches() {
        let spans = annotator().annotate("aspirinate glucoses");
        assert!(by_category(&spans, EntityCategory::Medication).is_empty());
    }

    #[test]
    fn localized_condition_maps_to_english() {
        let spans = annotator().annotate("நோயாளிக்கு காய்ச்சல் உள்ளது");
        let condition = spans
            .iter()
            .find(|s| s.category == EntityCategory::Condition)
            .unwrap();
        assert_eq!(condition.canonical.as_deref(), Some("fever"));
    }
}
