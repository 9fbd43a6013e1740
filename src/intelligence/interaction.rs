use crate::models::enums::FindingCategory;
use crate::models::{DrugIdentity, DrugMonograph, Finding};

use super::helpers::{clean_token, pair_subjects};
use super::messages::MessageTemplates;
use super::normalize::NameNormalizer;
use super::reference::{AllergyRule, InteractionRecord, KnowledgeStore};
use super::rules::InferredInteraction;

/// Pseudo-drug token meaning "patient has a recorded allergy". Allergy
/// findings carry it as their first subject.
pub const ALLERGY_MARKER: &str = "allergy";

/// Note topic used when a rule has no note of its own.
const GENERAL_INTERACTION_TOPIC: &str = "interaction";

const DIRECT_RULE_ID: &str = "drug_interaction";

/// Findings plus the recognized/unrecognized split of the input list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionOutcome {
    pub findings: Vec<Finding>,
    /// Deduplicated, in input order.
    pub recognized: Vec<DrugIdentity>,
    pub unrecognized: Vec<String>,
}

/// Resolve interactions across a medication list.
///
/// Unrecognized names are excluded without error. Findings are ranked by
/// severity, ties kept in discovery order: allergy findings first, then
/// pairs (i, j) with i < j in input order.
pub fn resolve_interactions(
    drugs: &[String],
    conditions: &[String],
    store: &KnowledgeStore,
) -> InteractionOutcome {
    let normalizer = NameNormalizer::new(store);
    let mut outcome = InteractionOutcome::default();
    let mut allergy_flagged = false;
    let mut candidates: Vec<String> = Vec::new();

    for raw in drugs {
        let token = clean_token(raw);
        if token.is_empty() {
            continue;
        }
        if token == ALLERGY_MARKER {
            allergy_flagged = true;
            continue;
        }
        // Raw tokens stay candidates so allergy families can match members
        // with no monograph (e.g. "piperacillin").
        candidates.push(token);

        let resolution = normalizer.resolve(raw);
        candidates.push(resolution.key().to_string());
        match resolution.into_identity() {
            Some(identity) if store.drug(&identity).is_some() => {
                if !outcome.recognized.contains(&identity) {
                    outcome.recognized.push(identity);
                }
            }
            _ => {
                let name = raw.trim().to_string();
                tracing::debug!(drug = %name, "Excluded from interaction analysis");
                if !outcome.unrecognized.contains(&name) {
                    outcome.unrecognized.push(name);
                }
            }
        }
    }

    if allergy_flagged {
        outcome
            .findings
            .extend(allergy_findings(&candidates, store));
    }

    let monographs: Vec<(&DrugIdentity, &DrugMonograph)> = outcome
        .recognized
        .iter()
        .filter_map(|id| store.drug(id).map(|m| (id, m)))
        .collect();

    for i in 0..monographs.len() {
        for j in (i + 1)..monographs.len() {
            let (a, drug_a) = monographs[i];
            let (b, drug_b) = monographs[j];
            outcome
                .findings
                .extend(pair_findings(a, drug_a, b, drug_b, conditions, store));
        }
    }

    outcome.findings.sort_by(|x, y| y.severity.cmp(&x.severity));
    outcome
}

/// One finding per allergy rule whose class covers any listed drug.
fn allergy_findings(candidates: &[String], store: &KnowledgeStore) -> Vec<Finding> {
    store
        .allergy_rules()
        .iter()
        .filter_map(|rule| {
            let mut matched: Vec<String> = Vec::new();
            for name in candidates.iter().filter(|c| rule.covers(c)) {
                let display = DrugIdentity::new(name).display();
                if !matched.contains(&display) {
                    matched.push(display);
                }
            }
            (!matched.is_empty()).then(|| allergy_finding(rule, &matched, store))
        })
        .collect()
}

fn allergy_finding(rule: &AllergyRule, matched: &[String], store: &KnowledgeStore) -> Finding {
    Finding::new(
        FindingCategory::RedFlag,
        rule.severity,
        &rule.id,
        vec![ALLERGY_MARKER.to_string(), clean_token(&rule.allergen)],
        MessageTemplates::allergy(&rule.allergen, matched),
        format!("{}. Risk: {}", rule.mechanism, rule.risk),
        rule.management.clone(),
    )
    .with_evidence(MessageTemplates::evidence(&rule.clinical_effects, &rule.references))
    .with_locale_note(note_for(&rule.id, store))
}

/// Direct rule if one exists, otherwise fallback inference; condition-gated
/// rules always run.
fn pair_findings(
    a: &DrugIdentity,
    drug_a: &DrugMonograph,
    b: &DrugIdentity,
    drug_b: &DrugMonograph,
    conditions: &[String],
    store: &KnowledgeStore,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    let direct = store.interaction(a, b);

    if let Some(record) = direct {
        findings.push(direct_finding(a, b, record, store));
    }

    for rule in store.inference_rules() {
        if direct.is_some() && rule.is_fallback() {
            continue;
        }
        if let Some(hit) = rule.evaluate(drug_a, drug_b, conditions) {
            findings.push(inferred_finding(a, b, hit, store));
        }
    }
    findings
}

fn direct_finding(
    a: &DrugIdentity,
    b: &DrugIdentity,
    record: &InteractionRecord,
    store: &KnowledgeStore,
) -> Finding {
    let subjects = pair_subjects(a, b);
    let summary = MessageTemplates::interaction(
        &DrugIdentity::new(&subjects[0]).display(),
        &DrugIdentity::new(&subjects[1]).display(),
        &record.risk,
    );
    Finding::new(
        FindingCategory::Interaction,
        record.severity,
        DIRECT_RULE_ID,
        subjects,
        summary,
        record.mechanism.clone(),
        record.management.clone(),
    )
    .with_evidence(MessageTemplates::evidence(&record.clinical_effects, &record.references))
    .with_locale_note(note_for(DIRECT_RULE_ID, store))
}

fn inferred_finding(
    a: &DrugIdentity,
    b: &DrugIdentity,
    hit: InferredInteraction,
    store: &KnowledgeStore,
) -> Finding {
    let subjects = pair_subjects(a, b);
    let summary = MessageTemplates::interaction(
        &DrugIdentity::new(&subjects[0]).display(),
        &DrugIdentity::new(&subjects[1]).display(),
        &hit.impact,
    );
    let note = note_for(&hit.rule_id, store);
    Finding::new(
        FindingCategory::Interaction,
        hit.severity,
        &hit.rule_id,
        subjects,
        summary,
        hit.mechanism,
        hit.management,
    )
    .with_evidence(Some(hit.impact))
    .with_locale_note(note)
}

fn note_for(topic: &str, store: &KnowledgeStore) -> Option<String> {
    store
        .locale_note(topic)
        .or_else(|| store.locale_note(GENERAL_INTERACTION_TOPIC))
        .map(str::to_string)
}
