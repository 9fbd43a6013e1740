use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::models::enums::Severity;
use crate::models::{DrugIdentity, DrugMonograph};

use super::diagnostic::DiagnosticRule;
use super::helpers::{clean_token, pair_key};
use super::normalize::NameNormalizer;
use super::rules::InteractionRule;
use super::types::ClinicalError;

const MONOGRAPHS_FILE: &str = "drug_monographs.json";
const INTERACTIONS_FILE: &str = "drug_interactions.json";
const ALIASES_FILE: &str = "medication_aliases.json";
const LOCALIZED_FILE: &str = "localized_terms.json";
const CONDITIONS_FILE: &str = "condition_terms.json";
const DIAGNOSTIC_FILE: &str = "diagnostic_rules.json";
const INFERENCE_FILE: &str = "inference_rules.json";
const ALLERGY_FILE: &str = "allergy_rules.json";
const RED_FLAGS_FILE: &str = "red_flags.json";
const LOCALE_NOTES_FILE: &str = "locale_notes.json";

/// Reference tables compiled into the binary.
mod bundled {
    pub const MONOGRAPHS: &str = include_str!("../../resources/drug_monographs.json");
    pub const INTERACTIONS: &str = include_str!("../../resources/drug_interactions.json");
    pub const ALIASES: &str = include_str!("../../resources/medication_aliases.json");
    pub const LOCALIZED: &str = include_str!("../../resources/localized_terms.json");
    pub const CONDITIONS: &str = include_str!("../../resources/condition_terms.json");
    pub const DIAGNOSTIC: &str = include_str!("../../resources/diagnostic_rules.json");
    pub const INFERENCE: &str = include_str!("../../resources/inference_rules.json");
    pub const ALLERGY: &str = include_str!("../../resources/allergy_rules.json");
    pub const RED_FLAGS: &str = include_str!("../../resources/red_flags.json");
    pub const LOCALE_NOTES: &str = include_str!("../../resources/locale_notes.json");
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Direct rule for one unordered drug pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub drugs: Vec<String>,
    pub severity: Severity,
    pub risk: String,
    pub mechanism: String,
    #[serde(default)]
    pub clinical_effects: String,
    pub management: String,
    #[serde(default)]
    pub references: String,
}

/// Cross-reactivity rule fired when the drug list carries the allergy marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllergyRule {
    pub id: String,
    pub allergen: String,
    /// Lowercase members of the allergenic class, allergen included.
    pub family: Vec<String>,
    pub severity: Severity,
    pub risk: String,
    pub mechanism: String,
    #[serde(default)]
    pub clinical_effects: String,
    pub management: String,
    #[serde(default)]
    pub references: String,
}

impl AllergyRule {
    pub fn covers(&self, name: &str) -> bool {
        let name = clean_token(name);
        name == clean_token(&self.allergen) || self.family.iter().any(|f| clean_token(f) == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlagRule {
    pub id: String,
    pub condition: String,
    pub phrases: Vec<String>,
    pub severity: Severity,
    pub action: String,
}

/// Local-language term -> English term, per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedTerms {
    #[serde(default)]
    pub medications: BTreeMap<String, String>,
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
}

/// Raw tables as read from disk, before indexing and validation.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub monographs: Vec<DrugMonograph>,
    pub interactions: Vec<InteractionRecord>,
    pub aliases: BTreeMap<String, String>,
    pub localized: LocalizedTerms,
    pub condition_terms: Vec<String>,
    pub diagnostic_rules: Vec<DiagnosticRule>,
    pub inference_rules: Vec<InteractionRule>,
    pub allergy_rules: Vec<AllergyRule>,
    pub red_flags: Vec<RedFlagRule>,
    /// Locale -> topic -> note.
    pub locale_notes: BTreeMap<String, BTreeMap<String, String>>,
}

impl ReferenceTables {
    /// Read every table from a directory of JSON files.
    pub fn read_dir(dir: &Path) -> Result<Self, ClinicalError> {
        Ok(Self {
            monographs: read_table(dir, MONOGRAPHS_FILE)?,
            interactions: read_table(dir, INTERACTIONS_FILE)?,
            aliases: read_table(dir, ALIASES_FILE)?,
            localized: read_table(dir, LOCALIZED_FILE)?,
            condition_terms: read_table(dir, CONDITIONS_FILE)?,
            diagnostic_rules: read_table(dir, DIAGNOSTIC_FILE)?,
            inference_rules: read_table(dir, INFERENCE_FILE)?,
            allergy_rules: read_table(dir, ALLERGY_FILE)?,
            red_flags: read_table(dir, RED_FLAGS_FILE)?,
            locale_notes: read_table(dir, LOCALE_NOTES_FILE)?,
        })
    }

    /// Parse the tables compiled into the binary.
    pub fn bundled() -> Result<Self, ClinicalError> {
        Ok(Self {
            monographs: parse_table(MONOGRAPHS_FILE, bundled::MONOGRAPHS)?,
            interactions: parse_table(INTERACTIONS_FILE, bundled::INTERACTIONS)?,
            aliases: parse_table(ALIASES_FILE, bundled::ALIASES)?,
            localized: parse_table(LOCALIZED_FILE, bundled::LOCALIZED)?,
            condition_terms: parse_table(CONDITIONS_FILE, bundled::CONDITIONS)?,
            diagnostic_rules: parse_table(DIAGNOSTIC_FILE, bundled::DIAGNOSTIC)?,
            inference_rules: parse_table(INFERENCE_FILE, bundled::INFERENCE)?,
            allergy_rules: parse_table(ALLERGY_FILE, bundled::ALLERGY)?,
            red_flags: parse_table(RED_FLAGS_FILE, bundled::RED_FLAGS)?,
            locale_notes: parse_table(LOCALE_NOTES_FILE, bundled::LOCALE_NOTES)?,
        })
    }
}

fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, ClinicalError> {
    let path = dir.join(file);
    let json = std::fs::read_to_string(&path).map_err(|e| {
        ClinicalError::ReferenceDataLoad(path.display().to_string(), e.to_string())
    })?;
    parse_table(file, &json)
}

fn parse_table<T: DeserializeOwned>(file: &str, json: &str) -> Result<T, ClinicalError> {
    serde_json::from_str(json)
        .map_err(|e| ClinicalError::ReferenceDataParse(file.into(), e.to_string()))
}

// ---------------------------------------------------------------------------
// KnowledgeStore
// ---------------------------------------------------------------------------

static SHARED: OnceLock<Result<Arc<KnowledgeStore>, ClinicalError>> = OnceLock::new();

/// Indexed, validated, read-only reference knowledge.
/// Built once; every evaluation borrows it.
#[derive(Debug)]
pub struct KnowledgeStore {
    monographs: BTreeMap<String, DrugMonograph>,
    interactions: HashMap<(String, String), InteractionRecord>,
    aliases: HashMap<String, String>,
    /// Lowercased brand -> canonical name.
    brands: HashMap<String, String>,
    localized: LocalizedTerms,
    condition_terms: Vec<String>,
    diagnostic_rules: Vec<DiagnosticRule>,
    inference_rules: Vec<InteractionRule>,
    allergy_rules: Vec<AllergyRule>,
    red_flags: Vec<RedFlagRule>,
    locale: Option<String>,
    locale_notes: BTreeMap<String, String>,
}

impl KnowledgeStore {
    /// Load reference data from a directory of JSON files.
    pub fn load(resources_dir: &Path, locale: Option<&str>) -> Result<Self, ClinicalError> {
        let tables = ReferenceTables::read_dir(resources_dir)?;
        let store = Self::from_tables(tables, locale)?;
        tracing::info!(
            dir = %resources_dir.display(),
            drugs = store.monographs.len(),
            interactions = store.interactions.len(),
            "Reference data loaded"
        );
        Ok(store)
    }

    /// Load the reference data compiled into the binary.
    pub fn bundled(locale: Option<&str>) -> Result<Self, ClinicalError> {
        Self::from_tables(ReferenceTables::bundled()?, locale)
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ClinicalError> {
        match &config.resources_dir {
            Some(dir) => Self::load(dir, config.locale.as_deref()),
            None => Self::bundled(config.locale.as_deref()),
        }
    }

    /// Process-wide store, built from the environment on first use.
    /// Concurrent first callers block on a single load; a failed load is
    /// returned to every caller.
    pub fn shared() -> Result<Arc<KnowledgeStore>, ClinicalError> {
        SHARED
            .get_or_init(|| {
                KnowledgeStore::from_config(&EngineConfig::from_env()).map(Arc::new)
            })
            .clone()
    }

    /// Index raw tables and validate them. Any inconsistency fails the load.
    pub fn from_tables(tables: ReferenceTables, locale: Option<&str>) -> Result<Self, ClinicalError> {
        let locale_notes = match locale {
            None => BTreeMap::new(),
            Some(name) => {
                let key = clean_token(name);
                tables.locale_notes.get(&key).cloned().ok_or_else(|| {
                    reject(format!("no resource notes for locale '{}'", key))
                })?
            }
        };

        let mut monographs = BTreeMap::new();
        let mut brands: HashMap<String, String> = HashMap::new();
        for monograph in tables.monographs {
            let name = monograph.identity().as_str().to_string();
            for brand in &monograph.brands {
                let lowered = clean_token(brand);
                if let Some(owner) = brands.get(&lowered) {
                    if owner != &name {
                        return Err(reject(format!(
                            "brand '{}' claimed by both '{}' and '{}'",
                            brand, owner, name
                        )));
                    }
                }
                brands.insert(lowered, name.clone());
            }
            if monographs.insert(name.clone(), monograph).is_some() {
                return Err(reject(format!("duplicate monograph '{}'", name)));
            }
        }

        let mut interactions = HashMap::new();
        for record in tables.interactions {
            let [a, b] = record.drugs.as_slice() else {
                return Err(reject(format!(
                    "interaction rule must name exactly two drugs: {:?}",
                    record.drugs
                )));
            };
            let key = pair_key(a, b);
            if interactions.contains_key(&key) {
                return Err(reject(format!(
                    "duplicate interaction rule for '{}' and '{}'",
                    key.0, key.1
                )));
            }
            interactions.insert(key, record);
        }

        let aliases = tables
            .aliases
            .into_iter()
            .map(|(k, v)| (clean_token(&k), clean_token(&v)))
            .collect();

        let store = Self {
            monographs,
            interactions,
            aliases,
            brands,
            localized: tables.localized,
            condition_terms: tables.condition_terms,
            diagnostic_rules: tables.diagnostic_rules,
            inference_rules: tables.inference_rules,
            allergy_rules: tables.allergy_rules,
            red_flags: tables.red_flags,
            locale: locale.map(clean_token),
            locale_notes,
        };
        store.validate()?;
        Ok(store)
    }

    /// Cross-table consistency checks.
    pub fn validate(&self) -> Result<(), ClinicalError> {
        for rule in &self.diagnostic_rules {
            if rule.tiers.is_empty() {
                return Err(reject(format!("diagnostic rule '{}' has no tiers", rule.id)));
            }
            for tier in &rule.tiers {
                if tier.actions.iter().all(|a| a.trim().is_empty()) {
                    return Err(reject(format!(
                        "tier '{}' of '{}' has no actions",
                        tier.label, rule.id
                    )));
                }
                if tier.criteria.is_empty() {
                    return Err(reject(format!(
                        "tier '{}' of '{}' has no criteria",
                        tier.label, rule.id
                    )));
                }
            }
            if rule.tiers.windows(2).any(|w| w[0].severity > w[1].severity) {
                return Err(reject(format!(
                    "tiers of '{}' must be listed from least to most severe",
                    rule.id
                )));
            }
        }

        for (a, b) in self.interactions.keys() {
            for drug in [a, b] {
                if !self.monographs.contains_key(drug) {
                    return Err(reject(format!(
                        "interaction rule names unknown drug '{}'",
                        drug
                    )));
                }
            }
        }

        for record in self.interactions.values() {
            if record.management.trim().is_empty() {
                return Err(reject(format!(
                    "interaction rule {:?} has no management",
                    record.drugs
                )));
            }
        }

        for (key, target) in &self.aliases {
            if let Some(next) = self.aliases.get(target) {
                if next != target {
                    return Err(reject(format!(
                        "alias '{}' -> '{}' chains to '{}'",
                        key, target, next
                    )));
                }
            }
        }

        for (brand, owner) in &self.brands {
            if self.monographs.contains_key(brand) && brand != owner {
                return Err(reject(format!(
                    "brand '{}' of '{}' collides with a canonical drug name",
                    brand, owner
                )));
            }
        }

        for rule in &self.red_flags {
            if rule.action.trim().is_empty() || rule.phrases.is_empty() {
                return Err(reject(format!("red flag '{}' is incomplete", rule.id)));
            }
        }

        let normalizer = NameNormalizer::new(self);
        for name in self.canonical_names() {
            let resolved = normalizer.resolve(name);
            if resolved.key() != name {
                return Err(reject(format!(
                    "canonical name '{}' normalizes to '{}'",
                    name,
                    resolved.key()
                )));
            }
        }

        Ok(())
    }

    /// Create a store for tests (no file I/O). Small drug fixture, bundled
    /// rule tables.
    #[cfg(test)]
    pub fn load_test() -> Self {
        let monograph = |name: &str,
                         metabolism: &[&str],
                         side_effects: &[&str],
                         contraindications: &str,
                         alternatives: &[&str],
                         brands: &[&str]| {
            let owned = |items: &[&str]| -> Vec<String> {
                items.iter().map(|s| s.to_string()).collect()
            };
            DrugMonograph {
                name: name.into(),
                class: "test".into(),
                indications: String::new(),
                safety: format!("{} safety note", name),
                risks: String::new(),
                monitoring: String::new(),
                metabolism: owned(metabolism),
                side_effects: owned(side_effects),
                contraindications: contraindications.into(),
                alternatives: owned(alternatives),
                brands: owned(brands),
            }
        };

        let tables = ReferenceTables {
            monographs: vec![
                monograph(
                    "metformin",
                    &["renal excretion"],
                    &["gi upset", "lactic acidosis"],
                    "Severe renal impairment",
                    &["glimepiride", "sitagliptin"],
                    &["Glucophage", "Glycomet"],
                ),
                monograph(
                    "ibuprofen",
                    &["CYP2C9"],
                    &["gi bleed", "renal impairment"],
                    "Peptic ulcer; advanced renal disease",
                    &["paracetamol"],
                    &["Brufen"],
                ),
                monograph(
                    "diclofenac",
                    &["CYP2C9"],
                    &["gi bleed", "renal impairment"],
                    "Peptic ulcer; severe renal failure",
                    &["paracetamol"],
                    &["Voveran"],
                ),
                monograph("lisinopril", &["renal excretion"], &["dry cough"], "Angioedema", &["losartan"], &["Zestril"]),
                monograph("atorvastatin", &["CYP3A4"], &["myopathy"], "Active liver disease", &["rosuvastatin"], &["Lipitor"]),
                monograph("penicillin", &["renal excretion"], &["rash"], "Penicillin allergy", &["azithromycin"], &["Amoxil", "Mox"]),
                monograph(
                    "paracetamol",
                    &["hepatic glucuronidation"],
                    &["hepatotoxicity"],
                    "Severe hepatic impairment",
                    &[],
                    &["Dolo 650", "Dolo650", "Crocin"],
                ),
                monograph("glucose", &[], &["hyperglycemia"], "Uncontrolled hyperglycemia", &[], &["Glucon-D"]),
            ],
            interactions: vec![InteractionRecord {
                drugs: vec!["metformin".into(), "ibuprofen".into()],
                severity: Severity::Moderate,
                risk: "Increased risk of renal impairment and lactic acidosis".into(),
                mechanism: "NSAIDs reduce renal function, impairing metformin excretion".into(),
                clinical_effects: "Elevated creatinine, metabolic acidosis".into(),
                management: "1. Avoid concurrent use in renal impairment\n2. Use paracetamol instead of NSAIDs".into(),
                references: "Journal of Clinical Pharmacology 2024".into(),
            }],
            aliases: [
                ("dolo", "paracetamol"),
                ("crocin", "paracetamol"),
                ("acetaminophen", "paracetamol"),
                ("combiflam", "ibuprofen"),
                ("limcee", "vitamin c"),
                ("penicillin", "penicillin"),
                ("amoxicillin", "penicillin"),
                ("ampicillin", "penicillin"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            localized: parse_table(LOCALIZED_FILE, bundled::LOCALIZED).unwrap(),
            condition_terms: parse_table(CONDITIONS_FILE, bundled::CONDITIONS).unwrap(),
            diagnostic_rules: parse_table(DIAGNOSTIC_FILE, bundled::DIAGNOSTIC).unwrap(),
            inference_rules: parse_table(INFERENCE_FILE, bundled::INFERENCE).unwrap(),
            allergy_rules: parse_table(ALLERGY_FILE, bundled::ALLERGY).unwrap(),
            red_flags: parse_table(RED_FLAGS_FILE, bundled::RED_FLAGS).unwrap(),
            locale_notes: parse_table(LOCALE_NOTES_FILE, bundled::LOCALE_NOTES).unwrap(),
        };
        Self::from_tables(tables, None).unwrap()
    }

    // -- drugs --------------------------------------------------------------

    pub fn drug(&self, identity: &DrugIdentity) -> Option<&DrugMonograph> {
        self.monographs.get(identity.as_str())
    }

    pub fn drugs(&self) -> impl Iterator<Item = &DrugMonograph> {
        self.monographs.values()
    }

    /// Generic name for an alias key, if any.
    pub fn alias(&self, token: &str) -> Option<&str> {
        self.aliases.get(token).map(String::as_str)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical drug whose brand list contains the token (case-insensitive).
    pub fn brand_owner(&self, token: &str) -> Option<&str> {
        self.brands.get(&clean_token(token)).map(String::as_str)
    }

    /// English name for the longest localized medication term contained in the token.
    pub fn localized_medication(&self, token: &str) -> Option<&str> {
        self.localized
            .medications
            .iter()
            .filter(|(term, _)| !term.is_empty() && token.contains(term.as_str()))
            .max_by_key(|(term, _)| term.chars().count())
            .map(|(_, english)| english.as_str())
    }

    pub fn localized_terms(&self) -> &LocalizedTerms {
        &self.localized
    }

    /// Replace localized condition terms in free text with their English form.
    pub fn translate_conditions(&self, text: &str) -> String {
        let mut terms: Vec<(&String, &String)> = self.localized.conditions.iter().collect();
        terms.sort_by_key(|(term, _)| std::cmp::Reverse(term.chars().count()));
        terms
            .into_iter()
            .filter(|(term, _)| !term.is_empty())
            .fold(text.to_string(), |acc, (term, english)| {
                acc.replace(term.as_str(), english)
            })
    }

    /// True for names that are valid normalization outputs.
    pub fn is_canonical(&self, token: &str) -> bool {
        self.canonical_names().any(|name| name == token)
    }

    /// Monograph names, alias targets and translation targets.
    fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.monographs
            .keys()
            .map(String::as_str)
            .chain(self.aliases.values().map(String::as_str))
            .chain(self.localized.medications.values().map(String::as_str))
    }

    /// Direct rule for the pair, in either order.
    pub fn interaction(&self, a: &DrugIdentity, b: &DrugIdentity) -> Option<&InteractionRecord> {
        self.interactions.get(&pair_key(a.as_str(), b.as_str()))
    }

    // -- rule tables ----------------------------------------------------------

    pub fn diagnostic_rules(&self) -> &[DiagnosticRule] {
        &self.diagnostic_rules
    }

    pub fn inference_rules(&self) -> &[InteractionRule] {
        &self.inference_rules
    }

    pub fn allergy_rules(&self) -> &[AllergyRule] {
        &self.allergy_rules
    }

    pub fn red_flags(&self) -> &[RedFlagRule] {
        &self.red_flags
    }

    pub fn condition_terms(&self) -> &[String] {
        &self.condition_terms
    }

    // -- locale -----------------------------------------------------------------

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Resource note for a rule id or topic under the active locale.
    pub fn locale_note(&self, topic: &str) -> Option<&str> {
        self.locale_notes.get(topic).map(String::as_str)
    }

    // -- drug information ---------------------------------------------------------

    /// Monograph for a raw name, after normalization.
    pub fn drug_info(&self, raw: &str) -> Option<&DrugMonograph> {
        let identity = NameNormalizer::new(self).normalize(raw)?;
        self.drug(&identity)
    }

    /// One safety line per input drug, in input order.
    pub fn safety_notes(&self, drugs: &[String]) -> Vec<String> {
        drugs
            .iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| match self.drug_info(raw) {
                Some(m) if !m.safety.trim().is_empty() => {
                    format!("{}: {}", m.identity().display(), m.safety)
                }
                _ => format!("{}: No specific safety data", raw.trim()),
            })
            .collect()
    }
}

fn reject(reason: String) -> ClinicalError {
    tracing::warn!(reason = %reason, "Reference data rejected");
    ClinicalError::InvalidReferenceData(reason)
}
