use crate::models::enums::ResolutionSource;
use crate::models::{DrugIdentity, DrugResolution};

use super::helpers::{clean_token, strip_strength};
use super::reference::KnowledgeStore;

/// Resolves raw medication mentions to canonical drug identities.
///
/// Lookup order, first hit wins: localized term contained in the token,
/// alias table, brand lists, canonical names. A token that misses
/// everything is retried once without a trailing strength ("Metformin
/// 500mg") before being reported as unresolved.
pub struct NameNormalizer<'a> {
    store: &'a KnowledgeStore,
}

impl<'a> NameNormalizer<'a> {
    pub fn new(store: &'a KnowledgeStore) -> Self {
        Self { store }
    }

    pub fn resolve(&self, raw: &str) -> DrugResolution {
        let token = clean_token(raw);
        if token.is_empty() {
            return DrugResolution::Unresolved { token };
        }
        if let Some(resolved) = self.lookup(&token) {
            return resolved;
        }
        if let Some(resolved) = strip_strength(&token).and_then(|bare| self.lookup(&bare)) {
            return resolved;
        }
        tracing::debug!(token = %token, "Medication name unresolved");
        DrugResolution::Unresolved { token }
    }

    /// Canonical identity, or None when the name is unresolved.
    pub fn normalize(&self, raw: &str) -> Option<DrugIdentity> {
        self.resolve(raw).into_identity()
    }

    fn lookup(&self, token: &str) -> Option<DrugResolution> {
        let (name, source) = if let Some(english) = self.store.localized_medication(token) {
            (english, ResolutionSource::Translation)
        } else if let Some(generic) = self.store.alias(token) {
            (generic, ResolutionSource::Alias)
        } else if let Some(owner) = self.store.brand_owner(token) {
            (owner, ResolutionSource::Brand)
        } else if self.store.is_canonical(token) {
            (token, ResolutionSource::Canonical)
        } else {
            return None;
        };
        Some(DrugResolution::Resolved {
            identity: DrugIdentity::new(name),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(raw: &str) -> DrugResolution {
        let store = KnowledgeStore::load_test();
        NameNormalizer::new(&store).resolve(raw)
    }

    fn resolved(identity: &str, source: ResolutionSource) -> DrugResolution {
        DrugResolution::Resolved {
            identity: DrugIdentity::new(identity),
            source,
        }
    }

    #[test]
    fn brand_resolves_to_generic() {
        assert_eq!(resolve("Dolo650"), resolved("paracetamol", ResolutionSource::Brand));
        assert_eq!(resolve("GLUCOPHAGE"), resolved("metformin", ResolutionSource::Brand));
    }

    #[test]
    fn alias_beats_brand() {
        assert_eq!(resolve("Crocin"), resolved("paracetamol", ResolutionSource::Alias));
        assert_eq!(resolve("amoxicillin"), resolved("penicillin", ResolutionSource::Alias));
    }

    #[test]
    fn localized_term_is_translated() {
        assert_eq!(
            resolve("குளுக்கோஸ்"),
            resolved("glucose", ResolutionSource::Translation)
        );
    }

    #[test]
    fn canonical_name_resolves_to_itself() {
        assert_eq!(resolve("  Metformin "), resolved("metformin", ResolutionSource::Canonical));
    }

    #[test]
    fn strength_suffix_is_tolerated() {
        assert_eq!(resolve("Metformin 500mg"), resolved("metformin", ResolutionSource::Canonical));
        assert_eq!(resolve("Brufen 400 mg"), resolved("ibuprofen", ResolutionSource::Brand));
    }

    #[test]
    fn unknown_name_is_unresolved() {
        assert_eq!(
            resolve("ZzzDrugName"),
            DrugResolution::Unresolved {
                token: "zzzdrugname".into()
            }
        );
        assert_eq!(resolve("   "), DrugResolution::Unresolved { token: String::new() });
    }

    #[test]
    fn normalization_is_idempotent() {
        let store = KnowledgeStore::load_test();
        let normalizer = NameNormalizer::new(&store);
        let inputs = [
            "Dolo650",
            "Dolo 650",
            "Crocin",
            "குளுக்கோஸ்",
            "amoxicillin",
            "Metformin 500mg",
            "Limcee",
            "combiflam",
            "zzzdrugname",
            "Glucon-D",
            "",
        ];
        for raw in inputs {
            let once = normalizer.resolve(raw);
            let twice = normalizer.resolve(once.key());
            assert_eq!(once.key(), twice.key(), "input {:?}", raw);
            assert_eq!(once.is_resolved(), twice.is_resolved(), "input {:?}", raw);
        }
    }

    #[test]
    fn every_canonical_name_is_a_fixed_point() {
        let store = KnowledgeStore::bundled(None).unwrap();
        let normalizer = NameNormalizer::new(&store);
        for drug in store.drugs() {
            assert_eq!(normalizer.normalize(&drug.name), Some(drug.identity()));
        }
    }
}
