use serde::{Deserialize, Serialize};

use super::enums::ResolutionSource;

/// Canonical drug name used as a key into the knowledge store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrugIdentity(String);

impl DrugIdentity {
    /// Keys are stored lowercased and trimmed.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Title-cased display form ("metformin" -> "Metformin").
    pub fn display(&self) -> String {
        self.0
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for DrugIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of normalizing a raw medication mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrugResolution {
    Resolved {
        identity: DrugIdentity,
        source: ResolutionSource,
    },
    /// Nothing in the reference tables matched. `token` is the cleaned input.
    Unresolved { token: String },
}

impl DrugResolution {
    pub fn identity(&self) -> Option<&DrugIdentity> {
        match self {
            Self::Resolved { identity, .. } => Some(identity),
            Self::Unresolved { .. } => None,
        }
    }

    pub fn into_identity(self) -> Option<DrugIdentity> {
        match self {
            Self::Resolved { identity, .. } => Some(identity),
            Self::Unresolved { .. } => None,
        }
    }

    /// Best-effort key: the resolved identity or the cleaned raw token.
    pub fn key(&self) -> &str {
        match self {
            Self::Resolved { identity, .. } => identity.as_str(),
            Self::Unresolved { token } => token,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Reference monograph for one canonical drug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugMonograph {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub indications: String,
    #[serde(default)]
    pub safety: String,
    #[serde(default)]
    pub risks: String,
    #[serde(default)]
    pub monitoring: String,
    /// Elimination pathways, e.g. "CYP2C9" or "renal excretion".
    #[serde(default)]
    pub metabolism: Vec<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub contraindications: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub brands: Vec<String>,
}

impl DrugMonograph {
    pub fn identity(&self) -> DrugIdentity {
        DrugIdentity::new(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_lowercased_and_trimmed() {
        assert_eq!(DrugIdentity::new("  Metformin ").as_str(), "metformin");
    }

    #[test]
    fn display_title_cases_each_word() {
        assert_eq!(DrugIdentity::new("vitamin c").display(), "Vitamin C");
    }

    #[test]
    fn unresolved_has_no_identity() {
        let r = DrugResolution::Unresolved {
            token: "zzzdrugname".into(),
        };
        assert!(r.identity().is_none());
        assert_eq!(r.key(), "zzzdrugname");
        assert!(!r.is_resolved());
    }
}
