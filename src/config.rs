use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Clinsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the reference data directory.
pub const RESOURCES_DIR_ENV: &str = "CLINSIGHT_RESOURCES_DIR";
/// Selects the locale resource-note pack (e.g. "chennai").
pub const LOCALE_ENV: &str = "CLINSIGHT_LOCALE";

/// Log filter used when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinsight=info"
}

/// Get the application data directory.
/// ~/Clinsight/ on all platforms; the working directory when there is no home.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location for user-supplied reference tables.
pub fn reference_dir() -> PathBuf {
    app_data_dir().join("reference")
}

/// Where reference data comes from and which locale notes to attach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// None means the tables compiled into the binary.
    pub resources_dir: Option<PathBuf>,
    pub locale: Option<String>,
}

impl EngineConfig {
    /// CLINSIGHT_RESOURCES_DIR, else ~/Clinsight/reference when it exists,
    /// else bundled data. CLINSIGHT_LOCALE selects the note pack.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let resources_dir = non_empty(RESOURCES_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| Some(reference_dir()).filter(|dir| dir.is_dir()));

        let config = Self {
            resources_dir,
            locale: non_empty(LOCALE_ENV).map(|v| v.trim().to_lowercase()),
        };
        tracing::debug!(
            resources_dir = ?config.resources_dir,
            locale = ?config.locale,
            "Engine configuration resolved"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("Clinsight"));
    }

    #[test]
    fn reference_dir_under_app_data() {
        let reference = reference_dir();
        assert!(reference.starts_with(app_data_dir()));
        assert!(reference.ends_with("reference"));
    }

    #[test]
    fn app_name_is_clinsight() {
        assert_eq!(APP_NAME, "Clinsight");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn explicit_dir_and_locale_from_lookup() {
        let config = EngineConfig::from_lookup(|key| match key {
            RESOURCES_DIR_ENV => Some("/opt/clinsight/ref".into()),
            LOCALE_ENV => Some(" Chennai ".into()),
            _ => None,
        });
        assert_eq!(config.resources_dir, Some(PathBuf::from("/opt/clinsight/ref")));
        assert_eq!(config.locale.as_deref(), Some("chennai"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = EngineConfig::from_lookup(|key| match key {
            LOCALE_ENV => Some("   ".into()),
            _ => None,
        });
        assert!(config.locale.is_none());
    }

    #[test]
    fn default_is_bundled_without_locale() {
        let config = EngineConfig::default();
        assert!(config.resources_dir.is_none());
        assert!(config.locale.is_none());
    }
}
