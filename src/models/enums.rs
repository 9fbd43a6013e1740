use serde::{Deserialize, Serialize};

use crate::intelligence::types::ClinicalError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde names match the `as_str` values.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ClinicalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ClinicalError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Finding severity, declared from least to most severe so `Ord` ranks them.
    #[derive(PartialOrd, Ord)]
    Severity {
        Low => "low",
        Moderate => "moderate",
        High => "high",
        Emergency => "emergency",
    }
);

str_enum!(FindingCategory {
    Diagnostic => "diagnostic",
    Interaction => "interaction",
    RedFlag => "red_flag",
});

str_enum!(ObservationKind {
    BloodPressure => "blood_pressure",
    FastingGlucose => "fasting_glucose",
    Hba1c => "hba1c",
    Cholesterol => "cholesterol",
});

str_enum!(
    /// A single numeric quantity a diagnostic criterion can test.
    Measure {
        Systolic => "systolic",
        Diastolic => "diastolic",
        FastingGlucose => "fasting_glucose",
        Hba1c => "hba1c",
        TotalCholesterol => "total_cholesterol",
    }
);

str_enum!(
    /// Declaration order is the evaluation order of diagnostic rules.
    #[derive(PartialOrd, Ord)]
    Condition {
        Hypertension => "hypertension",
        Diabetes => "diabetes",
        Hyperlipidemia => "hyperlipidemia",
    }
);

str_enum!(EntityCategory {
    Medication => "medication",
    Condition => "condition",
    Dosage => "dosage",
});

str_enum!(ResolutionSource {
    Translation => "translation",
    Alias => "alias",
    Brand => "brand",
    Canonical => "canonical",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn severity_round_trip() {
        for (variant, s) in [
            (Severity::Low, "low"),
            (Severity::Moderate, "moderate"),
            (Severity::High, "high"),
            (Severity::Emergency, "emergency"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Severity::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Moderate);
        assert!(Severity::Moderate < Severity::High);
        assert!(Severity::High < Severity::Emergency);
    }

    #[test]
    fn measure_serde_matches_as_str() {
        for m in [
            Measure::Systolic,
            Measure::Diastolic,
            Measure::FastingGlucose,
            Measure::Hba1c,
            Measure::TotalCholesterol,
        ] {
            let json = serde_json::to_string(&m).unwrap();
            assert_eq!(json, format!("\"{}\"", m.as_str()));
        }
    }

    #[test]
    fn category_serde_snake_case() {
        let json = serde_json::to_string(&FindingCategory::RedFlag).unwrap();
        assert_eq!(json, "\"red_flag\"");
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = Condition::from_str("gout").unwrap_err();
        assert!(err.to_string().contains("gout"));
    }
}
