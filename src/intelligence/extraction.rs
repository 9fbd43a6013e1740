use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::enums::ObservationKind;
use crate::models::{ClinicalObservation, ObservationSet};

use super::types::ClinicalError;

/// Extraction patterns (compiled once via LazyLock). One per observation kind.
static RE_BP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bBP:\s*(\d+)\s*/\s*(\d+)(?:\s*mmHg)?").unwrap()
});
static RE_GLUCOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:fasting\s+glucose|blood\s+sugar):?\s*(\d+)\s*mg/dL").unwrap()
});
static RE_HBA1C: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bHbA1c:\s*(\d+(?:\.\d+)?)\s*%").unwrap());
static RE_CHOLESTEROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCholesterol:\s*(\d+)\s*mg/dL").unwrap());

const KINDS: [ObservationKind; 4] = [
    ObservationKind::BloodPressure,
    ObservationKind::FastingGlucose,
    ObservationKind::Hba1c,
    ObservationKind::Cholesterol,
];

fn pattern(kind: ObservationKind) -> &'static Regex {
    match kind {
        ObservationKind::BloodPressure => &RE_BP,
        ObservationKind::FastingGlucose => &RE_GLUCOSE,
        ObservationKind::Hba1c => &RE_HBA1C,
        ObservationKind::Cholesterol => &RE_CHOLESTEROL,
    }
}

/// Build an observation from one match. Unparseable numbers yield None.
fn parse(kind: ObservationKind, caps: &Captures<'_>) -> Option<ClinicalObservation> {
    let group = |i: usize| caps.get(i).map(|m| m.as_str());
    match kind {
        ObservationKind::BloodPressure => Some(ClinicalObservation::BloodPressure {
            systolic: group(1)?.parse().ok()?,
            diastolic: group(2)?.parse().ok()?,
        }),
        ObservationKind::FastingGlucose => Some(ClinicalObservation::FastingGlucose {
            mg_dl: group(1)?.parse().ok()?,
        }),
        ObservationKind::Hba1c => {
            let percent: f64 = group(1)?.parse().ok()?;
            percent
                .is_finite()
                .then_some(ClinicalObservation::Hba1c { percent })
        }
        ObservationKind::Cholesterol => Some(ClinicalObservation::Cholesterol {
            mg_dl: group(1)?.parse().ok()?,
        }),
    }
}

/// Pull typed vitals and labs out of free text.
///
/// The first match of each kind is kept. A kind with no match, or whose
/// first match does not parse, is absent from the result. Blank text is
/// an error so callers can tell it apart from "nothing found".
pub fn extract(text: &str) -> Result<ObservationSet, ClinicalError> {
    if text.trim().is_empty() {
        return Err(ClinicalError::EmptyInput);
    }

    let mut observations = ObservationSet::new();
    for kind in KINDS {
        let Some(caps) = pattern(kind).captures(text) else {
            continue;
        };
        match parse(kind, &caps) {
            Some(observation) => {
                observations.insert(observation);
            }
            None => tracing::debug!(kind = %kind, "Matched value failed to parse"),
        }
    }
    Ok(observations)
}

/// Every parseable occurrence of one kind, in text order.
pub fn extract_series(text: &str, kind: ObservationKind) -> Vec<ClinicalObservation> {
    pattern(kind)
        .captures_iter(text)
        .filter_map(|caps| parse(kind, &caps))
        .collect()
}
