use serde::{Deserialize, Serialize};

use super::enums::{Measure, ObservationKind};

/// One typed clinical value pulled out of free text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClinicalObservation {
    BloodPressure { systolic: u32, diastolic: u32 },
    FastingGlucose { mg_dl: u32 },
    Hba1c { percent: f64 },
    Cholesterol { mg_dl: u32 },
}

impl ClinicalObservation {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Self::BloodPressure { .. } => ObservationKind::BloodPressure,
            Self::FastingGlucose { .. } => ObservationKind::FastingGlucose,
            Self::Hba1c { .. } => ObservationKind::Hba1c,
            Self::Cholesterol { .. } => ObservationKind::Cholesterol,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::BloodPressure { .. } => "mmHg",
            Self::FastingGlucose { .. } | Self::Cholesterol { .. } => "mg/dL",
            Self::Hba1c { .. } => "%",
        }
    }

    /// Read one measure off this observation, if it carries it.
    pub fn measure(&self, measure: Measure) -> Option<f64> {
        match (self, measure) {
            (Self::BloodPressure { systolic, .. }, Measure::Systolic) => Some(f64::from(*systolic)),
            (Self::BloodPressure { diastolic, .. }, Measure::Diastolic) => {
                Some(f64::from(*diastolic))
            }
            (Self::FastingGlucose { mg_dl }, Measure::FastingGlucose) => Some(f64::from(*mg_dl)),
            (Self::Hba1c { percent }, Measure::Hba1c) => Some(*percent),
            (Self::Cholesterol { mg_dl }, Measure::TotalCholesterol) => Some(f64::from(*mg_dl)),
            _ => None,
        }
    }

    /// Human-readable value with unit, e.g. "150/95 mmHg" or "7.2%".
    pub fn display_value(&self) -> String {
        match self {
            Self::BloodPressure {
                systolic,
                diastolic,
            } => format!("{}/{} mmHg", systolic, diastolic),
            Self::FastingGlucose { mg_dl } | Self::Cholesterol { mg_dl } => {
                format!("{} mg/dL", mg_dl)
            }
            Self::Hba1c { percent } => format!("{}%", percent),
        }
    }
}

/// At most one observation per kind. The first one inserted for a kind wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    observations: Vec<ClinicalObservation>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an observation of the same kind is already present.
    pub fn insert(&mut self, observation: ClinicalObservation) -> bool {
        if self.get(observation.kind()).is_some() {
            return false;
        }
        self.observations.push(observation);
        true
    }

    pub fn get(&self, kind: ObservationKind) -> Option<&ClinicalObservation> {
        self.observations.iter().find(|o| o.kind() == kind)
    }

    pub fn measure(&self, measure: Measure) -> Option<f64> {
        self.observations.iter().find_map(|o| o.measure(measure))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClinicalObservation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl FromIterator<ClinicalObservation> for ObservationSet {
    fn from_iter<I: IntoIterator<Item = ClinicalObservation>>(iter: I) -> Self {
        let mut set = Self::new();
        for observation in iter {
            set.insert(observation);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_of_a_kind_wins() {
        let mut set = ObservationSet::new();
        assert!(set.insert(ClinicalObservation::Hba1c { percent: 6.8 }));
        assert!(!set.insert(ClinicalObservation::Hba1c { percent: 5.1 }));
        assert_eq!(set.len(), 1);
        assert_eq!(set.measure(Measure::Hba1c), Some(6.8));
    }

    #[test]
    fn blood_pressure_exposes_both_measures() {
        let bp = ClinicalObservation::BloodPressure {
            systolic: 142,
            diastolic: 92,
        };
        assert_eq!(bp.measure(Measure::Systolic), Some(142.0));
        assert_eq!(bp.measure(Measure::Diastolic), Some(92.0));
        assert_eq!(bp.measure(Measure::Hba1c), None);
        assert_eq!(bp.display_value(), "142/92 mmHg");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let obs = ClinicalObservation::FastingGlucose { mg_dl: 140 };
        let json = serde_json::to_value(obs).unwrap();
        assert_eq!(json["kind"], "fasting_glucose");
        assert_eq!(json["mg_dl"], 140);
    }
}
