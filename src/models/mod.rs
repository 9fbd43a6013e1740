pub mod drug;
pub mod enums;
pub mod finding;
pub mod observation;

pub use drug::{DrugIdentity, DrugMonograph, DrugResolution};
pub use finding::Finding;
pub use observation::{ClinicalObservation, ObservationSet};
