pub mod stimulus;
pub mod trial;

pub use stimulus::{GRID_SIZE, HARMONIC_FREQUENCIES, SAMPLE_RATE, UNRELATED_FREQUENCIES};
pub use trial::{ScenarioPhase, TrialRecord};
