pub mod candidate;
pub mod species;

pub use candidate::{Candidate, SamplingConstraints, UNKNOWN_OBSERVER};
pub use species::{SamplingOverrides, SpeciesSpec, REQUIRED_SPEC_COLUMNS};
