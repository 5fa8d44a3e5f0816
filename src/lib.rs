pub mod config;
pub mod discovery;
pub mod media;
pub mod models;
pub mod orchestration;
pub mod pipeline;
pub mod sampling;
pub mod tabular;

// Re-export commonly used types for convenience.
pub use config::AppConfig;
pub use models::{Candidate, SamplingConstraints};
pub use sampling::sample;
