//! Error types for the reservoir model.

use rf_core::RfError;
use rf_schedule::ScheduleError;
use rf_sim::SimError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid case: {what}")]
    Invalid { what: String },

    #[error("No convergence after {iterations} iterations: {reason}")]
    NoConvergence { reason: String, iterations: usize },

    #[error("Numeric error: {0}")]
    Numeric(#[from] RfError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Configuration error: {0}")]
    Sim(#[from] SimError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl From<ModelError> for SimError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Sim(inner) => inner,
            ModelError::Schedule(inner) => SimError::Schedule(inner),
            ModelError::Numeric(inner) => SimError::Numeric(inner),
            ModelError::Yaml(inner) => SimError::Yaml(inner),
            ModelError::Io(inner) => SimError::Io(inner),
            other => SimError::SubModel {
                message: other.to_string(),
            },
        }
    }
}
