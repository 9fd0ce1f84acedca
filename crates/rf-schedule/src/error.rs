//! Error types for schedule loading and timer movement.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid schedule: {what}")]
    Invalid { what: String },

    #[error("Report step {step} out of range (schedule has {len} report steps)")]
    StepOutOfRange { step: usize, len: usize },

    #[error("Timer is already done; cannot advance past the last report step")]
    AdvancePastEnd,

    #[error("Numeric error: {0}")]
    Numeric(#[from] rf_core::RfError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
