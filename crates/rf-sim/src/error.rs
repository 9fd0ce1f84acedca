//! Error types for driver and step-control operations.

use rf_core::seconds_to_days;
use thiserror::Error;

/// Errors that end a simulation run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid configuration: {what}")]
    Config { what: String },

    #[error(
        "Report step {report_step} failed at step size {} days: {reason}",
        seconds_to_days(*last_step)
    )]
    IntervalFailed {
        report_step: usize,
        last_step: f64,
        reason: String,
    },

    #[error("Restart error: {message}")]
    Restart { message: String },

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Sub-model error: {message}")]
    SubModel { message: String },

    #[error("Schedule error: {0}")]
    Schedule(#[from] rf_schedule::ScheduleError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] rf_core::RfError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Report step and last attempted size of a fatal interval failure.
    pub fn interval_failure(&self) -> Option<(usize, f64)> {
        match self {
            SimError::IntervalFailed {
                report_step,
                last_step,
                ..
            } => Some((*report_step, *last_step)),
            _ => None,
        }
    }
}
