use thiserror::Error;

pub type RfResult<T> = Result<T, RfError>;

/// Rejected input values. Raised while turning case data into SI models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RfError {
    #[error("{what} is not a finite number ({value})")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} must be greater than zero, got {value}")]
    NonPositive { what: &'static str, value: f64 },
}
