//! rf-results: run directories, snapshot storage and restart data.

pub mod hash;
pub mod restart;
pub mod store;
pub mod types;
pub mod writer;

pub use hash::compute_run_id;
pub use restart::RestartReader;
pub use store::{RunStore, read_snapshots};
pub use types::*;
pub use writer::SnapshotWriter;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("No snapshot for report step {report_step}")]
    SnapshotNotFound { report_step: usize },

    #[error("Run {run_id} has no snapshots")]
    Empty { run_id: String },
}

impl From<ResultsError> for rf_sim::SimError {
    fn from(e: ResultsError) -> Self {
        rf_sim::SimError::Output {
            message: e.to_string(),
        }
    }
}
