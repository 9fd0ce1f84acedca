use rf_model::ModelError;
use rf_results::ResultsError;
use rf_sim::SimError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Case error: {0}")]
    Case(#[from] ModelError),

    #[error("Simulation failed: {0}")]
    Sim(#[from] SimError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),
}

pub type CliResult<T> = Result<T, CliError>;
