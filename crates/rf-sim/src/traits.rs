//! Collaborator interfaces injected into the driver.
//!
//! The driver only sequences calls; the physics lives behind these traits.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::SimResult;

/// Named scalar fields persisted next to the state, e.g. the suggested step
/// size or cumulative well volumes.
pub type RestartValues = BTreeMap<String, Vec<f64>>;

/// Everything a solver needs to know about one sub-step attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubStepContext {
    pub report_step: usize,
    /// Index of the sub-step within the report step (accepted sub-steps so far).
    pub sub_step: usize,
    /// Failed attempts already spent on this sub-step.
    pub attempt: usize,
    /// Simulated time at the start of the sub-step (seconds).
    pub time: f64,
    /// Sub-step duration (seconds).
    pub dt: f64,
    /// Well configuration changed at this report step; re-check well constraints.
    pub revalidate_wells: bool,
}

/// A converged sub-step.
#[derive(Debug, Clone)]
pub struct SubStepSolution<S> {
    pub state: S,
    pub nonlinear_iterations: usize,
    pub linear_iterations: usize,
}

/// The solver could not converge the attempted sub-step.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason} after {nonlinear_iterations} nonlinear iterations")]
pub struct ConvergenceFailure {
    pub reason: String,
    pub nonlinear_iterations: usize,
    pub linear_iterations: usize,
}

/// Nonlinear solve of one sub-step.
///
/// The result must be identical on every process for identical inputs: in a
/// partitioned run the convergence decision is a global reduction made inside
/// the solver, so every process sees the same `Ok`/`Err`.
pub trait NonlinearSolver<S> {
    fn attempt_sub_step(
        &mut self,
        state: &S,
        ctx: &SubStepContext,
    ) -> Result<SubStepSolution<S>, ConvergenceFailure>;
}

/// Builds a solver for one report step over the driver-owned sub-models.
pub trait SolverFactory<S, W, A> {
    fn create_solver<'a>(
        &'a self,
        wells: &'a mut W,
        aquifer: &'a mut A,
    ) -> Box<dyn NonlinearSolver<S> + 'a>;

    /// Reject a restored state the solvers cannot work with, e.g. one saved
    /// on a different grid. Called once on resume; report problems as
    /// [`crate::SimError::Restart`].
    fn check_state(&self, _state: &S, _wells: &W, _aquifer: &A) -> SimResult<()> {
        Ok(())
    }
}

/// Well or aquifer model advanced around each report step.
pub trait SubModelCoordinator {
    fn begin_report_step(&mut self, report_step: usize) -> SimResult<()>;
    fn end_report_step(&mut self) -> SimResult<()>;

    /// Names of the fields written by `save_restart`.
    fn restart_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn save_restart(&self, _values: &mut RestartValues) {}

    /// Restore from fields saved by an earlier run. Keys may be missing when
    /// the earlier run had different sub-models.
    fn init_from_restart(&mut self, _values: &RestartValues) -> SimResult<()> {
        Ok(())
    }
}

/// Placeholder coordinator for setups without wells or aquifers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubModel;

impl SubModelCoordinator for NoSubModel {
    fn begin_report_step(&mut self, _report_step: usize) -> SimResult<()> {
        Ok(())
    }

    fn end_report_step(&mut self) -> SimResult<()> {
        Ok(())
    }
}

/// State written at a report boundary.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a, S> {
    pub state: &'a S,
    /// Number of completed report steps.
    pub report_step: usize,
    /// Simulated time (seconds).
    pub elapsed: f64,
    pub is_substep: bool,
    /// Wall-clock seconds since the run started.
    pub wall_clock: f64,
    /// Suggested size of the next sub-step, kept for a later resume.
    pub next_step: Option<f64>,
    /// Sub-model fields needed to resume.
    pub sub_models: &'a RestartValues,
}

pub trait OutputSink<S> {
    fn write_snapshot(&mut self, snapshot: &Snapshot<'_, S>) -> SimResult<()>;
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl<S> OutputSink<S> for NullOutput {
    fn write_snapshot(&mut self, _snapshot: &Snapshot<'_, S>) -> SimResult<()> {
        Ok(())
    }
}

/// Persisted data read back for a resume.
#[derive(Debug, Clone)]
pub struct RestartPayload<S> {
    /// Report step the saved state belongs to (completed report steps).
    pub report_step: usize,
    pub state: Option<S>,
    /// Extra scalar fields by name; only requested names are filled.
    pub extra: RestartValues,
}

pub trait RestartSource<S> {
    fn load_restart(&mut self, requested_extra: &[&str]) -> SimResult<RestartPayload<S>>;
}
