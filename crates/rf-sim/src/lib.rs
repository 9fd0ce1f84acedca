//! Report-step driver and adaptive sub-stepping for implicit reservoir simulation.
//!
//! Provides:
//! - Collaborator traits: nonlinear solver, solver factory, sub-model coordinators,
//!   output sink and restart source
//! - Adaptive step controller that subdivides a report step, retries failed
//!   sub-steps with a smaller size and grows the size after success
//! - Restart resume of the suggested step size and sub-model totals
//! - Simulation driver sequencing report steps, output and report aggregation

pub mod adaptive;
pub mod config;
pub mod driver;
pub mod error;
pub mod restart;
pub mod traits;

pub use adaptive::{
    ActiveEvents, AdaptiveStepController, ControllerState, StepControl, SubStepPlan,
    solve_full_interval,
};
pub use config::{NonlinearConfig, SimulatorConfig, TimeStepConfig};
pub use driver::{RunOutcome, SimulationDriver};
pub use error::{SimError, SimResult};
pub use restart::{NEXT_STEP_KEY, RestartHint, try_load_restart};
pub use traits::{
    ConvergenceFailure, NoSubModel, NonlinearSolver, NullOutput, OutputSink, RestartPayload,
    RestartSource, RestartValues, Snapshot, SolverFactory, SubModelCoordinator, SubStepContext,
    SubStepSolution,
};
