//! Single-phase reservoir model driven by the report-step loop.
//!
//! A 1-D chain of slightly compressible cells solved implicitly with Newton's
//! method, rate-controlled wells and one analytical aquifer. Everything is
//! loaded from a YAML case file.

pub mod aquifer;
pub mod case;
pub mod error;
pub mod factory;
pub mod grid;
pub mod newton;
pub mod solver;
pub mod state;
pub mod wells;

pub use aquifer::{AQUIFER_INFLUX_KEY, AquiferDef, AquiferModel};
pub use case::{Case, CaseDef, ReservoirDriver, SolverDef};
pub use error::{ModelError, ModelResult};
pub use factory::ReservoirSolverFactory;
pub use grid::{Grid, GridDef};
pub use newton::{NewtonOutcome, NewtonSettings, newton_solve};
pub use solver::ReservoirSolver;
pub use state::ReservoirState;
pub use wells::{WellControlDef, WellDef, WellKind, WellModel, WellStatus, cumulative_key};
