//! rf-report: per-sub-step telemetry and whole-run aggregates.
//!
//! Reports are plain values merged with `+`/`+=`. The merge is associative and
//! commutative over every numeric field and ANDs the `converged` flag, with
//! [`SimulatorReport::default`] as identity.

pub mod report;

pub use report::{FailureReport, IntervalReport, SimulatorReport, StepReport};
