//! Result data types.

use rf_report::SimulatorReport;
use rf_sim::RestartValues;
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub case_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub num_report_steps: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restarted_from: Option<RestartOrigin>,
    #[serde(default)]
    pub status: RunStatus,
    /// Accepted work; filled in when the run finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<SimulatorReport>,
    /// Work spent on rejected sub-steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<SimulatorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartOrigin {
    pub run_id: RunId,
    pub report_step: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    Completed,
    Failed { message: String },
}

/// One line of `snapshots.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord<S> {
    /// Completed report steps.
    pub report_step: usize,
    pub time_s: f64,
    pub time_days: f64,
    #[serde(default)]
    pub is_substep: bool,
    pub wall_clock_s: f64,
    /// Suggested next sub-step (seconds); absent in non-adaptive runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_s: Option<f64>,
    /// Well and aquifer totals needed to resume.
    #[serde(default, skip_serializing_if = "RestartValues::is_empty")]
    pub sub_models: RestartValues,
    pub state: S,
}
