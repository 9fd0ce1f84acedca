//! Restart data read back from an earlier run directory.

use std::path::{Path, PathBuf};

use rf_sim::{NEXT_STEP_KEY, RestartPayload, RestartSource, RestartValues, SimError, SimResult};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::store::{RunStore, read_snapshots};
use crate::types::{RestartOrigin, SnapshotRecord};
use crate::{ResultsError, ResultsResult};

/// Reads the state, suggested step and sub-model totals of one report step
/// of a stored run.
#[derive(Debug, Clone)]
pub struct RestartReader {
    run_dir: PathBuf,
    report_step: Option<usize>,
}

impl RestartReader {
    /// Restart from `report_step`, or from the last report step written.
    pub fn new(run_dir: &Path, report_step: Option<usize>) -> Self {
        Self {
            run_dir: run_dir.to_path_buf(),
            report_step,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Run id and report step the restart resolves to.
    pub fn origin(&self) -> ResultsResult<RestartOrigin> {
        let (store, run_id) = RunStore::for_run_dir(&self.run_dir)?;
        let manifest = store.load_manifest(&run_id)?;
        let records = read_snapshots::<serde_json::Value>(&self.run_dir)?;
        let record = select(records, self.report_step, &manifest.run_id)?;
        Ok(RestartOrigin {
            run_id: manifest.run_id,
            report_step: record.report_step,
        })
    }

    fn load<S: DeserializeOwned>(&self) -> ResultsResult<SnapshotRecord<S>> {
        let records = read_snapshots(&self.run_dir)?;
        let run_id = self.run_dir.display().to_string();
        select(records, self.report_step, &run_id)
    }
}

fn select<S>(
    records: Vec<SnapshotRecord<S>>,
    report_step: Option<usize>,
    run_id: &str,
) -> ResultsResult<SnapshotRecord<S>> {
    let boundaries = records.into_iter().filter(|r| !r.is_substep);
    let found = match report_step {
        Some(step) => boundaries.filter(|r| r.report_step == step).last(),
        None => boundaries.last(),
    };
    found.ok_or_else(|| match report_step {
        Some(step) => ResultsError::SnapshotNotFound { report_step: step },
        None => ResultsError::Empty {
            run_id: run_id.to_string(),
        },
    })
}

impl<S: DeserializeOwned> RestartSource<S> for RestartReader {
    fn load_restart(&mut self, requested_extra: &[&str]) -> SimResult<RestartPayload<S>> {
        let record = self.load::<S>().map_err(|e| SimError::Restart {
            message: format!("{}: {e}", self.run_dir.display()),
        })?;

        info!(
            report_step = record.report_step,
            time_days = record.time_days,
            "Loaded restart data from {}",
            self.run_dir.display()
        );

        let mut extra: RestartValues = record
            .sub_models
            .into_iter()
            .filter(|(key, _)| requested_extra.contains(&key.as_str()))
            .collect();
        if requested_extra.contains(&NEXT_STEP_KEY) {
            if let Some(next_step) = record.next_step_s {
                extra.insert(NEXT_STEP_KEY.to_string(), vec![next_step]);
            }
        }

        Ok(RestartPayload {
            report_step: record.report_step,
            state: Some(record.state),
            extra,
        })
    }
}
