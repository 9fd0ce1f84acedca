//! Appends report-step snapshots to a run's `snapshots.jsonl`.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rf_core::seconds_to_days;
use rf_sim::{OutputSink, SimError, SimResult, Snapshot};
use serde::Serialize;

use crate::ResultsResult;
use crate::store::SNAPSHOT_FILE;
use crate::types::SnapshotRecord;

pub struct SnapshotWriter {
    path: PathBuf,
    file: BufWriter<File>,
    written: usize,
}

impl SnapshotWriter {
    /// Writer appending to the snapshot file of `run_dir`.
    pub fn open(run_dir: &Path) -> ResultsResult<Self> {
        let path = run_dir.join(SNAPSHOT_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots written by this writer.
    pub fn written(&self) -> usize {
        self.written
    }

    fn append<S: Serialize>(&mut self, record: &SnapshotRecord<&S>) -> ResultsResult<()> {
        serde_json::to_writer(&mut self.file, record)?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        self.written += 1;
        Ok(())
    }
}

impl<S: Serialize> OutputSink<S> for SnapshotWriter {
    fn write_snapshot(&mut self, snapshot: &Snapshot<'_, S>) -> SimResult<()> {
        let record = SnapshotRecord {
            report_step: snapshot.report_step,
            time_s: snapshot.elapsed,
            time_days: seconds_to_days(snapshot.elapsed),
            is_substep: snapshot.is_substep,
            wall_clock_s: snapshot.wall_clock,
            next_step_s: snapshot.next_step,
            sub_models: snapshot.sub_models.clone(),
            state: snapshot.state,
        };
        self.append(&record).map_err(|e| SimError::Output {
            message: format!("{}: {e}", self.path.display()),
        })
    }
}
