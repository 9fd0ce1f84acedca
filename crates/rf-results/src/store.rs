//! Run storage API.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::types::{RunId, RunManifest, SnapshotRecord};
use crate::{ResultsError, ResultsResult};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SNAPSHOT_FILE: &str = "snapshots.jsonl";

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store containing `run_dir`, and the run's id.
    pub fn for_run_dir(run_dir: &Path) -> ResultsResult<(Self, RunId)> {
        let parent = run_dir.parent().ok_or_else(|| ResultsError::InvalidPath {
            message: format!("{} has no parent directory", run_dir.display()),
        })?;
        let run_id = run_dir
            .file_name()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: format!("{} has no final component", run_dir.display()),
            })?
            .to_string_lossy()
            .to_string();
        Ok((
            Self {
                root_dir: parent.to_path_buf(),
            },
            run_id,
        ))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST_FILE).exists()
    }

    /// Create (or reset) the run directory with an empty snapshot file.
    pub fn create_run(&self, manifest: &RunManifest) -> ResultsResult<PathBuf> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;
        self.save_manifest(manifest)?;
        fs::write(run_dir.join(SNAPSHOT_FILE), "")?;
        Ok(run_dir)
    }

    pub fn save_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join(MANIFEST_FILE), manifest_json)?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_snapshots<S: DeserializeOwned>(
        &self,
        run_id: &str,
    ) -> ResultsResult<Vec<SnapshotRecord<S>>> {
        let run_dir = self.run_dir(run_id);
        if !run_dir.join(SNAPSHOT_FILE).exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        read_snapshots(&run_dir)
    }

    /// All runs in the store, oldest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id) {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}

/// Read every snapshot line of a run directory.
pub fn read_snapshots<S: DeserializeOwned>(run_dir: &Path) -> ResultsResult<Vec<SnapshotRecord<S>>> {
    let content = fs::read_to_string(run_dir.join(SNAPSHOT_FILE))?;
    let mut records = Vec::new();
    for line in content.lines() {
        if !line.trim().is_empty() {
            let record: SnapshotRecord<S> = serde_json::from_str(line)?;
            records.push(record);
        }
    }
    Ok(records)
}
