//! Content-based hashing for run IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::RestartOrigin;

/// Run id from the case content, the solver version and the restart origin.
pub fn compute_run_id<C: Serialize>(
    case: &C,
    solver_version: &str,
    restart: Option<&RestartOrigin>,
) -> String {
    let mut hasher = Sha256::new();

    let case_json = serde_json::to_string(case).unwrap_or_default();
    hasher.update(case_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    if let Some(origin) = restart {
        hasher.update(origin.run_id.as_bytes());
        hasher.update(origin.report_step.to_le_bytes());
    }

    let result = hasher.finalize();
    format!("{:x}", result)
}
