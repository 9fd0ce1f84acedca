//! Resume support: read the persisted state, suggested step size and
//! sub-model totals once at startup.

use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::traits::{RestartSource, RestartValues};

/// Name of the persisted extra field holding the suggested next step (seconds).
pub const NEXT_STEP_KEY: &str = "NEXT_STEP";

/// What a resume hands to the driver before the first report step.
#[derive(Debug, Clone)]
pub struct RestartHint<S> {
    /// Completed report steps at the saved state.
    pub report_step: usize,
    pub state: Option<S>,
    /// `None` when the size is unknown; the controller then keeps its
    /// configured initial step.
    pub suggested_step: Option<f64>,
    /// Sub-model fields found among the requested keys.
    pub sub_models: RestartValues,
}

/// Load the restart hint if a resume was requested.
///
/// `sub_model_keys` are requested along with [`NEXT_STEP_KEY`]. A missing
/// step-size field is not fatal: the run continues with the configured initial
/// step and may deviate from the original run.
pub fn try_load_restart<S>(
    requested: bool,
    source: Option<&mut (dyn RestartSource<S> + '_)>,
    sub_model_keys: &[String],
) -> SimResult<Option<RestartHint<S>>> {
    if !requested {
        return Ok(None);
    }
    let source = source.ok_or_else(|| SimError::Restart {
        message: "resume requested but no restart source is configured".to_string(),
    })?;

    let mut keys: Vec<&str> = vec![NEXT_STEP_KEY];
    keys.extend(sub_model_keys.iter().map(String::as_str));
    let mut payload = source.load_restart(&keys)?;

    let suggested_step = match payload.extra.remove(NEXT_STEP_KEY) {
        None => {
            warn!(
                "Restart data is missing the {NEXT_STEP_KEY} field, restart run may deviate from original run."
            );
            None
        }
        Some(values) => match values.as_slice() {
            [v] if v.is_finite() && *v > 0.0 => Some(*v),
            [_] => None,
            other => {
                return Err(SimError::Restart {
                    message: format!(
                        "{NEXT_STEP_KEY} must hold exactly one value, found {}",
                        other.len()
                    ),
                });
            }
        },
    };

    payload
        .extra
        .retain(|key, _| sub_model_keys.iter().any(|k| k == key));

    Ok(Some(RestartHint {
        report_step: payload.report_step,
        state: payload.state,
        suggested_step,
        sub_models: payload.extra,
    }))
}
