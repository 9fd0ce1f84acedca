//! Schedule-provided step-size control parameters.

use serde::{Deserialize, Serialize};

/// Step-control overrides in force from a report step onward.
///
/// Every field is optional; an absent field keeps the value configured for the
/// run. Sizes are in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub initial_step: Option<f64>,
    pub min_step: Option<f64>,
    pub max_step: Option<f64>,
    pub growth_factor: Option<f64>,
    pub shrink_factor: Option<f64>,
}

impl Tuning {
    pub fn is_empty(&self) -> bool {
        self.initial_step.is_none()
            && self.min_step.is_none()
            && self.max_step.is_none()
            && self.growth_factor.is_none()
            && self.shrink_factor.is_none()
    }
}
