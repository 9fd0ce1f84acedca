//! Primary unknowns of the reservoir.

use serde::{Deserialize, Serialize};

/// Cell pressures and the aquifer pressure, both in Pa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirState {
    pub pressure: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aquifer_pressure: Option<f64>,
}

impl ReservoirState {
    pub fn uniform(cells: usize, pressure: f64) -> Self {
        Self {
            pressure: vec![pressure; cells],
            aquifer_pressure: None,
        }
    }

    pub fn num_cells(&self) -> usize {
        self.pressure.len()
    }

    pub fn average_pressure(&self) -> f64 {
        if self.pressure.is_empty() {
            return 0.0;
        }
        self.pressure.iter().sum::<f64>() / self.pressure.len() as f64
    }

    pub fn min_pressure(&self) -> f64 {
        self.pressure.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_pressure(&self) -> f64 {
        self.pressure
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}
