//! 1-D cell chain with slightly compressible fluid.

use rf_core::{bar_to_pa, ensure_finite, ensure_positive};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::state::ReservoirState;

/// Grid description as written in a case file (field units: bar, cP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridDef {
    pub cells: usize,
    pub pore_volume_m3: f64,
    /// Geometric transmissibility between neighbouring cells (m^3).
    pub transmissibility_m3: f64,
    #[serde(default = "default_viscosity_cp")]
    pub viscosity_cp: f64,
    #[serde(default = "default_compressibility_per_bar")]
    pub compressibility_per_bar: f64,
    /// Relative change of mobility per bar above the reference pressure.
    #[serde(default)]
    pub mobility_exponent_per_bar: f64,
    pub reference_pressure_bar: f64,
    pub initial_pressure_bar: f64,
}

fn default_viscosity_cp() -> f64 {
    1.0
}

fn default_compressibility_per_bar() -> f64 {
    1.0e-4
}

/// Grid in SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: usize,
    pore_volume: f64,
    transmissibility: f64,
    reference_mobility: f64,
    compressibility: f64,
    mobility_exponent: f64,
    reference_pressure: f64,
    initial_pressure: f64,
}

impl Grid {
    pub fn from_def(def: &GridDef) -> ModelResult<Self> {
        if def.cells == 0 {
            return Err(ModelError::Invalid {
                what: "grid must have at least one cell".to_string(),
            });
        }
        ensure_positive(def.pore_volume_m3, "pore_volume_m3")?;
        ensure_positive(def.transmissibility_m3, "transmissibility_m3")?;
        ensure_positive(def.viscosity_cp, "viscosity_cp")?;
        ensure_positive(def.compressibility_per_bar, "compressibility_per_bar")?;
        ensure_finite(def.mobility_exponent_per_bar, "mobility_exponent_per_bar")?;
        ensure_positive(def.reference_pressure_bar, "reference_pressure_bar")?;
        ensure_positive(def.initial_pressure_bar, "initial_pressure_bar")?;

        // 1 cP = 1e-3 Pa s; per-bar coefficients become per-Pa.
        Ok(Self {
            cells: def.cells,
            pore_volume: def.pore_volume_m3,
            transmissibility: def.transmissibility_m3,
            reference_mobility: 1.0 / (def.viscosity_cp * 1.0e-3),
            compressibility: def.compressibility_per_bar / bar_to_pa(1.0),
            mobility_exponent: def.mobility_exponent_per_bar / bar_to_pa(1.0),
            reference_pressure: bar_to_pa(def.reference_pressure_bar),
            initial_pressure: bar_to_pa(def.initial_pressure_bar),
        })
    }

    pub fn num_cells(&self) -> usize {
        self.cells
    }

    pub fn pore_volume(&self) -> f64 {
        self.pore_volume
    }

    pub fn transmissibility(&self) -> f64 {
        self.transmissibility
    }

    pub fn compressibility(&self) -> f64 {
        self.compressibility
    }

    pub fn initial_state(&self) -> ReservoirState {
        ReservoirState::uniform(self.cells, self.initial_pressure)
    }

    /// Fluid content per unit pore volume, relative to the reference pressure.
    pub fn fluid_content(&self, p: f64) -> f64 {
        (self.compressibility * (p - self.reference_pressure)).exp()
    }

    pub fn d_fluid_content(&self, p: f64) -> f64 {
        self.compressibility * self.fluid_content(p)
    }

    /// Mobility (1/(Pa s)) at pressure `p`.
    pub fn mobility(&self, p: f64) -> f64 {
        self.reference_mobility * (self.mobility_exponent * (p - self.reference_pressure)).exp()
    }

    pub fn d_mobility(&self, p: f64) -> f64 {
        self.mobility_exponent * self.mobility(p)
    }

    /// Total fluid content of the grid in reference volumes (m^3).
    pub fn fluid_in_place(&self, pressure: &[f64]) -> f64 {
        pressure
            .iter()
            .map(|&p| self.pore_volume * self.fluid_content(p))
            .sum()
    }
}
