//! Analytical aquifer with depleting pressure.
//!
//! Influx into the connected cell is `J * (p_aq - p_cell)`. The aquifer
//! pressure is held fixed during a sub-step and depleted by the influx of each
//! accepted sub-step.

use rf_core::{bar_to_pa, days_to_seconds, ensure_positive};
use rf_sim::{RestartValues, SimResult, SubModelCoordinator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ModelError, ModelResult};
use crate::wells::restart_scalar;

/// Restart field holding the cumulative aquifer influx.
pub const AQUIFER_INFLUX_KEY: &str = "AQUIFER_INFLUX";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AquiferDef {
    #[serde(default)]
    pub cell: usize,
    pub productivity_m3_per_day_bar: f64,
    pub volume_m3: f64,
    #[serde(default = "default_compressibility_per_bar")]
    pub compressibility_per_bar: f64,
    /// Defaults to the grid's initial pressure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_pressure_bar: Option<f64>,
}

fn default_compressibility_per_bar() -> f64 {
    1.0e-4
}

#[derive(Debug, Clone, PartialEq)]
struct Aquifer {
    cell: usize,
    /// m^3 / (s Pa)
    productivity: f64,
    /// Volume change per unit pressure change (m^3 / Pa).
    capacity: f64,
    initial_pressure: Option<f64>,
}

/// Optional aquifer of a case; a case without one uses the inactive model.
#[derive(Debug, Clone, Default)]
pub struct AquiferModel {
    aquifer: Option<Aquifer>,
    cumulative_influx: f64,
    step_influx: f64,
}

impl AquiferModel {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn new(def: &AquiferDef, num_cells: usize) -> ModelResult<Self> {
        if def.cell >= num_cells {
            return Err(ModelError::Invalid {
                what: format!(
                    "aquifer connects to cell {} but the grid has {} cells",
                    def.cell, num_cells
                ),
            });
        }
        ensure_positive(def.productivity_m3_per_day_bar, "productivity_m3_per_day_bar")?;
        ensure_positive(def.volume_m3, "volume_m3")?;
        ensure_positive(def.compressibility_per_bar, "compressibility_per_bar")?;
        if let Some(p) = def.initial_pressure_bar {
            ensure_positive(p, "initial_pressure_bar")?;
        }

        let per_bar = bar_to_pa(1.0);
        Ok(Self {
            aquifer: Some(Aquifer {
                cell: def.cell,
                productivity: def.productivity_m3_per_day_bar / days_to_seconds(1.0) / per_bar,
                capacity: def.volume_m3 * def.compressibility_per_bar / per_bar,
                initial_pressure: def.initial_pressure_bar.map(bar_to_pa),
            }),
            cumulative_influx: 0.0,
            step_influx: 0.0,
        })
    }

    pub fn is_active(&self) -> bool {
        self.aquifer.is_some()
    }

    /// Starting aquifer pressure, given the reservoir's initial pressure.
    pub fn initial_pressure(&self, reservoir_pressure: f64) -> Option<f64> {
        self.aquifer
            .as_ref()
            .map(|a| a.initial_pressure.unwrap_or(reservoir_pressure))
    }

    pub fn connected_cell(&self) -> Option<usize> {
        self.aquifer.as_ref().map(|a| a.cell)
    }

    pub fn productivity(&self) -> f64 {
        self.aquifer.as_ref().map_or(0.0, |a| a.productivity)
    }

    /// Influx rate into the connected cell (m^3/s).
    pub fn influx_rate(&self, aquifer_pressure: f64, cell_pressure: f64) -> f64 {
        self.productivity() * (aquifer_pressure - cell_pressure)
    }

    /// Book the influx of an accepted sub-step and return the depleted
    /// aquifer pressure.
    pub fn commit(&mut self, aquifer_pressure: f64, cell_pressure: f64, dt: f64) -> f64 {
        let Some(aquifer) = &self.aquifer else {
            return aquifer_pressure;
        };
        let influx = aquifer.productivity * (aquifer_pressure - cell_pressure) * dt;
        let depleted = aquifer_pressure - influx / aquifer.capacity;
        self.cumulative_influx += influx;
        self.step_influx += influx;
        depleted
    }

    pub fn cumulative_influx(&self) -> f64 {
        self.cumulative_influx
    }
}

impl SubModelCoordinator for AquiferModel {
    fn begin_report_step(&mut self, _report_step: usize) -> SimResult<()> {
        self.step_influx = 0.0;
        Ok(())
    }

    fn end_report_step(&mut self) -> SimResult<()> {
        if self.is_active() {
            debug!(
                step_influx_m3 = self.step_influx,
                cumulative_influx_m3 = self.cumulative_influx,
                "Aquifer influx"
            );
        }
        Ok(())
    }
    fn restart_keys(&self) -> Vec<String> {
        if self.is_active() {
            vec![AQUIFER_INFLUX_KEY.to_string()]
        } else {
            Vec::new()
        }
    }

    fn save_restart(&self, values: &mut RestartValues) {
        if self.is_active() {
            values.insert(AQUIFER_INFLUX_KEY.to_string(), vec![self.cumulative_influx]);
        }
    }

    fn init_from_restart(&mut self, values: &RestartValues) -> SimResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        match restart_scalar(values, AQUIFER_INFLUX_KEY)? {
            Some(influx) => self.cumulative_influx = influx,
            None => warn!("No saved aquifer influx in restart data; starting from zero"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> AquiferDef {
        AquiferDef {
            cell: 0,
            productivity_m3_per_day_bar: 86.4,
            volume_m3: 1.0e6,
            compressibility_per_bar: 1.0e-4,
            initial_pressure_bar: Some(300.0),
        }
    }

    #[test]
    fn influx_depletes_aquifer() {
        let mut aquifer = AquiferModel::new(&def(), 2).unwrap();
        aquifer.begin_report_step(0).unwrap();
        let p_aq = aquifer.initial_pressure(2.5e7).unwrap();
        assert_eq!(p_aq, 3.0e7);

        // J = 1e-3 m^3/s/bar = 1e-8 m^3/(s Pa); 50 bar drive for 1000 s.
        let rate = aquifer.influx_rate(p_aq, 2.5e7);
        assert!((rate - 0.05).abs() < 1e-12);

        let depleted = aquifer.commit(p_aq, 2.5e7, 1000.0);
        assert!((aquifer.cumulative_influx() - 50.0).abs() < 1e-9);
        // capacity = 1e6 * 1e-9 = 1e-3 m^3/Pa
        assert!((depleted - (3.0e7 - 5.0e4)).abs() < 1e-6);
    }

    #[test]
    fn inactive_aquifer_does_nothing() {
        let mut aquifer = AquiferModel::inactive();
        assert!(!aquifer.is_active());
        assert_eq!(aquifer.initial_pressure(2.5e7), None);
        assert_eq!(aquifer.influx_rate(3.0e7, 2.5e7), 0.0);
        assert_eq!(aquifer.commit(3.0e7, 2.5e7, 10.0), 3.0e7);
    }

    #[test]
    fn defaults_to_reservoir_pressure() {
        let mut d = def();
        d.initial_pressure_bar = None;
        let aquifer = AquiferModel::new(&d, 1).unwrap();
        assert_eq!(aquifer.initial_pressure(2.5e7), Some(2.5e7));
    }

    #[test]
    fn rejects_cell_outside_grid() {
        let mut d = def();
        d.cell = 5;
        assert!(AquiferModel::new(&d, 2).is_err());
    }

    #[test]
    fn influx_total_survives_a_restart() {
        let mut aquifer = AquiferModel::new(&def(), 2).unwrap();
        aquifer.commit(3.0e7, 2.5e7, 1000.0);
        let mut values = RestartValues::new();
        aquifer.save_restart(&mut values);
        assert_eq!(aquifer.restart_keys(), vec![AQUIFER_INFLUX_KEY.to_string()]);

        let mut resumed = AquiferModel::new(&def(), 2).unwrap();
        resumed.init_from_restart(&values).unwrap();
        assert_eq!(resumed.cumulative_influx(), aquifer.cumulative_influx());

        let mut inactive = AquiferModel::inactive();
        assert!(inactive.restart_keys().is_empty());
        inactive.init_from_restart(&values).unwrap();
        assert_eq!(inactive.cumulative_influx(), 0.0);
    }
}
