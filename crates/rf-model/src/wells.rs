//! Rate-controlled wells with per-report-step controls.

use rf_core::{bar_to_pa, days_to_seconds, ensure_finite, pa_to_bar};
use rf_schedule::ScheduleEvent;
use rf_sim::{RestartValues, SimError, SimResult, SubModelCoordinator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellKind {
    Producer,
    Injector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellStatus {
    #[default]
    Open,
    Shut,
}

/// Control in force from `step` until the next control of the same well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WellControlDef {
    pub step: usize,
    #[serde(default)]
    pub status: WellStatus,
    #[serde(default)]
    pub rate_m3_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WellDef {
    pub name: String,
    pub cell: usize,
    pub kind: WellKind,
    /// Producers are shut when their cell drops below this pressure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pressure_bar: Option<f64>,
    pub controls: Vec<WellControlDef>,
}

impl WellDef {
    fn validate(&self, num_cells: usize) -> ModelResult<()> {
        if self.cell >= num_cells {
            return Err(ModelError::Invalid {
                what: format!(
                    "well {} is completed in cell {} but the grid has {} cells",
                    self.name, self.cell, num_cells
                ),
            });
        }
        if self.controls.is_empty() {
            return Err(ModelError::Invalid {
                what: format!("well {} has no controls", self.name),
            });
        }
        if !self.controls.windows(2).all(|w| w[0].step < w[1].step) {
            return Err(ModelError::Invalid {
                what: format!("controls of well {} must have increasing steps", self.name),
            });
        }
        for control in &self.controls {
            ensure_finite(control.rate_m3_per_day, "rate_m3_per_day")?;
            if control.rate_m3_per_day < 0.0 {
                return Err(ModelError::Invalid {
                    what: format!("well {} has a negative rate", self.name),
                });
            }
        }
        Ok(())
    }

    fn control_at(&self, step: usize) -> Option<&WellControlDef> {
        self.controls.iter().rev().find(|c| c.step <= step)
    }

    /// Schedule events implied by this well's controls.
    pub fn events(&self) -> Vec<(usize, ScheduleEvent)> {
        let mut events = Vec::new();
        let mut previous: Option<&WellControlDef> = None;
        for control in &self.controls {
            match previous {
                None => events.push((control.step, ScheduleEvent::NewWell)),
                Some(prev) => {
                    if prev.status != control.status {
                        events.push((control.step, ScheduleEvent::WellStatusChange));
                    }
                    if prev.rate_m3_per_day != control.rate_m3_per_day {
                        let event = match self.kind {
                            WellKind::Producer => ScheduleEvent::ProductionUpdate,
                            WellKind::Injector => ScheduleEvent::InjectionUpdate,
                        };
                        events.push((control.step, event));
                    }
                }
            }
            previous = Some(control);
        }
        events
    }
}

#[derive(Debug, Clone)]
struct Well {
    def: WellDef,
    /// Control in force; `None` before the well's first control.
    status: Option<WellStatus>,
    /// Surface rate magnitude (m^3/s).
    rate: f64,
    shut_by_limit: bool,
    cumulative: f64,
}

impl Well {
    fn is_flowing(&self) -> bool {
        self.status == Some(WellStatus::Open) && !self.shut_by_limit && self.rate > 0.0
    }

    /// Outflow from the completed cell (m^3/s); negative for injection.
    fn signed_rate(&self) -> f64 {
        if !self.is_flowing() {
            return 0.0;
        }
        match self.def.kind {
            WellKind::Producer => self.rate,
            WellKind::Injector => -self.rate,
        }
    }
}

/// All wells of a case.
#[derive(Debug, Clone, Default)]
pub struct WellModel {
    wells: Vec<Well>,
    report_step: Option<usize>,
}

impl WellModel {
    pub fn new(defs: Vec<WellDef>, num_cells: usize) -> ModelResult<Self> {
        let mut wells = Vec::with_capacity(defs.len());
        for def in defs {
            def.validate(num_cells)?;
            if wells.iter().any(|w: &Well| w.def.name == def.name) {
                return Err(ModelError::Invalid {
                    what: format!("duplicate well name {}", def.name),
                });
            }
            wells.push(Well {
                def,
                status: None,
                rate: 0.0,
                shut_by_limit: false,
                cumulative: 0.0,
            });
        }
        Ok(Self {
            wells,
            report_step: None,
        })
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }

    pub fn report_step(&self) -> Option<usize> {
        self.report_step
    }

    /// Schedule events of every well, in well order.
    pub fn events(&self) -> Vec<(usize, ScheduleEvent)> {
        self.wells.iter().flat_map(|w| w.def.events()).collect()
    }

    /// Cell index and outflow rate (m^3/s) of each flowing well.
    pub fn cell_rates(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.wells
            .iter()
            .filter(|w| w.is_flowing())
            .map(|w| (w.def.cell, w.signed_rate()))
    }

    pub fn is_flowing(&self, name: &str) -> bool {
        self.wells
            .iter()
            .any(|w| w.def.name == name && w.is_flowing())
    }

    /// Produced (positive) or injected volume of a well so far (m^3).
    pub fn cumulative(&self, name: &str) -> Option<f64> {
        self.wells
            .iter()
            .find(|w| w.def.name == name)
            .map(|w| w.cumulative)
    }

    /// Shut producers whose cell pressure is below their limit.
    ///
    /// Applies to the current report step only; the next
    /// `begin_report_step` reopens them.
    pub fn revalidate(&mut self, pressure: &[f64]) {
        for well in &mut self.wells {
            if !well.is_flowing() || well.def.kind != WellKind::Producer {
                continue;
            }
            let Some(limit) = well.def.min_pressure_bar.map(bar_to_pa) else {
                continue;
            };
            let p = pressure.get(well.def.cell).copied().unwrap_or(f64::NAN);
            if p.is_nan() || p < limit {
                warn!(
                    well = %well.def.name,
                    "Cell pressure {:.2} bar below limit {:.2} bar; well shut for this report step",
                    pa_to_bar(p),
                    pa_to_bar(limit),
                );
                well.shut_by_limit = true;
            }
        }
    }

    /// Book the volumes of an accepted sub-step of length `dt`.
    pub fn commit(&mut self, dt: f64) {
        for well in &mut self.wells {
            if well.is_flowing() {
                well.cumulative += well.rate * dt;
            }
        }
    }
}

/// Restart field holding the cumulative volume of well `name`.
pub fn cumulative_key(name: &str) -> String {
    format!("WCUM:{name}")
}

/// The single finite value of a restart field.
pub(crate) fn restart_scalar(values: &RestartValues, key: &str) -> SimResult<Option<f64>> {
    match values.get(key).map(Vec::as_slice) {
        None => Ok(None),
        Some([v]) if v.is_finite() => Ok(Some(*v)),
        Some(other) => Err(SimError::Restart {
            message: format!("{key} must hold one finite value, found {other:?}"),
        }),
    }
}

impl SubModelCoordinator for WellModel {
    fn begin_report_step(&mut self, report_step: usize) -> SimResult<()> {
        for well in &mut self.wells {
            let control = well.def.control_at(report_step);
            well.status = control.map(|c| c.status);
            well.rate = control.map_or(0.0, |c| c.rate_m3_per_day / days_to_seconds(1.0));
            well.shut_by_limit = false;
        }
        self.report_step = Some(report_step);
        Ok(())
    }

    fn end_report_step(&mut self) -> SimResult<()> {
        for well in &self.wells {
            debug!(
                well = %well.def.name,
                cumulative_m3 = well.cumulative,
                flowing = well.is_flowing(),
                "Well totals"
            );
        }
        Ok(())
    }
    fn restart_keys(&self) -> Vec<String> {
        self.wells
            .iter()
            .map(|w| cumulative_key(&w.def.name))
            .collect()
    }

    fn save_restart(&self, values: &mut RestartValues) {
        for well in &self.wells {
            values.insert(cumulative_key(&well.def.name), vec![well.cumulative]);
        }
    }

    fn init_from_restart(&mut self, values: &RestartValues) -> SimResult<()> {
        for well in &mut self.wells {
            match restart_scalar(values, &cumulative_key(&well.def.name))? {
                Some(cumulative) => well.cumulative = cumulative,
                None => warn!(
                    well = %well.def.name,
                    "No saved total in restart data; cumulative volume starts from zero"
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer() -> WellDef {
        WellDef {
            name: "P1".to_string(),
            cell: 1,
            kind: WellKind::Producer,
            min_pressure_bar: Some(100.0),
            controls: vec![
                WellControlDef {
                    step: 1,
                    status: WellStatus::Open,
                    rate_m3_per_day: 86.4,
                },
                WellControlDef {
                    step: 2,
                    status: WellStatus::Open,
                    rate_m3_per_day: 172.8,
                },
                WellControlDef {
                    step: 4,
                    status: WellStatus::Shut,
                    rate_m3_per_day: 172.8,
                },
            ],
        }
    }

    #[test]
    fn controls_derive_events() {
        let events = producer().events();
        assert_eq!(
            events,
            vec![
                (1, ScheduleEvent::NewWell),
                (2, ScheduleEvent::ProductionUpdate),
                (4, ScheduleEvent::WellStatusChange),
            ]
        );
    }

    #[test]
    fn controls_apply_per_report_step() {
        let mut wells = WellModel::new(vec![producer()], 3).unwrap();
        wells.begin_report_step(0).unwrap();
        assert_eq!(wells.cell_rates().count(), 0);

        wells.begin_report_step(1).unwrap();
        let rates: Vec<_> = wells.cell_rates().collect();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].0, 1);
        assert!((rates[0].1 - 1.0e-3).abs() < 1e-15);

        wells.begin_report_step(3).unwrap();
        assert!((wells.cell_rates().next().unwrap().1 - 2.0e-3).abs() < 1e-15);

        wells.begin_report_step(4).unwrap();
        assert!(!wells.is_flowing("P1"));
    }

    #[test]
    fn revalidation_shuts_producer_until_next_step() {
        let mut wells = WellModel::new(vec![producer()], 3).unwrap();
        wells.begin_report_step(1).unwrap();
        wells.revalidate(&[2.0e7, 5.0e6, 2.0e7]);
        assert!(!wells.is_flowing("P1"));

        wells.begin_report_step(2).unwrap();
        assert!(wells.is_flowing("P1"));
    }

    #[test]
    fn commit_books_volume() {
        let mut wells = WellModel::new(vec![producer()], 3).unwrap();
        wells.begin_report_step(1).unwrap();
        wells.commit(1000.0);
        assert!((wells.cumulative("P1").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn injector_rate_is_negative_outflow() {
        let mut def = producer();
        def.kind = WellKind::Injector;
        def.min_pressure_bar = None;
        assert_eq!(def.events()[1].1, ScheduleEvent::InjectionUpdate);

        let mut wells = WellModel::new(vec![def], 3).unwrap();
        wells.begin_report_step(1).unwrap();
        assert!(wells.cell_rates().next().unwrap().1 < 0.0);
    }

    #[test]
    fn rejects_well_outside_grid() {
        assert!(matches!(
            WellModel::new(vec![producer()], 1),
            Err(ModelError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        assert!(WellModel::new(vec![producer(), producer()], 3).is_err());
    }

    #[test]
    fn totals_survive_a_restart() {
        let mut wells = WellModel::new(vec![producer()], 3).unwrap();
        wells.begin_report_step(1).unwrap();
        wells.commit(1000.0);
        assert_eq!(wells.restart_keys(), vec!["WCUM:P1".to_string()]);

        let mut values = RestartValues::new();
        wells.save_restart(&mut values);

        let mut resumed = WellModel::new(vec![producer()], 3).unwrap();
        resumed.init_from_restart(&values).unwrap();
        assert_eq!(resumed.cumulative("P1"), wells.cumulative("P1"));
    }

    #[test]
    fn missing_total_starts_from_zero_but_malformed_is_an_error() {
        let mut wells = WellModel::new(vec![producer()], 3).unwrap();
        wells.init_from_restart(&RestartValues::new()).unwrap();
        assert_eq!(wells.cumulative("P1"), Some(0.0));

        let mut values = RestartValues::new();
        values.insert(cumulative_key("P1"), vec![1.0, 2.0]);
        assert!(matches!(
            wells.init_from_restart(&values),
            Err(SimError::Restart { .. })
        ));
    }
}
