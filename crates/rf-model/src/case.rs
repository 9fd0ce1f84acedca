//! Case files: simulator config, schedule, grid, wells and aquifer in one YAML.

use std::path::Path;

use rf_core::ensure_positive;
use rf_schedule::{ReportingSchedule, ScheduleDef};
use rf_sim::{OutputSink, SimulationDriver, SimulatorConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aquifer::{AquiferDef, AquiferModel};
use crate::error::ModelResult;
use crate::factory::ReservoirSolverFactory;
use crate::grid::{Grid, GridDef};
use crate::newton::NewtonSettings;
use crate::state::ReservoirState;
use crate::wells::{WellDef, WellModel};

/// Driver type for reservoir cases.
pub type ReservoirDriver = SimulationDriver<ReservoirState, WellModel, AquiferModel>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseDef {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub config: SimulatorConfig,
    pub schedule: ScheduleDef,
    pub grid: GridDef,
    #[serde(default)]
    pub wells: Vec<WellDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aquifer: Option<AquiferDef>,
    #[serde(default)]
    pub solver: SolverDef,
}

fn default_name() -> String {
    "case".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverDef {
    /// A sub-step fails when any cell pressure moves further than this.
    pub max_pressure_change_bar: f64,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            max_pressure_change_bar: 50.0,
        }
    }
}

/// A validated case, ready to run.
#[derive(Debug, Clone)]
pub struct Case {
    def: CaseDef,
    schedule: ReportingSchedule,
    grid: Grid,
    wells: WellModel,
    aquifer: AquiferModel,
    settings: NewtonSettings,
}

impl Case {
    pub fn from_def(def: CaseDef) -> ModelResult<Self> {
        def.config.validate()?;
        ensure_positive(
            def.solver.max_pressure_change_bar,
            "solver.max_pressure_change_bar",
        )?;

        let grid = Grid::from_def(&def.grid)?;
        let wells = WellModel::new(def.wells.clone(), grid.num_cells())?;
        let aquifer = match &def.aquifer {
            Some(aquifer) => AquiferModel::new(aquifer, grid.num_cells())?,
            None => AquiferModel::inactive(),
        };

        let mut schedule = ReportingSchedule::from_def(&def.schedule)?;
        for (step, event) in wells.events() {
            debug!(step, %event, "Well control event");
            schedule.add_event(step, event)?;
        }

        let settings = ReservoirSolverFactory::settings_from_config(
            &def.config.nonlinear,
            def.solver.max_pressure_change_bar,
        );

        Ok(Self {
            def,
            schedule,
            grid,
            wells,
            aquifer,
            settings,
        })
    }

    pub fn from_yaml_str(content: &str) -> ModelResult<Self> {
        let def: CaseDef = serde_yaml::from_str(content)?;
        Self::from_def(def)
    }

    pub fn load_yaml(path: &Path) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn def(&self) -> &CaseDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.def.config
    }

    pub fn schedule(&self) -> &ReportingSchedule {
        &self.schedule
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn wells(&self) -> &WellModel {
        &self.wells
    }

    pub fn aquifer(&self) -> &AquiferModel {
        &self.aquifer
    }

    /// Uniform initial pressure; the aquifer starts at its own pressure.
    pub fn initial_state(&self) -> ReservoirState {
        let mut state = self.grid.initial_state();
        state.aquifer_pressure = state
            .pressure
            .first()
            .and_then(|&p| self.aquifer.initial_pressure(p));
        state
    }

    /// Driver, schedule and initial state for a run of this case.
    pub fn into_driver(
        self,
        is_coordinator: bool,
        output: Box<dyn OutputSink<ReservoirState>>,
    ) -> ModelResult<(ReservoirDriver, ReportingSchedule, ReservoirState)> {
        let initial = self.initial_state();
        let factory = ReservoirSolverFactory::new(self.grid, self.settings);
        let driver = SimulationDriver::new(
            self.def.config,
            is_coordinator,
            Box::new(factory),
            self.wells,
            self.aquifer,
            output,
        )?;
        Ok((driver, self.schedule, initial))
    }
}
