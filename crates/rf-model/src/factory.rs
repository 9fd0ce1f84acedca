//! Builds a reservoir solver per report step.

use rf_core::bar_to_pa;
use rf_sim::{NonlinearConfig, NonlinearSolver, SimError, SimResult, SolverFactory};

use crate::aquifer::AquiferModel;
use crate::grid::Grid;
use crate::newton::NewtonSettings;
use crate::solver::ReservoirSolver;
use crate::state::ReservoirState;
use crate::wells::WellModel;

#[derive(Debug, Clone)]
pub struct ReservoirSolverFactory {
    grid: Grid,
    settings: NewtonSettings,
}

impl ReservoirSolverFactory {
    pub fn new(grid: Grid, settings: NewtonSettings) -> Self {
        Self { grid, settings }
    }

    /// Newton settings from the simulator's nonlinear section and a pressure
    /// change limit in bar.
    pub fn settings_from_config(
        nonlinear: &NonlinearConfig,
        max_pressure_change_bar: f64,
    ) -> NewtonSettings {
        NewtonSettings {
            max_iterations: nonlinear.nl_maxiter,
            tolerance: nonlinear.nl_tolerance,
            max_change: bar_to_pa(max_pressure_change_bar),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn settings(&self) -> &NewtonSettings {
        &self.settings
    }
}

impl SolverFactory<ReservoirState, WellModel, AquiferModel> for ReservoirSolverFactory {
    fn create_solver<'a>(
        &'a self,
        wells: &'a mut WellModel,
        aquifer: &'a mut AquiferModel,
    ) -> Box<dyn NonlinearSolver<ReservoirState> + 'a> {
        Box::new(ReservoirSolver::new(
            &self.grid,
            wells,
            aquifer,
            &self.settings,
        ))
    }

    fn check_state(
        &self,
        state: &ReservoirState,
        _wells: &WellModel,
        aquifer: &AquiferModel,
    ) -> SimResult<()> {
        let problem = if state.num_cells() != self.grid.num_cells() {
            Some(format!(
                "restored state has {} cells, grid has {}",
                state.num_cells(),
                self.grid.num_cells()
            ))
        } else if aquifer.is_active() && state.aquifer_pressure.is_none() {
            Some("restored state has no aquifer pressure but the case has an aquifer".to_string())
        } else if !aquifer.is_active() && state.aquifer_pressure.is_some() {
            Some("restored state has an aquifer pressure but the case has no aquifer".to_string())
        } else if state.pressure.iter().any(|p| !p.is_finite()) {
            Some("restored state has non-finite pressures".to_string())
        } else {
            None
        };
        match problem {
            Some(message) => Err(SimError::Restart { message }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aquifer::AquiferDef;
    use crate::grid::tests::grid_def;

    fn factory(cells: usize) -> ReservoirSolverFactory {
        let grid = Grid::from_def(&grid_def(cells)).unwrap();
        ReservoirSolverFactory::new(grid, NewtonSettings::default())
    }

    #[test]
    fn matching_state_is_accepted() {
        let factory = factory(3);
        let state = factory.grid().initial_state();
        let wells = WellModel::default();
        assert!(factory
            .check_state(&state, &wells, &AquiferModel::inactive())
            .is_ok());
    }

    #[test]
    fn state_of_another_grid_is_a_restart_error() {
        let factory = factory(3);
        let state = ReservoirState::uniform(5, 2.5e7);
        let result = factory.check_state(&state, &WellModel::default(), &AquiferModel::inactive());
        assert!(matches!(result, Err(SimError::Restart { .. })));
    }

    #[test]
    fn aquifer_pressure_must_match_the_case() {
        let factory = factory(2);
        let aquifer = AquiferModel::new(
            &AquiferDef {
                cell: 0,
                productivity_m3_per_day_bar: 1.0,
                volume_m3: 1.0e6,
                compressibility_per_bar: 1.0e-4,
                initial_pressure_bar: None,
            },
            2,
        )
        .unwrap();
        let wells = WellModel::default();

        let mut state = factory.grid().initial_state();
        assert!(factory.check_state(&state, &wells, &aquifer).is_err());
        state.aquifer_pressure = Some(2.5e7);
        assert!(factory.check_state(&state, &wells, &aquifer).is_ok());
        assert!(factory
            .check_state(&state, &wells, &AquiferModel::inactive())
            .is_err());
    }
}
