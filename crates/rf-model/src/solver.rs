//! Backward-Euler mass balance of the cell chain, solved with Newton.

use nalgebra::{DMatrix, DVector};
use rf_sim::{ConvergenceFailure, NonlinearSolver, SubStepContext, SubStepSolution};
use tracing::debug;

use crate::aquifer::AquiferModel;
use crate::error::ModelError;
use crate::grid::Grid;
use crate::newton::{NewtonSettings, newton_solve};
use crate::state::ReservoirState;
use crate::wells::WellModel;

/// Sources held fixed over one sub-step.
struct Sources {
    /// (cell, outflow m^3/s)
    wells: Vec<(usize, f64)>,
    /// (cell, aquifer pressure, productivity)
    aquifer: Option<(usize, f64, f64)>,
}

/// Solver for one report step; borrows the sub-models it updates.
pub struct ReservoirSolver<'a> {
    grid: &'a Grid,
    wells: &'a mut WellModel,
    aquifer: &'a mut AquiferModel,
    settings: &'a NewtonSettings,
}

impl<'a> ReservoirSolver<'a> {
    pub fn new(
        grid: &'a Grid,
        wells: &'a mut WellModel,
        aquifer: &'a mut AquiferModel,
        settings: &'a NewtonSettings,
    ) -> Self {
        Self {
            grid,
            wells,
            aquifer,
            settings,
        }
    }

    /// Residual and Jacobian, each row scaled by `dt / pore_volume`.
    fn assemble(
        &self,
        p_old: &[f64],
        p: &DVector<f64>,
        dt: f64,
        sources: &Sources,
    ) -> (DVector<f64>, DMatrix<f64>) {
        let grid = self.grid;
        let n = grid.num_cells();
        let scale = dt / grid.pore_volume();
        let mut r = DVector::zeros(n);
        let mut jac = DMatrix::zeros(n, n);

        for i in 0..n {
            r[i] = grid.fluid_content(p[i]) - grid.fluid_content(p_old[i]);
            jac[(i, i)] = grid.d_fluid_content(p[i]);
        }

        for i in 0..n.saturating_sub(1) {
            let j = i + 1;
            let dp = p[i] - p[j];
            let p_avg = 0.5 * (p[i] + p[j]);
            let t = grid.transmissibility();
            let lambda = grid.mobility(p_avg);
            let d_lambda = 0.5 * grid.d_mobility(p_avg);

            let flux = t * lambda * dp;
            let d_flux_di = t * (lambda + d_lambda * dp);
            let d_flux_dj = t * (-lambda + d_lambda * dp);

            r[i] += scale * flux;
            r[j] -= scale * flux;
            jac[(i, i)] += scale * d_flux_di;
            jac[(i, j)] += scale * d_flux_dj;
            jac[(j, i)] -= scale * d_flux_di;
            jac[(j, j)] -= scale * d_flux_dj;
        }

        for &(cell, rate) in &sources.wells {
            r[cell] += scale * rate;
        }

        if let Some((cell, p_aq, productivity)) = sources.aquifer {
            r[cell] -= scale * productivity * (p_aq - p[cell]);
            jac[(cell, cell)] += scale * productivity;
        }

        (r, jac)
    }
}

impl NonlinearSolver<ReservoirState> for ReservoirSolver<'_> {
    fn attempt_sub_step(
        &mut self,
        state: &ReservoirState,
        ctx: &SubStepContext,
    ) -> Result<SubStepSolution<ReservoirState>, ConvergenceFailure> {
        if state.num_cells() != self.grid.num_cells() {
            return Err(ConvergenceFailure {
                reason: format!(
                    "state has {} cells, grid has {}",
                    state.num_cells(),
                    self.grid.num_cells()
                ),
                nonlinear_iterations: 0,
                linear_iterations: 0,
            });
        }

        if ctx.revalidate_wells {
            self.wells.revalidate(&state.pressure);
        }

        let sources = Sources {
            wells: self.wells.cell_rates().collect(),
            aquifer: match (self.aquifer.connected_cell(), state.aquifer_pressure) {
                (Some(cell), Some(p_aq)) => Some((cell, p_aq, self.aquifer.productivity())),
                _ => None,
            },
        };

        let x0 = DVector::from_column_slice(&state.pressure);
        let outcome = newton_solve(
            &x0,
            |p| self.assemble(&state.pressure, p, ctx.dt, &sources),
            self.settings,
        )
        .map_err(|e| match e {
            ModelError::NoConvergence { reason, iterations } => ConvergenceFailure {
                reason,
                nonlinear_iterations: iterations,
                linear_iterations: iterations,
            },
            other => ConvergenceFailure {
                reason: other.to_string(),
                nonlinear_iterations: 0,
                linear_iterations: 0,
            },
        })?;

        debug!(
            report_step = ctx.report_step,
            sub_step = ctx.sub_step,
            iterations = outcome.iterations,
            residual = outcome.residual_norm,
            "Newton converged"
        );

        let pressure: Vec<f64> = outcome.x.iter().copied().collect();
        self.wells.commit(ctx.dt);
        let aquifer_pressure = match (sources.aquifer, state.aquifer_pressure) {
            (Some((cell, p_aq, _)), _) => Some(self.aquifer.commit(p_aq, pressure[cell], ctx.dt)),
            (None, p_aq) => p_aq,
        };

        Ok(SubStepSolution {
            state: ReservoirState {
                pressure,
                aquifer_pressure,
            },
            nonlinear_iterations: outcome.iterations,
            linear_iterations: outcome.linear_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aquifer::AquiferDef;
    use crate::grid::tests::grid_def;
    use crate::wells::{WellControlDef, WellDef, WellKind, WellStatus};
    use rf_sim::SubModelCoordinator;

    fn ctx(dt: f64) -> SubStepContext {
        SubStepContext {
            report_step: 0,
            sub_step: 0,
            attempt: 0,
            time: 0.0,
            dt,
            revalidate_wells: false,
        }
    }

    fn producer(cell: usize, rate_m3_per_day: f64) -> WellDef {
        WellDef {
            name: "P1".to_string(),
            cell,
            kind: WellKind::Producer,
            min_pressure_bar: None,
            controls: vec![WellControlDef {
                step: 0,
                status: WellStatus::Open,
                rate_m3_per_day,
            }],
        }
    }

    #[test]
    fn closed_reservoir_stays_at_rest() {
        let grid = Grid::from_def(&grid_def(4)).unwrap();
        let mut wells = WellModel::default();
        let mut aquifer = AquiferModel::inactive();
        let settings = NewtonSettings::default();
        let mut solver = ReservoirSolver::new(&grid, &mut wells, &mut aquifer, &settings);

        let state = grid.initial_state();
        let solution = solver.attempt_sub_step(&state, &ctx(86_400.0)).unwrap();
        assert_eq!(solution.state, state);
        assert_eq!(solution.nonlinear_iterations, 0);
    }

    #[test]
    fn single_cell_depletion_matches_analytic() {
        let grid = Grid::from_def(&grid_def(1)).unwrap();
        let mut wells = WellModel::new(vec![producer(0, 86.4)], 1).unwrap();
        wells.begin_report_step(0).unwrap();
        let mut aquifer = AquiferModel::inactive();
        let settings = NewtonSettings::default();
        let mut solver = ReservoirSolver::new(&grid, &mut wells, &mut aquifer, &settings);

        let state = grid.initial_state();
        let dt = 10_000.0;
        let solution = solver.attempt_sub_step(&state, &ctx(dt)).unwrap();

        // V (b(p) - b(p0)) = -q dt
        let b = grid.fluid_content(state.pressure[0]) - 1.0e-3 * dt / grid.pore_volume();
        let expected = 2.0e7 + b.ln() / grid.compressibility();
        assert!((solution.state.pressure[0] - expected).abs() < 1.0);
        assert!(solution.nonlinear_iterations > 0);
        assert!((wells.cumulative("P1").unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn production_is_balanced_by_depletion() {
        let grid = Grid::from_def(&grid_def(5)).unwrap();
        let mut wells = WellModel::new(vec![producer(4, 86.4)], 5).unwrap();
        wells.begin_report_step(0).unwrap();
        let mut aquifer = AquiferModel::inactive();
        let settings = NewtonSettings::default();
        let mut solver = ReservoirSolver::new(&grid, &mut wells, &mut aquifer, &settings);

        let state = grid.initial_state();
        let dt = 86_400.0;
        let solution = solver.attempt_sub_step(&state, &ctx(dt)).unwrap();

        let produced = grid.fluid_in_place(&state.pressure)
            - grid.fluid_in_place(&solution.state.pressure);
        assert!((produced - 86.4).abs() < 1e-2);
        // Drawdown is deepest at the well.
        assert!(solution.state.pressure[4] < solution.state.pressure[0]);
    }

    #[test]
    fn excessive_pressure_change_fails_without_side_effects() {
        let grid = Grid::from_def(&grid_def(1)).unwrap();
        let mut wells = WellModel::new(vec![producer(0, 8640.0)], 1).unwrap();
        wells.begin_report_step(0).unwrap();
        let mut aquifer = AquiferModel::inactive();
        let settings = NewtonSettings {
            max_change: 1.0e5,
            ..NewtonSettings::default()
        };
        let mut solver = ReservoirSolver::new(&grid, &mut wells, &mut aquifer, &settings);

        let state = grid.initial_state();
        let failure = solver
            .attempt_sub_step(&state, &ctx(10.0 * 86_400.0))
            .unwrap_err();
        assert!(failure.reason.contains("exceeds limit"));
        assert_eq!(wells.cumulative("P1"), Some(0.0));
    }

    #[test]
    fn aquifer_supports_pressure_and_depletes() {
        let grid = Grid::from_def(&grid_def(2)).unwrap();
        let mut wells = WellModel::default();
        let mut aquifer = AquiferModel::new(
            &AquiferDef {
                cell: 0,
                productivity_m3_per_day_bar: 10.0,
                volume_m3: 1.0e7,
                compressibility_per_bar: 1.0e-4,
                initial_pressure_bar: Some(260.0),
            },
            2,
        )
        .unwrap();
        let settings = NewtonSettings::default();
        let mut state = grid.initial_state();
        state.aquifer_pressure = aquifer.initial_pressure(state.pressure[0]);

        let solution = {
            let mut solver = ReservoirSolver::new(&grid, &mut wells, &mut aquifer, &settings);
            solver.attempt_sub_step(&state, &ctx(86_400.0)).unwrap()
        };
        assert!(solution.state.pressure[0] > state.pressure[0]);
        assert!(solution.state.pressure[0] > solution.state.pressure[1]);
        let new_aq = solution.state.aquifer_pressure.unwrap();
        assert!(new_aq < 2.6e7);
        assert!(aquifer.cumulative_influx() > 0.0);
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let grid = Grid::from_def(&grid_def(3)).unwrap();
        let mut wells = WellModel::default();
        let mut aquifer = AquiferModel::inactive();
        let settings = NewtonSettings::default();
        let mut solver = ReservoirSolver::new(&grid, &mut wells, &mut aquifer, &settings);
        let state = ReservoirState::uniform(2, 2.0e7);
        assert!(solver.attempt_sub_step(&state, &ctx(1.0)).is_err());
    }
}
