//! Report-step loop: sub-models, step control, output and report aggregation.

use rf_core::{StopWatch, seconds_to_days};
use rf_report::{FailureReport, IntervalReport, SimulatorReport};
use rf_schedule::{ReportingSchedule, SimulationTimer};
use tracing::{debug, info};

use crate::adaptive::{ActiveEvents, AdaptiveStepController, solve_full_interval};
use crate::config::SimulatorConfig;
use crate::error::SimResult;
use crate::restart::try_load_restart;
use crate::traits::{
    OutputSink, RestartSource, RestartValues, Snapshot, SolverFactory, SubModelCoordinator,
};

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome<S> {
    pub report: SimulatorReport,
    /// Work thrown away on rejected sub-steps.
    pub failures: FailureReport,
    pub state: S,
    /// Suggested next step at the end of the run (adaptive mode only).
    pub suggested_next_step: Option<f64>,
}

/// Runs report steps until the schedule is exhausted.
///
/// Control flow is identical on every process; `is_coordinator` only decides
/// whether this process logs.
pub struct SimulationDriver<S, W, A> {
    config: SimulatorConfig,
    terminal_output: bool,
    factory: Box<dyn SolverFactory<S, W, A>>,
    wells: W,
    aquifer: A,
    output: Box<dyn OutputSink<S>>,
    restart: Option<Box<dyn RestartSource<S>>>,
}

impl<S, W, A> SimulationDriver<S, W, A>
where
    W: SubModelCoordinator,
    A: SubModelCoordinator,
{
    pub fn new(
        config: SimulatorConfig,
        is_coordinator: bool,
        factory: Box<dyn SolverFactory<S, W, A>>,
        wells: W,
        aquifer: A,
        output: Box<dyn OutputSink<S>>,
    ) -> SimResult<Self> {
        config.validate()?;
        let terminal_output = config.output_terminal && is_coordinator;
        Ok(Self {
            config,
            terminal_output,
            factory,
            wells,
            aquifer,
            output,
            restart: None,
        })
    }

    /// Resume from `source` instead of the initial condition.
    pub fn with_restart(mut self, source: Box<dyn RestartSource<S>>) -> Self {
        self.restart = Some(source);
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn terminal_output(&self) -> bool {
        self.terminal_output
    }

    pub fn wells(&self) -> &W {
        &self.wells
    }

    pub fn aquifer(&self) -> &A {
        &self.aquifer
    }

    fn sub_model_values(&self) -> RestartValues {
        let mut values = RestartValues::new();
        self.wells.save_restart(&mut values);
        self.aquifer.save_restart(&mut values);
        values
    }

    fn should_write(&self, timer: &SimulationTimer) -> bool {
        self.config.output
            && (timer.done() || timer.current_step_num() % self.config.output_interval == 0)
    }

    /// Run every remaining report step of `schedule`.
    ///
    /// A report step that cannot be solved aborts the run with
    /// [`crate::SimError::IntervalFailed`]; nothing is retried across report
    /// steps.
    pub fn run(
        &mut self,
        schedule: &ReportingSchedule,
        initial_state: S,
    ) -> SimResult<RunOutcome<S>> {
        let mut total_watch = StopWatch::started();
        let mut failures = FailureReport::default();
        let mut report = SimulatorReport::default();

        let mut sub_model_keys = self.wells.restart_keys();
        sub_model_keys.extend(self.aquifer.restart_keys());
        let hint = try_load_restart(
            self.restart.is_some(),
            self.restart.as_deref_mut(),
            &sub_model_keys,
        )?;
        let mut state = initial_state;
        let mut start_step = 0;
        let mut restart_step_size = None;
        if let Some(hint) = hint {
            start_step = hint.report_step;
            restart_step_size = hint.suggested_step;
            if let Some(restored) = hint.state {
                self.factory
                    .check_state(&restored, &self.wells, &self.aquifer)?;
                state = restored;
            }
            self.wells.init_from_restart(&hint.sub_models)?;
            self.aquifer.init_from_restart(&hint.sub_models)?;
            if self.terminal_output {
                info!(report_step = start_step, "Resuming from restart data");
            }
        }
        let mut timer = SimulationTimer::starting_at(schedule, start_step)?;

        let mut controller = if self.config.timestep.adaptive {
            let tuning = schedule.tuning_at(timer.current_step_num());
            let mut controller =
                AdaptiveStepController::new(&self.config, tuning, self.terminal_output)?;
            if let Some(step) = restart_step_size {
                controller.set_suggested_next_step(step);
            }
            Some(controller)
        } else {
            None
        };

        while !timer.done() {
            if self.terminal_output {
                debug!("{}", timer.report());
            }

            let mut solver_watch = StopWatch::started();
            let report_step = timer.current_step_num();

            self.wells.begin_report_step(report_step)?;
            self.aquifer.begin_report_step(report_step)?;

            if timer.initial_step() && self.config.output {
                let mut write_watch = StopWatch::started();
                let sub_models = self.sub_model_values();
                self.output.write_snapshot(&Snapshot {
                    state: &state,
                    report_step,
                    elapsed: timer.simulation_time_elapsed(),
                    is_substep: false,
                    wall_clock: total_watch.secs_since_start(),
                    next_step: None,
                    sub_models: &sub_models,
                })?;
                report.output_write_time += write_watch.stop();
            }

            if self.terminal_output {
                info!(
                    "Report step {:>2}/{} at day {}/{}, date = {}",
                    report_step,
                    timer.num_steps(),
                    seconds_to_days(timer.simulation_time_elapsed()),
                    seconds_to_days(timer.total_time()),
                    timer.current_date_time().format("%d-%b-%Y"),
                );
            }

            let active = ActiveEvents {
                events: schedule.events_at(report_step),
                tuning: schedule.tuning_at(report_step),
            };

            let interval: IntervalReport = {
                let mut solver = self
                    .factory
                    .create_solver(&mut self.wells, &mut self.aquifer);
                match controller.as_mut() {
                    Some(controller) => {
                        controller.advance_interval(&timer, solver.as_mut(), &mut state, &active)?
                    }
                    None => {
                        let interval = solve_full_interval(
                            &timer,
                            solver.as_mut(),
                            &mut state,
                            active.events,
                        )?;
                        if self.terminal_output {
                            for line in interval.accepted.summary_lines() {
                                info!("{line}");
                            }
                        }
                        interval
                    }
                }
            };
            report += interval.accepted;
            failures += interval.failures;

            self.wells.end_report_step()?;
            self.aquifer.end_report_step()?;

            let step_time = solver_watch.stop();
            report.solver_time += step_time;

            timer.advance()?;

            if self.terminal_output && !timer.initial_step() {
                log_balance_banner(&timer);
            }

            if self.should_write(&timer) {
                let mut write_watch = StopWatch::started();
                let next_step = controller.as_ref().map(|c| c.suggested_next_step());
                let sub_models = self.sub_model_values();
                self.output.write_snapshot(&Snapshot {
                    state: &state,
                    report_step: timer.current_step_num(),
                    elapsed: timer.simulation_time_elapsed(),
                    is_substep: false,
                    wall_clock: total_watch.secs_since_start(),
                    next_step,
                    sub_models: &sub_models,
                })?;
                report.output_write_time += write_watch.stop();
            }

            if self.terminal_output {
                debug!(
                    "Time step took {:.3} seconds; total solver time {:.3} seconds.",
                    step_time, report.solver_time
                );
            }
        }

        report.total_time = total_watch.stop();
        report.converged = true;

        Ok(RunOutcome {
            report,
            failures,
            state,
            suggested_next_step: controller.as_ref().map(|c| c.suggested_next_step()),
        })
    }
}

fn log_balance_banner(timer: &SimulationTimer) {
    info!(
        "Balance at {:>10.2} Days * Report {:>4} {} *",
        seconds_to_days(timer.simulation_time_elapsed()),
        timer.current_step_num(),
        timer.current_date_time().format("%d %b %Y"),
    );
}
