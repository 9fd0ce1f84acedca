//! Adaptive sub-stepping of report steps.
//!
//! A report step is cut into sub-steps of at most the suggested size. A
//! converged sub-step grows the suggestion by the growth factor (up to the
//! maximum); a failed one is retried at the attempted size times the shrink
//! factor (down to the minimum). A sub-step that fails at the minimum size, or
//! that exhausts the restart budget, fails the whole report step.
//!
//! Every update is plain arithmetic on the previous state and the solver's
//! verdict, so replicated controllers on different processes stay identical.

use rf_core::{StopWatch, Tolerances, days_to_seconds, nearly_equal, seconds_to_days};
use rf_report::{IntervalReport, StepReport};
use rf_schedule::{EventSet, SimulationTimer, Tuning};
use tracing::info;

use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::traits::{NonlinearSolver, SubStepContext};

/// Step-size bounds and factors in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepControl {
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub growth_factor: f64,
    pub shrink_factor: f64,
}

impl StepControl {
    pub fn from_config(config: &SimulatorConfig) -> SimResult<Self> {
        config.timestep.validate()?;
        let ts = &config.timestep;
        Ok(Self {
            initial_step: days_to_seconds(ts.initial_step_days),
            min_step: days_to_seconds(ts.min_step_days),
            max_step: days_to_seconds(ts.max_step_days),
            growth_factor: ts.growth_factor,
            shrink_factor: ts.shrink_factor,
        })
    }

    /// Overlay schedule tuning; absent fields keep the current values.
    pub fn with_tuning(&self, tuning: &Tuning) -> SimResult<Self> {
        let control = Self {
            initial_step: tuning.initial_step.unwrap_or(self.initial_step),
            min_step: tuning.min_step.unwrap_or(self.min_step),
            max_step: tuning.max_step.unwrap_or(self.max_step),
            growth_factor: tuning.growth_factor.unwrap_or(self.growth_factor),
            shrink_factor: tuning.shrink_factor.unwrap_or(self.shrink_factor),
        };
        control.validate()?;
        Ok(control)
    }

    pub fn validate(&self) -> SimResult<()> {
        let ok = self.min_step > 0.0
            && self.min_step <= self.max_step
            && self.initial_step > 0.0
            && self.growth_factor >= 1.0
            && self.shrink_factor > 0.0
            && self.shrink_factor < 1.0;
        if ok {
            Ok(())
        } else {
            Err(SimError::Config {
                what: format!("inconsistent step control {self:?}"),
            })
        }
    }
}

/// Proposed sub-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubStepPlan {
    pub dt: f64,
    /// The sub-step consumes everything left of the report step.
    pub is_final: bool,
}

/// Decision state of the controller: suggested size plus bounds and factors.
///
/// The suggested size stays within `[min_step, max_step]` after every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    suggested: f64,
    min_step: f64,
    max_step: f64,
    growth_factor: f64,
    shrink_factor: f64,
}

impl ControllerState {
    pub fn new(control: &StepControl) -> Self {
        let mut state = Self {
            suggested: control.initial_step,
            min_step: control.min_step,
            max_step: control.max_step,
            growth_factor: control.growth_factor,
            shrink_factor: control.shrink_factor,
        };
        state.set_suggested(control.initial_step);
        state
    }

    pub fn suggested(&self) -> f64 {
        self.suggested
    }

    pub fn min_step(&self) -> f64 {
        self.min_step
    }

    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    pub fn growth_factor(&self) -> f64 {
        self.growth_factor
    }

    pub fn shrink_factor(&self) -> f64 {
        self.shrink_factor
    }

    pub fn set_suggested(&mut self, step: f64) {
        self.suggested = step.clamp(self.min_step, self.max_step);
    }

    /// Next sub-step for `remaining` seconds of the report step. A leftover
    /// shorter than the minimum step, or within rounding of zero, is folded
    /// into this sub-step.
    pub fn plan(&self, remaining: f64) -> SubStepPlan {
        let leftover = remaining - self.suggested;
        if leftover < self.min_step || nearly_equal(self.suggested, remaining, Tolerances::time()) {
            SubStepPlan {
                dt: remaining,
                is_final: true,
            }
        } else {
            SubStepPlan {
                dt: self.suggested,
                is_final: false,
            }
        }
    }

    /// After a converged sub-step: `min(suggested * growth, max)`.
    pub fn record_success(&mut self) {
        self.suggested = (self.suggested * self.growth_factor).min(self.max_step);
    }

    /// After a failed attempt of size `attempted`: `max(attempted * shrink, min)`.
    ///
    /// Returns false, leaving the state untouched, when the attempt was already
    /// at or below the minimum step.
    pub fn record_failure(&mut self, attempted: f64) -> bool {
        if attempted <= self.min_step {
            return false;
        }
        self.suggested = (attempted * self.shrink_factor).max(self.min_step);
        true
    }

    /// Adopt new bounds and factors. With `reset` the suggestion restarts from
    /// the control's initial step, otherwise it is clamped into the new bounds.
    pub fn reconfigure(&mut self, control: &StepControl, reset: bool) {
        self.min_step = control.min_step;
        self.max_step = control.max_step;
        self.growth_factor = control.growth_factor;
        self.shrink_factor = control.shrink_factor;
        let target = if reset {
            control.initial_step
        } else {
            self.suggested
        };
        self.set_suggested(target);
    }
}

/// Schedule events in force for the report step being solved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveEvents<'a> {
    pub events: EventSet,
    /// Tuning in force at this report step, if any.
    pub tuning: Option<&'a Tuning>,
}

/// Subdivides report steps and recovers from sub-step convergence failures.
#[derive(Debug, Clone)]
pub struct AdaptiveStepController {
    configured: StepControl,
    state: ControllerState,
    use_tuning: bool,
    max_restarts: usize,
    step_after_event: Option<f64>,
    full_step_initially: bool,
    verbose: bool,
    terminal_output: bool,
    intervals_advanced: usize,
}

impl AdaptiveStepController {
    /// Controller from configuration; with `use_TUNING`, `tuning` (the tuning
    /// in force at the starting report step) overrides the configured control.
    pub fn new(
        config: &SimulatorConfig,
        tuning: Option<&Tuning>,
        terminal_output: bool,
    ) -> SimResult<Self> {
        let configured = StepControl::from_config(config)?;
        let control = match tuning {
            Some(t) if config.use_tuning => configured.with_tuning(t)?,
            _ => configured,
        };
        Ok(Self {
            configured,
            state: ControllerState::new(&control),
            use_tuning: config.use_tuning,
            max_restarts: config.timestep.max_restarts,
            step_after_event: config.timestep.step_after_event_days.map(days_to_seconds),
            full_step_initially: config.timestep.full_step_initially,
            verbose: config.timestep.verbose,
            terminal_output,
            intervals_advanced: 0,
        })
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn suggested_next_step(&self) -> f64 {
        self.state.suggested()
    }

    /// Seed the next sub-step size, e.g. from a restart hint.
    pub fn set_suggested_next_step(&mut self, step: f64) {
        self.state.set_suggested(step);
    }

    /// Re-derive bounds and factors from schedule tuning.
    pub fn update_tuning(&mut self, tuning: &Tuning) -> SimResult<()> {
        let control = self.configured.with_tuning(tuning)?;
        self.state
            .reconfigure(&control, tuning.initial_step.is_some());
        Ok(())
    }

    fn log(&self) -> bool {
        self.terminal_output
    }

    /// Solve the current report step of `timer` in one or more sub-steps.
    ///
    /// On return `state` holds the solution at the end of the report step.
    /// Failed attempts never modify `state`.
    pub fn advance_interval<S>(
        &mut self,
        timer: &SimulationTimer,
        solver: &mut dyn NonlinearSolver<S>,
        state: &mut S,
        active: &ActiveEvents<'_>,
    ) -> SimResult<IntervalReport> {
        if timer.done() {
            return Err(SimError::InvalidArg {
                what: "cannot advance a finished timer",
            });
        }
        let report_step = timer.current_step_num();

        if self.use_tuning && active.events.tuning_changed() {
            if let Some(tuning) = active.tuning {
                self.update_tuning(tuning)?;
                if self.log() {
                    info!(
                        report_step,
                        "Step control retuned: suggested {:.4} days, bounds [{:e}, {}] days",
                        seconds_to_days(self.state.suggested()),
                        seconds_to_days(self.state.min_step()),
                        seconds_to_days(self.state.max_step()),
                    );
                }
            }
        }

        let structural = active.events.has_structural();
        if self.full_step_initially && self.intervals_advanced == 0 {
            self.state.set_suggested(timer.current_step_length());
        }
        if structural {
            if let Some(after_event) = self.step_after_event {
                self.state.set_suggested(after_event);
            }
        }

        let interval_end = timer.current_step_end();
        let mut elapsed = timer.simulation_time_elapsed();
        let mut report = IntervalReport::default();
        let mut sub_step = 0;
        let mut cuts = 0;

        while elapsed < interval_end {
            let plan = self.state.plan(interval_end - elapsed);
            let ctx = SubStepContext {
                report_step,
                sub_step,
                attempt: cuts,
                time: elapsed,
                dt: plan.dt,
                revalidate_wells: structural && sub_step == 0,
            };

            if self.verbose && self.log() {
                info!(
                    report_step,
                    sub_step,
                    "Sub-step {} at day {:.4}, size {:.4} days",
                    sub_step,
                    seconds_to_days(elapsed),
                    seconds_to_days(plan.dt),
                );
            }

            let mut watch = StopWatch::started();
            let outcome = solver.attempt_sub_step(state, &ctx);
            let solve_time = watch.stop();

            match outcome {
                Ok(solution) => {
                    *state = solution.state;
                    report.accepted.accumulate_step(&StepReport {
                        step_length: plan.dt,
                        solve_time,
                        nonlinear_iterations: solution.nonlinear_iterations,
                        linear_iterations: solution.linear_iterations,
                        converged: true,
                        cuts,
                    });
                    elapsed = if plan.is_final {
                        interval_end
                    } else {
                        elapsed + plan.dt
                    };
                    self.state.record_success();
                    sub_step += 1;
                    cuts = 0;
                }
                Err(failure) => {
                    report.failures.accumulate_step(&StepReport {
                        step_length: plan.dt,
                        solve_time,
                        nonlinear_iterations: failure.nonlinear_iterations,
                        linear_iterations: failure.linear_iterations,
                        converged: false,
                        cuts,
                    });
                    cuts += 1;

                    if cuts > self.max_restarts {
                        return Err(SimError::IntervalFailed {
                            report_step,
                            last_step: plan.dt,
                            reason: format!(
                                "sub-step failed {cuts} times in a row (limit {}): {failure}",
                                self.max_restarts
                            ),
                        });
                    }
                    if !self.state.record_failure(plan.dt) {
                        return Err(SimError::IntervalFailed {
                            report_step,
                            last_step: plan.dt,
                            reason: format!("no convergence at the minimum step size: {failure}"),
                        });
                    }
                    if self.log() {
                        info!(
                            report_step,
                            "Sub-step of {:.4} days failed ({failure}); retrying with {:.4} days",
                            seconds_to_days(plan.dt),
                            seconds_to_days(self.state.suggested()),
                        );
                    }
                }
            }
        }

        self.intervals_advanced += 1;
        Ok(report)
    }
}

/// Solve the current report step as a single attempt; failure is fatal.
pub fn solve_full_interval<S>(
    timer: &SimulationTimer,
    solver: &mut dyn NonlinearSolver<S>,
    state: &mut S,
    events: EventSet,
) -> SimResult<IntervalReport> {
    if timer.done() {
        return Err(SimError::InvalidArg {
            what: "cannot advance a finished timer",
        });
    }
    let report_step = timer.current_step_num();
    let dt = timer.current_step_length();
    let ctx = SubStepContext {
        report_step,
        sub_step: 0,
        attempt: 0,
        time: timer.simulation_time_elapsed(),
        dt,
        revalidate_wells: events.has_structural(),
    };

    let mut watch = StopWatch::started();
    let outcome = solver.attempt_sub_step(state, &ctx);
    let solve_time = watch.stop();

    match outcome {
        Ok(solution) => {
            *state = solution.state;
            let mut report = IntervalReport::default();
            report.accepted.accumulate_step(&StepReport {
                step_length: dt,
                solve_time,
                nonlinear_iterations: solution.nonlinear_iterations,
                linear_iterations: solution.linear_iterations,
                converged: true,
                cuts: 0,
            });
            Ok(report)
        }
        Err(failure) => Err(SimError::IntervalFailed {
            report_step,
            last_step: dt,
            reason: format!("report step solved without sub-stepping: {failure}"),
        }),
    }
}
