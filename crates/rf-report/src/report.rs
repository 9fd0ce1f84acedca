//! Step and aggregate report types.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rf_core::seconds_to_days;
use serde::{Deserialize, Serialize};

/// Telemetry for one sub-step attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Simulated duration attempted (seconds).
    pub step_length: f64,
    /// Wall-clock time spent in the nonlinear solver (seconds).
    pub solve_time: f64,
    pub nonlinear_iterations: usize,
    pub linear_iterations: usize,
    pub converged: bool,
    /// Step-size cuts consumed before this attempt.
    pub cuts: usize,
}

/// Aggregate over many sub-steps plus driver overhead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorReport {
    /// Wall-clock time per report step including controller overhead (seconds).
    pub solver_time: f64,
    /// Wall-clock time inside the nonlinear solver (seconds).
    pub nonlinear_solve_time: f64,
    pub output_write_time: f64,
    pub total_time: f64,
    /// Simulated time covered by the recorded sub-steps (seconds).
    pub simulated_time: f64,
    pub sub_steps: usize,
    pub nonlinear_iterations: usize,
    pub linear_iterations: usize,
    pub step_cuts: usize,
    pub converged: bool,
}

/// Wasted work from rejected sub-step attempts; same shape and merge.
pub type FailureReport = SimulatorReport;

impl Default for SimulatorReport {
    fn default() -> Self {
        Self {
            solver_time: 0.0,
            nonlinear_solve_time: 0.0,
            output_write_time: 0.0,
            total_time: 0.0,
            simulated_time: 0.0,
            sub_steps: 0,
            nonlinear_iterations: 0,
            linear_iterations: 0,
            step_cuts: 0,
            converged: true,
        }
    }
}

impl SimulatorReport {
    /// Fold one sub-step into the numeric totals. `converged` is left alone:
    /// it only changes through top-level merges.
    pub fn accumulate_step(&mut self, step: &StepReport) {
        self.nonlinear_solve_time += step.solve_time;
        self.simulated_time += step.step_length;
        self.sub_steps += 1;
        self.nonlinear_iterations += step.nonlinear_iterations;
        self.linear_iterations += step.linear_iterations;
        self.step_cuts += step.cuts;
    }

    pub fn from_step(step: &StepReport) -> Self {
        let mut report = Self::default();
        report.accumulate_step(step);
        report
    }

    pub fn average_nonlinear_iterations(&self) -> f64 {
        if self.sub_steps == 0 {
            0.0
        } else {
            self.nonlinear_iterations as f64 / self.sub_steps as f64
        }
    }

    pub fn average_linear_iterations(&self) -> f64 {
        if self.nonlinear_iterations == 0 {
            0.0
        } else {
            self.linear_iterations as f64 / self.nonlinear_iterations as f64
        }
    }

    /// Human-readable summary, one entry per line.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Total time (seconds):         {:.3}", self.total_time),
            format!("Solver time (seconds):        {:.3}", self.solver_time),
            format!("  Nonlinear solve (seconds):  {:.3}", self.nonlinear_solve_time),
            format!("Output write time (seconds):  {:.3}", self.output_write_time),
            format!(
                "Simulated time (days):        {:.4}",
                seconds_to_days(self.simulated_time)
            ),
            format!("Sub-steps:                    {}", self.sub_steps),
            format!("Step cuts:                    {}", self.step_cuts),
            format!(
                "Nonlinear iterations:         {} ({:.1} per step)",
                self.nonlinear_iterations,
                self.average_nonlinear_iterations()
            ),
            format!(
                "Linear iterations:            {} ({:.1} per nonlinear iteration)",
                self.linear_iterations,
                self.average_linear_iterations()
            ),
        ];
        if !self.converged {
            lines.push("Run did not converge".to_string());
        }
        lines
    }
}

impl AddAssign<&SimulatorReport> for SimulatorReport {
    fn add_assign(&mut self, rhs: &SimulatorReport) {
        self.solver_time += rhs.solver_time;
        self.nonlinear_solve_time += rhs.nonlinear_solve_time;
        self.output_write_time += rhs.output_write_time;
        self.total_time += rhs.total_time;
        self.simulated_time += rhs.simulated_time;
        self.sub_steps += rhs.sub_steps;
        self.nonlinear_iterations += rhs.nonlinear_iterations;
        self.linear_iterations += rhs.linear_iterations;
        self.step_cuts += rhs.step_cuts;
        self.converged = self.converged && rhs.converged;
    }
}

impl AddAssign for SimulatorReport {
    fn add_assign(&mut self, rhs: SimulatorReport) {
        *self += &rhs;
    }
}

impl Add for SimulatorReport {
    type Output = SimulatorReport;

    fn add(mut self, rhs: SimulatorReport) -> SimulatorReport {
        self += &rhs;
        self
    }
}

impl Sum for SimulatorReport {
    fn sum<I: Iterator<Item = SimulatorReport>>(iter: I) -> Self {
        iter.fold(SimulatorReport::default(), Add::add)
    }
}

/// What the step controller hands back for one report step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalReport {
    pub accepted: SimulatorReport,
    pub failures: FailureReport,
}
