//! Report-step cursor over a [`ReportingSchedule`].

use chrono::{Duration, NaiveDateTime};
use rf_core::seconds_to_days;

use crate::error::{ScheduleError, ScheduleResult};
use crate::schedule::ReportingSchedule;

/// Tracks simulated time against the fixed sequence of report steps.
///
/// Elapsed time is taken from precomputed step boundaries rather than
/// accumulated, so it lands exactly on every report boundary.
#[derive(Debug, Clone)]
pub struct SimulationTimer {
    start: NaiveDateTime,
    boundaries: Vec<f64>,
    current_step: usize,
}

impl SimulationTimer {
    pub fn new(schedule: &ReportingSchedule) -> Self {
        let mut boundaries = Vec::with_capacity(schedule.num_steps() + 1);
        let mut t = 0.0;
        boundaries.push(t);
        for len in schedule.step_lengths() {
            t += len;
            boundaries.push(t);
        }
        Self {
            start: schedule.start_date().and_time(chrono::NaiveTime::MIN),
            boundaries,
            current_step: 0,
        }
    }

    /// Timer positioned at the beginning of `step` (used when resuming).
    pub fn starting_at(schedule: &ReportingSchedule, step: usize) -> ScheduleResult<Self> {
        let mut timer = Self::new(schedule);
        if step > timer.num_steps() {
            return Err(ScheduleError::StepOutOfRange {
                step,
                len: timer.num_steps(),
            });
        }
        timer.current_step = step;
        Ok(timer)
    }

    pub fn current_step_num(&self) -> usize {
        self.current_step
    }

    pub fn num_steps(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Length of the current report step; zero once done.
    pub fn current_step_length(&self) -> f64 {
        if self.done() {
            return 0.0;
        }
        self.boundaries[self.current_step + 1] - self.boundaries[self.current_step]
    }

    pub fn simulation_time_elapsed(&self) -> f64 {
        self.boundaries[self.current_step]
    }

    /// Simulated time at the end of the current report step.
    pub fn current_step_end(&self) -> f64 {
        self.boundaries[(self.current_step + 1).min(self.num_steps())]
    }

    pub fn total_time(&self) -> f64 {
        self.boundaries[self.num_steps()]
    }

    pub fn initial_step(&self) -> bool {
        self.current_step == 0
    }

    pub fn done(&self) -> bool {
        self.current_step >= self.num_steps()
    }

    /// Move to the next report step.
    pub fn advance(&mut self) -> ScheduleResult<()> {
        if self.done() {
            return Err(ScheduleError::AdvancePastEnd);
        }
        self.current_step += 1;
        Ok(())
    }

    /// Calendar time at the current elapsed simulation time.
    pub fn current_date_time(&self) -> NaiveDateTime {
        let millis = (self.simulation_time_elapsed() * 1000.0).round() as i64;
        self.start + Duration::milliseconds(millis)
    }

    /// One-line progress description.
    pub fn report(&self) -> String {
        format!(
            "Report step {:>2}/{} at day {}/{}, date = {}",
            self.current_step,
            self.num_steps(),
            seconds_to_days(self.simulation_time_elapsed()),
            seconds_to_days(self.total_time()),
            self.current_date_time().format("%d-%b-%Y"),
        )
    }
}
