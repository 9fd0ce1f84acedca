//! Reporting schedule: report-step lengths, events and tuning.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rf_core::{days_to_seconds, ensure_positive};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};
use crate::events::{EventSet, ScheduleEvent};
use crate::tuning::Tuning;

/// On-disk schedule description. Times are in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDef {
    #[serde(default)]
    pub start_date: NaiveDate,
    pub report_steps_days: Vec<f64>,
    #[serde(default)]
    pub events: Vec<ScheduleEventDef>,
    #[serde(default)]
    pub tuning: Vec<TuningDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEventDef {
    pub step: usize,
    pub events: Vec<ScheduleEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningDef {
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_step_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_step_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_step_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shrink_factor: Option<f64>,
}

impl TuningDef {
    fn to_tuning(&self) -> Tuning {
        Tuning {
            initial_step: self.initial_step_days.map(days_to_seconds),
            min_step: self.min_step_days.map(days_to_seconds),
            max_step: self.max_step_days.map(days_to_seconds),
            growth_factor: self.growth_factor,
            shrink_factor: self.shrink_factor,
        }
    }
}

/// Immutable sequence of reporting intervals with per-step events.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportingSchedule {
    start_date: NaiveDate,
    step_lengths: Vec<f64>,
    events: Vec<EventSet>,
    tuning: BTreeMap<usize, Tuning>,
}

impl ReportingSchedule {
    /// Build a schedule from report-step lengths in seconds.
    pub fn new(start_date: NaiveDate, step_lengths: Vec<f64>) -> ScheduleResult<Self> {
        if step_lengths.is_empty() {
            return Err(ScheduleError::Invalid {
                what: "schedule has no report steps".to_string(),
            });
        }
        for &len in &step_lengths {
            ensure_positive(len, "report step length")?;
        }
        let events = vec![EventSet::empty(); step_lengths.len()];
        Ok(Self {
            start_date,
            step_lengths,
            events,
            tuning: BTreeMap::new(),
        })
    }

    /// Build a schedule from report-step lengths in days.
    pub fn from_days(start_date: NaiveDate, step_days: &[f64]) -> ScheduleResult<Self> {
        Self::new(
            start_date,
            step_days.iter().copied().map(days_to_seconds).collect(),
        )
    }

    pub fn from_def(def: &ScheduleDef) -> ScheduleResult<Self> {
        let mut schedule = Self::from_days(def.start_date, &def.report_steps_days)?;
        for entry in &def.events {
            for &event in &entry.events {
                schedule.add_event(entry.step, event)?;
            }
        }
        for entry in &def.tuning {
            schedule.set_tuning(entry.step, entry.to_tuning())?;
        }
        Ok(schedule)
    }

    pub fn load_yaml(path: &Path) -> ScheduleResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let def: ScheduleDef = serde_yaml::from_str(&content)?;
        Self::from_def(&def)
    }

    fn check_step(&self, step: usize) -> ScheduleResult<()> {
        if step >= self.step_lengths.len() {
            return Err(ScheduleError::StepOutOfRange {
                step,
                len: self.step_lengths.len(),
            });
        }
        Ok(())
    }

    pub fn add_event(&mut self, step: usize, event: ScheduleEvent) -> ScheduleResult<()> {
        self.check_step(step)?;
        self.events[step].insert(event);
        Ok(())
    }

    /// Register tuning in force from `step`; marks a tuning-change event there.
    pub fn set_tuning(&mut self, step: usize, tuning: Tuning) -> ScheduleResult<()> {
        self.check_step(step)?;
        validate_tuning(&tuning)?;
        self.tuning.insert(step, tuning);
        self.events[step].insert(ScheduleEvent::TuningChange);
        Ok(())
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn num_steps(&self) -> usize {
        self.step_lengths.len()
    }

    pub fn step_lengths(&self) -> &[f64] {
        &self.step_lengths
    }

    pub fn step_length(&self, step: usize) -> Option<f64> {
        self.step_lengths.get(step).copied()
    }

    /// Events active at `step`; empty past the end.
    pub fn events_at(&self, step: usize) -> EventSet {
        self.events.get(step).copied().unwrap_or_default()
    }

    pub fn has_event(&self, event: ScheduleEvent, step: usize) -> bool {
        self.events_at(step).contains(event)
    }

    /// Tuning in force at `step`: the latest entry at or before it.
    pub fn tuning_at(&self, step: usize) -> Option<&Tuning> {
        self.tuning.range(..=step).next_back().map(|(_, t)| t)
    }

    pub fn total_time(&self) -> f64 {
        self.step_lengths.iter().sum()
    }
}

fn validate_tuning(tuning: &Tuning) -> ScheduleResult<()> {
    for (value, what) in [
        (tuning.initial_step, "tuning initial step"),
        (tuning.min_step, "tuning min step"),
        (tuning.max_step, "tuning max step"),
        (tuning.growth_factor, "tuning growth factor"),
        (tuning.shrink_factor, "tuning shrink factor"),
    ] {
        if let Some(v) = value {
            ensure_positive(v, what)?;
        }
    }
    if let (Some(min), Some(max)) = (tuning.min_step, tuning.max_step) {
        if min > max {
            return Err(ScheduleError::Invalid {
                what: format!("tuning min step {min} exceeds max step {max}"),
            });
        }
    }
    if tuning.growth_factor.is_some_and(|g| g < 1.0) {
        return Err(ScheduleError::Invalid {
            what: "tuning growth factor must be >= 1".to_string(),
        });
    }
    if tuning.shrink_factor.is_some_and(|f| f >= 1.0) {
        return Err(ScheduleError::Invalid {
            what: "tuning shrink factor must be < 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn rejects_empty_and_non_positive_steps() {
        assert!(ReportingSchedule::new(date(), vec![]).is_err());
        assert!(ReportingSchedule::new(date(), vec![1.0, 0.0]).is_err());
        assert!(ReportingSchedule::new(date(), vec![f64::NAN]).is_err());
    }

    #[test]
    fn events_out_of_range_are_rejected() {
        let mut schedule = ReportingSchedule::from_days(date(), &[10.0, 20.0]).unwrap();
        assert!(schedule.add_event(1, ScheduleEvent::NewWell).is_ok());
        let err = schedule.add_event(2, ScheduleEvent::NewWell).unwrap_err();
        assert!(matches!(err, ScheduleError::StepOutOfRange { step: 2, len: 2 }));
        assert!(schedule.has_event(ScheduleEvent::NewWell, 1));
        assert!(schedule.events_at(5).is_empty());
    }

    #[test]
    fn tuning_is_in_force_until_replaced() {
        let mut schedule = ReportingSchedule::from_days(date(), &[1.0; 5]).unwrap();
        let first = Tuning {
            max_step: Some(100.0),
            ..Tuning::default()
        };
        let second = Tuning {
            max_step: Some(50.0),
            ..Tuning::default()
        };
        schedule.set_tuning(1, first).unwrap();
        schedule.set_tuning(3, second).unwrap();

        assert!(schedule.tuning_at(0).is_none());
        assert_eq!(schedule.tuning_at(1), Some(&first));
        assert_eq!(schedule.tuning_at(2), Some(&first));
        assert_eq!(schedule.tuning_at(4), Some(&second));
        assert!(schedule.has_event(ScheduleEvent::TuningChange, 3));
        assert!(!schedule.has_event(ScheduleEvent::TuningChange, 2));
    }

    #[test]
    fn invalid_tuning_is_rejected() {
        let mut schedule = ReportingSchedule::from_days(date(), &[1.0]).unwrap();
        let bad_growth = Tuning {
            growth_factor: Some(0.5),
            ..Tuning::default()
        };
        assert!(schedule.set_tuning(0, bad_growth).is_err());
        let inverted = Tuning {
            min_step: Some(10.0),
            max_step: Some(1.0),
            ..Tuning::default()
        };
        assert!(schedule.set_tuning(0, inverted).is_err());
    }

    #[test]
    fn from_def_converts_days() {
        let def = ScheduleDef {
            start_date: date(),
            report_steps_days: vec![10.0, 30.0],
            events: vec![ScheduleEventDef {
                step: 0,
                events: vec![ScheduleEvent::NewWell],
            }],
            tuning: vec![TuningDef {
                step: 1,
                initial_step_days: None,
                min_step_days: None,
                max_step_days: Some(2.0),
                growth_factor: None,
                shrink_factor: None,
            }],
        };
        let schedule = ReportingSchedule::from_def(&def).unwrap();
        assert_eq!(schedule.num_steps(), 2);
        assert_eq!(schedule.step_length(0), Some(864_000.0));
        assert_eq!(schedule.tuning_at(1).and_then(|t| t.max_step), Some(172_800.0));
        assert!(schedule.has_event(ScheduleEvent::NewWell, 0));
        assert!(schedule.has_event(ScheduleEvent::TuningChange, 1));
    }
}
