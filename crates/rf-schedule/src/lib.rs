//! rf-schedule: reporting schedule, schedule events, tuning and the report-step timer.
//!
//! The schedule is immutable once loaded. The [`SimulationTimer`] is the only
//! mutable cursor over it and is advanced once per completed report step.

pub mod error;
pub mod events;
pub mod schedule;
pub mod timer;
pub mod tuning;

pub use error::{ScheduleError, ScheduleResult};
pub use events::{EventSet, ScheduleEvent};
pub use schedule::{ReportingSchedule, ScheduleDef, ScheduleEventDef, TuningDef};
pub use timer::SimulationTimer;
pub use tuning::Tuning;
