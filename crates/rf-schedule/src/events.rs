//! Discrete schedule events keyed by report step.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A schedule-driven change that takes effect at the start of a report step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleEvent {
    NewWell,
    WellStatusChange,
    ProductionUpdate,
    InjectionUpdate,
    TuningChange,
}

impl ScheduleEvent {
    pub const ALL: [ScheduleEvent; 5] = [
        ScheduleEvent::NewWell,
        ScheduleEvent::WellStatusChange,
        ScheduleEvent::ProductionUpdate,
        ScheduleEvent::InjectionUpdate,
        ScheduleEvent::TuningChange,
    ];

    fn bit(self) -> u8 {
        match self {
            ScheduleEvent::NewWell => 1 << 0,
            ScheduleEvent::WellStatusChange => 1 << 1,
            ScheduleEvent::ProductionUpdate => 1 << 2,
            ScheduleEvent::InjectionUpdate => 1 << 3,
            ScheduleEvent::TuningChange => 1 << 4,
        }
    }

    /// Events that change the well configuration the solver must honour.
    pub fn is_structural(self) -> bool {
        !matches!(self, ScheduleEvent::TuningChange)
    }
}

impl fmt::Display for ScheduleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScheduleEvent::NewWell => "new well",
            ScheduleEvent::WellStatusChange => "well status change",
            ScheduleEvent::ProductionUpdate => "production update",
            ScheduleEvent::InjectionUpdate => "injection update",
            ScheduleEvent::TuningChange => "tuning change",
        };
        f.write_str(name)
    }
}

/// Set of events active at one report step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventSet(u8);

impl EventSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, event: ScheduleEvent) {
        self.0 |= event.bit();
    }

    pub fn with(mut self, event: ScheduleEvent) -> Self {
        self.insert(event);
        self
    }

    pub fn contains(&self, event: ScheduleEvent) -> bool {
        self.0 & event.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if any well-affecting event is present.
    pub fn has_structural(&self) -> bool {
        ScheduleEvent::ALL
            .iter()
            .any(|e| e.is_structural() && self.contains(*e))
    }

    pub fn tuning_changed(&self) -> bool {
        self.contains(ScheduleEvent::TuningChange)
    }

    pub fn union(self, other: EventSet) -> EventSet {
        EventSet(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = ScheduleEvent> + '_ {
        ScheduleEvent::ALL
            .into_iter()
            .filter(move |e| self.contains(*e))
    }
}

impl FromIterator<ScheduleEvent> for EventSet {
    fn from_iter<I: IntoIterator<Item = ScheduleEvent>>(iter: I) -> Self {
        let mut set = EventSet::empty();
        for event in iter {
            set.insert(event);
        }
        set
    }
}
