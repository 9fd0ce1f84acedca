//! Wall-clock timing for solver and output phases.
//!
//! A [`StopWatch`] is either running or stopped. While running,
//! [`StopWatch::secs_since_start`] reports the live elapsed time; once stopped it
//! reports the frozen interval between start and stop.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
enum WatchState {
    Idle,
    Running(Instant),
    Stopped(Duration),
}

/// Restartable wall-clock stopwatch.
#[derive(Debug, Clone, Copy)]
pub struct StopWatch {
    state: WatchState,
}

impl Default for StopWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl StopWatch {
    /// An idle stopwatch; reports zero until started.
    pub const fn new() -> Self {
        Self {
            state: WatchState::Idle,
        }
    }

    /// Create and start a stopwatch.
    pub fn started() -> Self {
        let mut watch = Self::new();
        watch.start();
        watch
    }

    /// Start (or restart) timing from now.
    pub fn start(&mut self) {
        self.state = WatchState::Running(Instant::now());
    }

    /// Freeze the elapsed time and return it in seconds.
    pub fn stop(&mut self) -> f64 {
        if let WatchState::Running(started) = self.state {
            self.state = WatchState::Stopped(started.elapsed());
        }
        self.secs_since_start()
    }

    /// Seconds since the last start (frozen once stopped).
    pub fn secs_since_start(&self) -> f64 {
        match self.state {
            WatchState::Idle => 0.0,
            WatchState::Running(started) => started.elapsed().as_secs_f64(),
            WatchState::Stopped(elapsed) => elapsed.as_secs_f64(),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, WatchState::Running(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_watch_reports_zero() {
        let watch = StopWatch::new();
        assert_eq!(watch.secs_since_start(), 0.0);
        assert!(!watch.is_running());
    }

    #[test]
    fn stopped_watch_is_frozen() {
        let mut watch = StopWatch::started();
        std::thread::sleep(Duration::from_millis(2));
        let elapsed = watch.stop();
        assert!(elapsed > 0.0);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(watch.secs_since_start(), elapsed);
    }

    #[test]
    fn restart_resets_elapsed() {
        let mut watch = StopWatch::started();
        std::thread::sleep(Duration::from_millis(5));
        let first = watch.stop();
        watch.start();
        let second = watch.stop();
        assert!(second < first);
    }
}
