//! Sliding-window statistics used by the event deriver

use chrono::{DateTime, Local, TimeDelta};
use std::collections::VecDeque;

/// Counts note timestamps younger than the window length
///
/// The count is a "notes in the last window" figure, not a rate.
#[derive(Debug, Clone)]
pub struct NoteRateWindow {
    window: TimeDelta,
    stamps: VecDeque<DateTime<Local>>,
}

impl NoteRateWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: TimeDelta::milliseconds(window_ms as i64),
            stamps: VecDeque::new(),
        }
    }

    pub fn push(&mut self, at: DateTime<Local>) {
        self.stamps.push_back(at);
    }

    /// Drops every stamp whose age has reached the window length
    pub fn prune(&mut self, now: DateTime<Local>) {
        while let Some(oldest) = self.stamps.front() {
            if now - *oldest >= self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.stamps.len()
    }
}

/// Running mean of short release durations in whole milliseconds
#[derive(Debug, Clone, Default)]
pub struct ReleaseAverage {
    sum_ms: f64,
    count: u32,
    average_ms: u32,
}

impl ReleaseAverage {
    pub fn record(&mut self, elapsed_ms: i64) {
        self.sum_ms += elapsed_ms.max(0) as f64;
        self.count += 1;
        self.average_ms = (self.sum_ms / f64::from(self.count)).round_ties_even() as u32;
    }

    /// Rounded half to even; 0 until the first sample
    pub fn average_ms(&self) -> u32 {
        self.average_ms
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
