//! Decoded controller state
//!
//! Holds the latest logical button and axis values plus the turntable angle.
//! Only [`ControllerReader`](super::reader::ControllerReader) mutates it, once
//! per tick; everything downstream reads it.

use std::collections::HashMap;

use super::controls::LogicalControl;

/// Wraps any finite angle into `[0, 360)`
pub fn normalize_angle(angle: f64) -> f64 {
    ((angle % 360.0) + 360.0) % 360.0
}

/// Unwraps a bounded absolute wheel reading into a signed per-tick delta
#[derive(Debug, Clone, Default)]
struct TurntableTracker {
    previous_absolute_angle: f64,
}

impl TurntableTracker {
    /// Signed step from the last reading
    ///
    /// Steps of 180° or more are folded back through the seam: a negative step
    /// becomes `360 + delta` and a positive one `360 - delta`. Both wrap results
    /// come out positive.
    fn unwrap(&mut self, angle_deg: f64) -> f64 {
        let mut delta = angle_deg - self.previous_absolute_angle;
        if delta.abs() >= 180.0 {
            delta = if delta < 0.0 { 360.0 + delta } else { 360.0 - delta };
        }
        self.previous_absolute_angle = angle_deg;
        delta
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    buttons: HashMap<LogicalControl, bool>,
    axes: HashMap<LogicalControl, f64>,
    turntable_angle: f64,
    turntable_accumulator: f64,
    tracker: TurntableTracker,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last decoded value, `false` if the control was never read
    pub fn button(&self, control: LogicalControl) -> bool {
        self.buttons.get(&control).copied().unwrap_or(false)
    }

    /// Last decoded value, `None` if the control was never read
    pub fn button_state(&self, control: LogicalControl) -> Option<bool> {
        self.buttons.get(&control).copied()
    }

    pub fn axis(&self, control: LogicalControl) -> Option<f64> {
        self.axes.get(&control).copied()
    }

    /// Turntable angle in `[0, 360)`
    pub fn turntable_angle(&self) -> f64 {
        self.turntable_angle
    }

    /// Unbounded signed angle accumulated since the session started
    pub fn turntable_accumulator(&self) -> f64 {
        self.turntable_accumulator
    }

    pub(crate) fn set_button(&mut self, control: LogicalControl, pressed: bool) {
        self.buttons.insert(control, pressed);
    }

    pub(crate) fn set_axis(&mut self, control: LogicalControl, value: f64) {
        self.axes.insert(control, value);
    }

    /// Feeds an absolute wheel angle in degrees (axis mode)
    ///
    /// The unwrapped delta is scaled by `gain` before accumulation. The very first
    /// call sees a previous angle of 0 and therefore jumps by the raw reading.
    pub fn update_absolute(&mut self, angle_deg: f64, gain: f64) {
        let delta = self.tracker.unwrap(angle_deg);
        self.accumulate(delta * gain);
    }

    /// Feeds an already signed delta in degrees (digital mode)
    pub fn update_delta(&mut self, delta_deg: f64) {
        self.accumulate(delta_deg);
    }

    fn accumulate(&mut self, delta_deg: f64) {
        self.turntable_accumulator += delta_deg;
        self.turntable_angle = normalize_angle(self.turntable_accumulator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAIN: f64 = 2.0;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn normalize_stays_in_range() {
        for angle in [
            0.0, 359.999, 360.0, 720.5, -0.5, -360.0, -721.0, 1e9, -1e9, -1e-18,
        ] {
            let n = normalize_angle(angle);
            assert!((0.0..360.0).contains(&n), "{angle} -> {n}");
        }
    }

    #[test]
    fn normalize_ignores_whole_turns() {
        for k in -5..=5 {
            let shifted = 123.25 + 360.0 * k as f64;
            assert_close(normalize_angle(shifted), 123.25);
        }
        assert_close(normalize_angle(-90.0), 270.0);
    }

    #[test]
    fn unwrap_folds_large_steps_through_the_seam() {
        let mut tracker = TurntableTracker {
            previous_absolute_angle: 350.0,
        };
        assert_close(tracker.unwrap(10.0), 20.0);

        let mut tracker = TurntableTracker {
            previous_absolute_angle: 10.0,
        };
        assert_close(tracker.unwrap(350.0), 20.0);
        assert_close(tracker.previous_absolute_angle, 350.0);

        // Below the fold the raw difference is kept
        assert_close(tracker.unwrap(200.0), -150.0);
    }

    #[test]
    fn backward_seam_crossing_accumulates_upwards() {
        let mut state = ControllerState::new();
        state.update_absolute(10.0, GAIN);
        state.update_absolute(350.0, GAIN);
        assert_close(state.turntable_accumulator(), 60.0);
        assert_close(state.turntable_angle(), 60.0);
    }

    #[test]
    fn absolute_updates_apply_gain() {
        let mut state = ControllerState::new();
        state.update_absolute(0.0, GAIN);
        state.update_absolute(30.0, GAIN);
        assert_close(state.turntable_accumulator(), 60.0);
        assert_close(state.turntable_angle(), 60.0);

        state.update_absolute(10.0, GAIN);
        assert_close(state.turntable_accumulator(), 20.0);
    }

    #[test]
    fn first_absolute_reading_jumps_from_zero() {
        let mut state = ControllerState::new();
        state.update_absolute(-90.0, GAIN);
        assert_close(state.turntable_accumulator(), -180.0);
        assert_close(state.turntable_angle(), 180.0);
    }

    #[test]
    fn angle_tracks_accumulator_through_many_turns() {
        let mut state = ControllerState::new();
        for _ in 0..100 {
            state.update_delta(-7.5);
            assert_close(
                state.turntable_angle(),
                normalize_angle(state.turntable_accumulator()),
            );
        }
        assert_close(state.turntable_accumulator(), -750.0);
        assert_close(state.turntable_angle(), 330.0);
    }

    #[test]
    fn unread_controls_have_no_value() {
        let mut state = ControllerState::new();
        assert!(!state.button(LogicalControl::B1));
        assert_eq!(state.button_state(LogicalControl::B1), None);
        state.set_button(LogicalControl::B1, true);
        assert_eq!(state.button_state(LogicalControl::B1), Some(true));
        assert_eq!(state.axis(LogicalControl::TurntableAxis), None);
    }
}
