//! Edge detection for driver controls.
//!
//! [`ButtonHandler`] debounces a raw digital input and exposes edges, a
//! toggle, double taps and holds. [`AnalogHandler`] shapes a stick or
//! trigger value with a deadzone and an exponential curve. Both take the
//! current time as an argument, so the caller decides where time comes from.
//!
//! # Example
//! ```rust
//! use embassy_time::Instant;
//! use holo_core::utils::{config::ButtonConfig, controllers::input::ButtonHandler};
//!
//! let mut a = ButtonHandler::new(&ButtonConfig::default());
//! a.update(true, Instant::from_millis(0));
//! assert!(a.just_pressed());
//! assert!(!a.just_pressed());
//! ```

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use crate::utils::config::{AnalogConfig, ButtonConfig};

/// Conditions a caller can bind an action to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "be", rename_all = "snake_case")]
pub enum ButtonEvent {
    Tap,
    /// Held for at least this many milliseconds.
    Hold { ms: u64 },
    Release,
    DoubleTap,
}

impl ButtonEvent {
    /// The 200 ms hold used when no duration is given.
    pub const HOLD: ButtonEvent = ButtonEvent::Hold { ms: 200 };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ae", rename_all = "snake_case")]
pub enum AnalogEvent {
    /// The shaped value differs from the previous update.
    Change,
    /// The shaped value is above `min`.
    Threshold { min: f64 },
}

impl AnalogEvent {
    pub const THRESHOLD: AnalogEvent = AnalogEvent::Threshold { min: 0.3 };
}

/// Debounced digital input with edge, toggle and tap tracking.
#[derive(Debug, Clone)]
pub struct ButtonHandler {
    double_tap: Duration,
    debounce: Duration,
    pressed: bool,
    toggle: bool,
    last_change: Option<Instant>,
    last_press: Option<Instant>,
    last_release: Option<Instant>,
    tap_count: u32,
    press_pending: bool,
    release_pending: bool,
}

impl ButtonHandler {
    /// Released, with the debounce and double-tap windows from `config`.
    pub fn new(config: &ButtonConfig) -> Self {
        Self {
            double_tap: config.double_tap(),
            debounce: config.debounce(),
            pressed: false,
            toggle: false,
            last_change: None,
            last_press: None,
            last_release: None,
            tap_count: 0,
            press_pending: false,
            release_pending: false,
        }
    }

    /// Feed the raw input. Call once per control cycle.
    ///
    /// A change arriving within the debounce window of the previous accepted
    /// change is ignored.
    pub fn update(
        &mut self,
        raw: bool,
        now: Instant,
    ) {
        if raw == self.pressed {
            return;
        }
        if let Some(last) = self.last_change {
            if now.saturating_duration_since(last) < self.debounce {
                return;
            }
        }
        self.last_change = Some(now);
        self.pressed = raw;

        if raw {
            self.press_pending = true;
            self.release_pending = false;
            self.toggle = !self.toggle;
            let quick = self
                .last_release
                .is_some_and(|r| now.saturating_duration_since(r) < self.double_tap);
            self.tap_count = if quick { self.tap_count + 1 } else { 1 };
            self.last_press = Some(now);
        } else {
            self.release_pending = true;
            self.press_pending = false;
            self.last_release = Some(now);
        }
    }

    /// Debounced state.
    pub fn pressed(&self) -> bool {
        self.pressed
    }

    /// Flipped on every accepted press.
    pub fn toggle(&self) -> bool {
        self.toggle
    }

    /// Presses in the current run of quick taps; 1 for a lone press.
    pub fn tap_count(&self) -> u32 {
        self.tap_count
    }

    /// Rising edge; true once per press.
    pub fn just_pressed(&mut self) -> bool {
        if self.pressed && self.press_pending {
            self.press_pending = false;
            return true;
        }
        false
    }

    /// Falling edge; true once per release.
    pub fn just_released(&mut self) -> bool {
        if !self.pressed && self.release_pending {
            self.release_pending = false;
            return true;
        }
        false
    }

    /// Falling edge that happened no longer than `within` ago. Consumes the
    /// same edge as [`ButtonHandler::just_released`].
    pub fn released(
        &mut self,
        within: Duration,
        now: Instant,
    ) -> bool {
        let recent = self
            .last_release
            .is_some_and(|r| now.saturating_duration_since(r) <= within);
        if !self.pressed && self.release_pending && recent {
            self.release_pending = false;
            return true;
        }
        false
    }

    /// Two or more quick taps, reported once the button is up again.
    pub fn double_tapped(&mut self) -> bool {
        if self.tap_count >= 2 && !self.pressed {
            self.tap_count = 0;
            return true;
        }
        false
    }

    /// Down for at least `duration` since the last accepted press.
    pub fn held(
        &self,
        duration: Duration,
        now: Instant,
    ) -> bool {
        self.pressed
            && self
                .last_press
                .is_some_and(|p| now.saturating_duration_since(p) >= duration)
    }

    /// Check `event`, consuming the edge it is based on.
    pub fn triggered(
        &mut self,
        event: ButtonEvent,
        now: Instant,
    ) -> bool {
        match event {
            ButtonEvent::Tap => self.just_pressed(),
            ButtonEvent::Hold { ms } => self.held(Duration::from_millis(ms), now),
            ButtonEvent::Release => self.just_released(),
            ButtonEvent::DoubleTap => self.double_tapped(),
        }
    }

    /// Back to released with no pending edges. Debounce history is kept.
    pub fn reset(&mut self) {
        self.pressed = false;
        self.toggle = false;
        self.tap_count = 0;
        self.press_pending = false;
        self.release_pending = false;
    }
}

/// Stick or trigger input with a deadzone and a response curve.
#[derive(Debug, Clone)]
pub struct AnalogHandler {
    deadzone: f64,
    exponent: f64,
    value: f64,
    previous: f64,
}

impl AnalogHandler {
    /// Resting at zero, shaped by `config`.
    pub fn new(config: &AnalogConfig) -> Self {
        Self {
            deadzone: config.deadzone,
            exponent: config.exponent,
            value: 0.0,
            previous: 0.0,
        }
    }

    /// Deadzone and curve: `|x| <= deadzone` maps to zero, the rest of the
    /// range is rescaled onto `(0, 1]` and raised to the exponent, keeping
    /// the sign of `x`. A non-finite reading maps to zero.
    pub fn shape(
        &self,
        x: f64,
    ) -> f64 {
        if !x.is_finite() {
            return 0.0;
        }
        let magnitude = f64::min(libm::fabs(x), 1.0);
        if magnitude <= self.deadzone {
            return 0.0;
        }
        let scaled = libm::pow((magnitude - self.deadzone) / (1.0 - self.deadzone), self.exponent);
        if x < 0.0 {
            -scaled
        } else {
            scaled
        }
    }

    /// Shape `raw` and store it, keeping the previous value for
    /// [`AnalogEvent::Change`].
    pub fn update(
        &mut self,
        raw: f64,
    ) -> f64 {
        self.previous = self.value;
        self.value = self.shape(raw);
        self.value
    }

    /// Shaped value from the last update.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether `event` holds for the last update.
    pub fn triggered(
        &self,
        event: AnalogEvent,
    ) -> bool {
        match event {
            AnalogEvent::Change => self.value != self.previous,
            AnalogEvent::Threshold { min } => self.value > min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(t: u64) -> Instant {
        Instant::from_millis(t)
    }

    fn button() -> ButtonHandler {
        ButtonHandler::new(&ButtonConfig::default())
    }

    #[test]
    fn edges_are_consumed_once() {
        let mut b = button();
        b.update(true, ms(0));
        assert!(b.just_pressed());
        assert!(!b.just_pressed());
        assert!(!b.just_released());
        b.update(false, ms(100));
        assert!(b.just_released());
        assert!(!b.just_released());
    }

    #[test]
    fn bounces_inside_window_are_ignored() {
        let mut b = button();
        b.update(true, ms(1000));
        b.update(false, ms(1020));
        assert!(b.pressed());
        b.update(false, ms(1050));
        assert!(!b.pressed());
    }

    #[test]
    fn toggle_flips_per_press() {
        let mut b = button();
        for (i, t) in [0, 100, 200, 300].into_iter().enumerate() {
            b.update(i % 2 == 0, ms(t));
        }
        // two presses
        assert!(!b.toggle());
        b.update(true, ms(400));
        assert!(b.toggle());
    }

    #[test]
    fn double_tap_within_threshold() {
        let mut b = button();
        b.update(true, ms(0));
        b.update(false, ms(100));
        b.update(true, ms(200));
        assert!(!b.double_tapped());
        b.update(false, ms(300));
        assert!(b.double_tapped());
        assert!(!b.double_tapped());
    }

    #[test]
    fn slow_taps_reset_counter() {
        let mut b = button();
        b.update(true, ms(0));
        b.update(false, ms(100));
        b.update(true, ms(500));
        b.update(false, ms(600));
        assert_eq!(b.tap_count(), 1);
        assert!(!b.double_tapped());
    }

    #[test]
    fn held_and_released_windows() {
        let mut b = button();
        b.update(true, ms(0));
        assert!(!b.held(Duration::from_millis(200), ms(199)));
        assert!(b.triggered(ButtonEvent::HOLD, ms(200)));
        b.update(false, ms(1000));
        assert!(!b.released(Duration::from_millis(300), ms(1400)));
        assert!(b.released(Duration::from_millis(300), ms(1300)));
        assert!(!b.triggered(ButtonEvent::Release, ms(1300)));
    }

    #[test]
    fn reset_clears_state() {
        let mut b = button();
        b.update(true, ms(0));
        b.reset();
        assert!(!b.pressed());
        assert!(!b.just_pressed());
        assert!(!b.toggle());
    }

    #[test]
    fn deadzone_boundary() {
        let a = AnalogHandler::new(&AnalogConfig::default());
        assert_eq!(a.shape(0.1), 0.0);
        assert_eq!(a.shape(-0.1), 0.0);
        assert_eq!(a.shape(1.0), 1.0);
        assert_eq!(a.shape(-1.0), -1.0);
    }

    #[test]
    fn non_finite_reading_is_centered() {
        let mut a = AnalogHandler::new(&AnalogConfig::default());
        assert_eq!(a.shape(f64::NAN), 0.0);
        assert_eq!(a.shape(f64::INFINITY), 0.0);
        assert_eq!(a.shape(f64::NEG_INFINITY), 0.0);
        assert_eq!(a.update(f64::NAN), 0.0);
        assert!(!a.triggered(AnalogEvent::THRESHOLD));
    }

    #[test]
    fn curve_preserves_sign() {
        let a = AnalogHandler::new(&AnalogConfig {
            deadzone: 0.0,
            exponent: 2.0,
        });
        assert!(libm::fabs(a.shape(0.5) - 0.25) < 1e-12);
        assert!(libm::fabs(a.shape(-0.5) + 0.25) < 1e-12);
    }

    #[test]
    fn analog_events() {
        let mut a = AnalogHandler::new(&AnalogConfig::default());
        a.update(0.05);
        assert!(!a.triggered(AnalogEvent::Change));
        a.update(0.9);
        assert!(a.triggered(AnalogEvent::Change));
        assert!(a.triggered(AnalogEvent::THRESHOLD));
        a.update(0.9);
        assert!(!a.triggered(AnalogEvent::Change));
    }
}
