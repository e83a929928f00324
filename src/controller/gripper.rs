//! # Gripper Toggle
//!
//! Debounced open/close toggle driven by a single button.
//!
//! The toggle fires only on a clean press (value exactly `1.0`) and only when
//! at least the debounce interval has passed since the previous toggle. The
//! interval is measured from construction for the first press, so a press that
//! arrives right after the device is created is dropped.

use std::time::{Duration, Instant};
use tracing::debug;

/// Default minimum interval between two gripper toggles.
pub const DEFAULT_GRIPPER_DEBOUNCE: Duration = Duration::from_millis(700);

/// Debounced gripper state.
#[derive(Debug, Clone)]
pub struct GripperToggle {
    closed: bool,
    debounce: Duration,
    last_toggle: Instant,
}

impl GripperToggle {
    /// Creates an open gripper whose debounce window starts at `now`.
    #[must_use]
    pub fn new(debounce: Duration, now: Instant) -> Self {
        Self {
            closed: false,
            debounce,
            last_toggle: now,
        }
    }

    /// Returns true if the gripper is commanded closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Minimum interval between two toggles.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Processes a button value. Returns true if the state flipped.
    pub fn press(&mut self, value: f32, at: Instant) -> bool {
        #[allow(clippy::float_cmp)]
        let clean_press = value == 1.0;
        if !clean_press || at.saturating_duration_since(self.last_toggle) < self.debounce {
            return false;
        }

        self.closed = !self.closed;
        self.last_toggle = at;
        debug!("Gripper state changed: closed={}", self.closed);
        true
    }

    /// Opens the gripper without touching the debounce timestamp.
    pub fn open(&mut self) {
        self.closed = false;
    }
}
