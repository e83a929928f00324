//! # evdev Event Mapper
//!
//! Translates raw evdev events from an XInput-style pad (8BitDo in X mode,
//! Xbox, most Linux-supported gamepads) into [`GamepadEvent`]s.
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Axis | evdev Code | Emitted inputs |
//! |------|------------|----------------|
//! | Left Stick X | ABS_X | LeftStickLeft / LeftStickRight |
//! | Left Stick Y | ABS_Y | LeftStickUp / LeftStickDown |
//! | Right Stick X | ABS_RX | RightStickLeft / RightStickRight |
//! | Right Stick Y | ABS_RY | RightStickUp / RightStickDown |
//! | Left Trigger | ABS_Z | LeftTrigger |
//! | Right Trigger | ABS_RZ | RightTrigger |
//! | D-Pad X | ABS_HAT0X | DpadLeft / DpadRight |
//! | D-Pad Y | ABS_HAT0Y | DpadUp / DpadDown |
//!
//! Each stick event is split into two events: the active direction carries the
//! normalised magnitude and the opposite direction is reset to `0.0`. evdev Y
//! axes grow downward.
//!
//! ## Button Codes (EV_KEY)
//!
//! | Button | evdev Code |
//! |--------|------------|
//! | A (bottom) | BTN_SOUTH |
//! | B (right) | BTN_EAST |
//! | X (left) | BTN_WEST |
//! | Y (top) | BTN_NORTH |
//! | Left / Right Shoulder | BTN_TL / BTN_TR |
//! | Select / Start | BTN_SELECT / BTN_START |
//! | Stick clicks | BTN_THUMBL / BTN_THUMBR |

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};
use std::collections::HashMap;
use std::time::Instant;

use crate::input::{GamepadEvent, GamepadInput};

/// Raw range reported by an absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

/// Default stick range of the Linux xpad driver.
pub const STICK_RANGE: AxisRange = AxisRange { min: -32768, max: 32767 };
/// Default trigger range of the Linux xpad driver.
pub const TRIGGER_RANGE: AxisRange = AxisRange { min: 0, max: 255 };

/// evdev key event values.
const KEY_RELEASED: i32 = 0;
const KEY_PRESSED: i32 = 1;

impl AxisRange {
    /// Maps a raw value to `-1.0..=1.0` around the midpoint of the range.
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f32 {
        let half = (self.max as f32 - self.min as f32) / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        let center = (self.max as f32 + self.min as f32) / 2.0;
        ((raw as f32 - center) / half).clamp(-1.0, 1.0)
    }

    /// Maps a raw value to `0.0..=1.0` from the bottom of the range.
    #[must_use]
    pub fn normalize_unipolar(&self, raw: i32) -> f32 {
        let span = self.max as f32 - self.min as f32;
        if span <= 0.0 {
            return 0.0;
        }
        ((raw as f32 - self.min as f32) / span).clamp(0.0, 1.0)
    }
}

/// Stick axes and the (negative, positive) inputs they drive.
const STICK_AXES: [(AbsoluteAxisType, GamepadInput, GamepadInput); 4] = [
    (AbsoluteAxisType::ABS_X, GamepadInput::LeftStickLeft, GamepadInput::LeftStickRight),
    (AbsoluteAxisType::ABS_Y, GamepadInput::LeftStickUp, GamepadInput::LeftStickDown),
    (AbsoluteAxisType::ABS_RX, GamepadInput::RightStickLeft, GamepadInput::RightStickRight),
    (AbsoluteAxisType::ABS_RY, GamepadInput::RightStickUp, GamepadInput::RightStickDown),
];

/// Converts evdev events into host-neutral gamepad events.
#[derive(Debug, Clone)]
pub struct EventMapper {
    /// Ranges keyed by axis code; axes not listed use the xpad defaults.
    ranges: HashMap<u16, AxisRange>,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl EventMapper {
    /// Creates a mapper using the xpad default ranges.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ranges: HashMap::new(),
        }
    }

    /// Overrides the raw range of `axis`, typically from the device's abs info.
    #[must_use]
    pub fn with_range(mut self, axis: AbsoluteAxisType, range: AxisRange) -> Self {
        self.ranges.insert(axis.0, range);
        self
    }

    fn range(&self, axis: AbsoluteAxisType, fallback: AxisRange) -> AxisRange {
        self.ranges.get(&axis.0).copied().unwrap_or(fallback)
    }

    /// Translates one evdev event. Sync and unrelated events produce nothing.
    #[must_use]
    pub fn translate(&self, event: &InputEvent, at: Instant) -> Vec<GamepadEvent> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => self.translate_axis(axis, event.value(), at),
            InputEventKind::Key(key) => {
                let value = match event.value() {
                    KEY_RELEASED => 0.0,
                    KEY_PRESSED => 1.0,
                    // Autorepeat would re-fire toggles and z-writes
                    _ => return Vec::new(),
                };
                key_input(key)
                    .map(|input| vec![GamepadEvent::at(input, value, at)])
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    fn translate_axis(&self, axis: AbsoluteAxisType, raw: i32, at: Instant) -> Vec<GamepadEvent> {
        if let Some(&(_, negative, positive)) = STICK_AXES.iter().find(|(a, _, _)| *a == axis) {
            let value = self.range(axis, STICK_RANGE).normalize(raw);
            return split(value, negative, positive, at);
        }

        match axis {
            AbsoluteAxisType::ABS_Z => vec![GamepadEvent::at(
                GamepadInput::LeftTrigger,
                self.range(axis, TRIGGER_RANGE).normalize_unipolar(raw),
                at,
            )],
            AbsoluteAxisType::ABS_RZ => vec![GamepadEvent::at(
                GamepadInput::RightTrigger,
                self.range(axis, TRIGGER_RANGE).normalize_unipolar(raw),
                at,
            )],
            AbsoluteAxisType::ABS_HAT0X => {
                split(raw.signum() as f32, GamepadInput::DpadLeft, GamepadInput::DpadRight, at)
            }
            AbsoluteAxisType::ABS_HAT0Y => {
                split(raw.signum() as f32, GamepadInput::DpadUp, GamepadInput::DpadDown, at)
            }
            _ => {
                // Ignore other axes (gyro, accelerometer, etc.)
                Vec::new()
            }
        }
    }
}

/// Splits a signed value into an active direction and a released opposite.
fn split(value: f32, negative: GamepadInput, positive: GamepadInput, at: Instant) -> Vec<GamepadEvent> {
    if value < 0.0 {
        vec![GamepadEvent::at(negative, -value, at), GamepadEvent::at(positive, 0.0, at)]
    } else {
        vec![GamepadEvent::at(positive, value, at), GamepadEvent::at(negative, 0.0, at)]
    }
}

fn key_input(key: Key) -> Option<GamepadInput> {
    let input = match key {
        // Face buttons
        Key::BTN_SOUTH => GamepadInput::A,
        Key::BTN_EAST => GamepadInput::B,
        Key::BTN_WEST => GamepadInput::X,
        Key::BTN_NORTH => GamepadInput::Y,

        // Shoulder buttons
        Key::BTN_TL => GamepadInput::LeftShoulder,
        Key::BTN_TR => GamepadInput::RightShoulder,

        // System buttons
        Key::BTN_SELECT => GamepadInput::Menu1,
        Key::BTN_START => GamepadInput::Menu2,

        // Stick clicks
        Key::BTN_THUMBL => GamepadInput::LeftStick,
        Key::BTN_THUMBR => GamepadInput::RightStick,

        _ => return None,
    };
    Some(input)
}
