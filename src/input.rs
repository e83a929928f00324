//! # Input Model
//!
//! Host-neutral gamepad input identifiers and the event type delivered to
//! command resolvers.
//!
//! Stick inputs are split per direction: a full left-stick push to the right
//! arrives as `LeftStickRight = 1.0` and `LeftStickLeft = 0.0`. All stick and
//! trigger values are non-negative magnitudes in `0.0..=1.0`; buttons report
//! `1.0` when pressed and `0.0` when released.

use serde::Deserialize;
use std::fmt;
use std::time::Instant;

/// A physical gamepad input as identified by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum GamepadInput {
    LeftStickRight,
    LeftStickLeft,
    LeftStickUp,
    LeftStickDown,
    RightStickRight,
    RightStickLeft,
    RightStickUp,
    RightStickDown,
    LeftTrigger,
    RightTrigger,
    A,
    B,
    X,
    Y,
    LeftShoulder,
    RightShoulder,
    /// Back / Select
    Menu1,
    /// Start
    Menu2,
    LeftStick,
    RightStick,
    DpadUp,
    DpadRight,
    DpadDown,
    DpadLeft,
}

impl fmt::Display for GamepadInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LeftStickRight => "Left Stick Right",
            Self::LeftStickLeft => "Left Stick Left",
            Self::LeftStickUp => "Left Stick Up",
            Self::LeftStickDown => "Left Stick Down",
            Self::RightStickRight => "Right Stick Right",
            Self::RightStickLeft => "Right Stick Left",
            Self::RightStickUp => "Right Stick Up",
            Self::RightStickDown => "Right Stick Down",
            Self::LeftTrigger => "Left Trigger",
            Self::RightTrigger => "Right Trigger",
            Self::A => "A",
            Self::B => "B",
            Self::X => "X",
            Self::Y => "Y",
            Self::LeftShoulder => "Left Shoulder",
            Self::RightShoulder => "Right Shoulder",
            Self::Menu1 => "Select",
            Self::Menu2 => "Start",
            Self::LeftStick => "Left Stick Click",
            Self::RightStick => "Right Stick Click",
            Self::DpadUp => "D-Pad Up",
            Self::DpadRight => "D-Pad Right",
            Self::DpadDown => "D-Pad Down",
            Self::DpadLeft => "D-Pad Left",
        };
        f.write_str(name)
    }
}

/// A single input change delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamepadEvent {
    pub input: GamepadInput,
    pub value: f32,
    /// When the host observed the change. Drives the gripper debounce.
    pub timestamp: Instant,
}

impl GamepadEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(input: GamepadInput, value: f32) -> Self {
        Self::at(input, value, Instant::now())
    }

    /// Creates an event with an explicit timestamp.
    #[must_use]
    pub fn at(input: GamepadInput, value: f32, timestamp: Instant) -> Self {
        Self {
            input,
            value,
            timestamp,
        }
    }
}
