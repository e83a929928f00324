//! # SE(3) Command Resolver
//!
//! Maps gamepad events to 6-DOF delta poses for manipulators, plus a
//! debounced gripper toggle.
//!
//! ## Default Mapping
//!
//! | Command | Positive | Negative |
//! |---------|----------|----------|
//! | Toggle gripper | A | A |
//! | Move along x | Left Stick Right | Left Stick Left |
//! | Move along y | Left Stick Up | Left Stick Down |
//! | Move along z | Right Stick Up, B | Right Stick Down, X |
//! | Rotate about x | D-Pad Left | D-Pad Right |
//! | Rotate about y | D-Pad Up | D-Pad Down |
//! | Rotate about z | Right Stick Right | Right Stick Left |
//!
//! ## Resolution
//!
//! Every axis keeps two magnitudes: one for the positive stick direction and
//! one for the negative. The resolved value is the larger of the two, not
//! their difference. Rotation components are then read as intrinsic X→Y→Z
//! Euler angles and converted to a rotation vector.
//!
//! D-pad and B/X presses write an absolute value into the positive row and
//! nothing ever clears it except [`reset`](CommandResolver::reset) or a stick
//! event on the same cell. D-Pad Right/Down and X write a negated value into
//! the positive row, which the max-resolution then masks to zero while the
//! negative row is idle.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use super::calibration::DeadZone;
use super::gripper::{GripperToggle, DEFAULT_GRIPPER_DEBOUNCE};
use super::hooks::{CallbackTable, InputCallback};
use super::rotation::euler_xyz_to_rotvec;
use super::CommandResolver;
use crate::config::{GripperConfig, Se3Config};
use crate::input::{GamepadEvent, GamepadInput};

/// 6-DOF delta pose `(x, y, z, rx, ry, rz)`; translation in meters, rotation
/// as a rotation vector in radians.
pub type Se3Command = [f64; 6];

/// Default position sensitivity (meters per unit input).
pub const DEFAULT_SE3_POS_SENSITIVITY: f64 = 0.05;
/// Default rotation sensitivity (radians per unit input).
pub const DEFAULT_SE3_ROT_SENSITIVITY: f64 = 1.6;

/// D-pad presses register above this value.
const DPAD_PRESS_THRESHOLD: f32 = 0.5;

/// Column of a [`RawPosePair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseAxis {
    X = 0,
    Y = 1,
    Z = 2,
    Roll = 3,
    Pitch = 4,
    Yaw = 5,
}

impl PoseAxis {
    fn is_rotation(self) -> bool {
        matches!(self, Self::Roll | Self::Pitch | Self::Yaw)
    }
}

/// Row of a [`RawPosePair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive = 0,
    Negative = 1,
}

/// Stick directions feeding the pose grid.
const STICK_TABLE: [(GamepadInput, Direction, PoseAxis); 8] = [
    (GamepadInput::LeftStickRight, Direction::Positive, PoseAxis::X),
    (GamepadInput::LeftStickLeft, Direction::Negative, PoseAxis::X),
    (GamepadInput::LeftStickUp, Direction::Positive, PoseAxis::Y),
    (GamepadInput::LeftStickDown, Direction::Negative, PoseAxis::Y),
    (GamepadInput::RightStickUp, Direction::Positive, PoseAxis::Z),
    (GamepadInput::RightStickDown, Direction::Negative, PoseAxis::Z),
    (GamepadInput::RightStickRight, Direction::Positive, PoseAxis::Yaw),
    (GamepadInput::RightStickLeft, Direction::Negative, PoseAxis::Yaw),
];

/// D-pad buttons and the sign of the rotation they write.
const DPAD_TABLE: [(GamepadInput, PoseAxis, f64); 4] = [
    (GamepadInput::DpadLeft, PoseAxis::Roll, 1.0),
    (GamepadInput::DpadRight, PoseAxis::Roll, -1.0),
    (GamepadInput::DpadUp, PoseAxis::Pitch, 1.0),
    (GamepadInput::DpadDown, PoseAxis::Pitch, -1.0),
];

/// Two rows (positive, negative) by six axes (x, y, z, roll, pitch, yaw).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawPosePair {
    cells: [[f64; 6]; 2],
}

impl RawPosePair {
    #[must_use]
    pub fn get(&self, direction: Direction, axis: PoseAxis) -> f64 {
        self.cells[direction as usize][axis as usize]
    }

    pub fn set(&mut self, direction: Direction, axis: PoseAxis, value: f64) {
        self.cells[direction as usize][axis as usize] = value;
    }

    pub fn clear(&mut self) {
        self.cells = [[0.0; 6]; 2];
    }

    /// Element-wise maximum of the two rows.
    #[must_use]
    pub fn collapse(&self) -> [f64; 6] {
        let [positive, negative] = &self.cells;
        std::array::from_fn(|i| positive[i].max(negative[i]))
    }

    /// Collapses the grid and converts the rotation triple to a rotation vector.
    #[must_use]
    pub fn resolve(&self) -> Se3Command {
        let [x, y, z, roll, pitch, yaw] = self.collapse();
        let rotvec = euler_xyz_to_rotvec(roll, pitch, yaw);
        [x, y, z, rotvec.x, rotvec.y, rotvec.z]
    }
}

/// Resolves gamepad events into 6-DOF delta poses and a gripper command.
#[derive(Debug)]
pub struct Se3Resolver {
    pos_sensitivity: f64,
    rot_sensitivity: f64,
    dead_zone: DeadZone,
    /// Stick values are divided by this before the dead zone check.
    axis_full_scale: f32,
    gripper: GripperToggle,
    raw: RawPosePair,
    command: Se3Command,
    callbacks: CallbackTable,
}

impl Default for Se3Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Se3Resolver {
    /// Creates a resolver with default sensitivities and a normalised host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pos_sensitivity: DEFAULT_SE3_POS_SENSITIVITY,
            rot_sensitivity: DEFAULT_SE3_ROT_SENSITIVITY,
            dead_zone: DeadZone::default(),
            axis_full_scale: 1.0,
            gripper: GripperToggle::new(DEFAULT_GRIPPER_DEBOUNCE, Instant::now()),
            raw: RawPosePair::default(),
            command: [0.0; 6],
            callbacks: CallbackTable::new(),
        }
    }

    /// Builds a resolver from the `[se3]` and `[gripper]` config sections.
    #[must_use]
    pub fn from_config(se3: &Se3Config, gripper: &GripperConfig) -> Self {
        Self::new()
            .with_sensitivity(se3.pos_sensitivity, se3.rot_sensitivity)
            .with_dead_zone(se3.dead_zone)
            .with_axis_full_scale(se3.axis_full_scale)
            .with_gripper_debounce(Duration::from_millis(gripper.debounce_ms))
    }

    #[must_use]
    pub fn with_sensitivity(mut self, pos: f64, rot: f64) -> Self {
        self.pos_sensitivity = pos;
        self.rot_sensitivity = rot;
        self
    }

    #[must_use]
    pub fn with_dead_zone(mut self, threshold: f32) -> Self {
        self.dead_zone = DeadZone::new(threshold);
        self
    }

    /// Sets the raw value a fully deflected stick reports.
    #[must_use]
    pub fn with_axis_full_scale(mut self, full_scale: f32) -> Self {
        self.axis_full_scale = full_scale;
        self
    }

    /// Replaces the gripper debounce interval. Restarts the debounce window.
    #[must_use]
    pub fn with_gripper_debounce(mut self, debounce: Duration) -> Self {
        self.gripper = GripperToggle::new(debounce, Instant::now());
        self
    }

    /// Restarts the gripper debounce window at `now`.
    #[must_use]
    pub fn starting_at(mut self, now: Instant) -> Self {
        self.gripper = GripperToggle::new(self.gripper.debounce(), now);
        self
    }

    #[must_use]
    pub fn raw(&self) -> &RawPosePair {
        &self.raw
    }

    fn sensitivity(&self, axis: PoseAxis) -> f64 {
        if axis.is_rotation() {
            self.rot_sensitivity
        } else {
            self.pos_sensitivity
        }
    }

    fn apply(&mut self, event: &GamepadEvent) {
        let value = self.dead_zone.apply(event.value);

        if let Some(&(_, direction, axis)) = STICK_TABLE.iter().find(|(i, _, _)| *i == event.input) {
            let magnitude = value.abs() / self.axis_full_scale;
            let cell = if self.dead_zone.exceeds(magnitude) {
                f64::from(magnitude) * self.sensitivity(axis)
            } else {
                0.0
            };
            self.raw.set(direction, axis, cell);
            return;
        }

        if let Some(&(_, axis, sign)) = DPAD_TABLE.iter().find(|(i, _, _)| *i == event.input) {
            if value > DPAD_PRESS_THRESHOLD {
                self.raw.set(Direction::Positive, axis, sign * self.rot_sensitivity);
            }
            return;
        }

        #[allow(clippy::float_cmp)]
        let pressed = event.value == 1.0;
        match event.input {
            GamepadInput::A => {
                self.gripper.press(event.value, event.timestamp);
            }
            GamepadInput::B if pressed => {
                self.raw.set(Direction::Positive, PoseAxis::Z, self.pos_sensitivity);
            }
            GamepadInput::X if pressed => {
                self.raw.set(Direction::Positive, PoseAxis::Z, -self.pos_sensitivity);
            }
            _ => {}
        }
    }
}

impl CommandResolver for Se3Resolver {
    type Command = Se3Command;

    fn handle_event(&mut self, event: &GamepadEvent) {
        self.apply(event);
        self.command = self.raw.resolve();
        debug!(
            "SE(3) {} = {:.3}: command {:?}, gripper closed {}",
            event.input,
            event.value,
            self.command,
            self.gripper.is_closed()
        );

        self.callbacks.fire(event.input);
    }

    fn advance(&self) -> (Se3Command, bool) {
        (self.command, self.gripper.is_closed())
    }

    fn reset(&mut self) {
        self.raw.clear();
        self.gripper.open();
        self.command = [0.0; 6];
        debug!("SE(3) resolver reset");
    }

    fn add_callback(&mut self, input: GamepadInput, callback: InputCallback) {
        self.callbacks.register(input, callback);
    }
}

impl fmt::Display for Se3Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gamepad controller for SE(3)")?;
        writeln!(f, "\t----------------------------------------------")?;
        writeln!(f, "\tToggle gripper (open/close): A")?;
        writeln!(f, "\tMove arm along x-axis: Left Stick Right/Left")?;
        writeln!(f, "\tMove arm along y-axis: Left Stick Up/Down")?;
        writeln!(f, "\tMove arm along z-axis: Right Stick Up/Down, B (up) / X (down)")?;
        writeln!(f, "\tRotate arm about x-axis: D-Pad Left/Right")?;
        writeln!(f, "\tRotate arm about y-axis: D-Pad Up/Down")?;
        writeln!(f, "\tRotate arm about z-axis: Right Stick Right/Left")?;
        write!(
            f,
            "\tSensitivity - Position: {:.3}, Rotation: {:.3}",
            self.pos_sensitivity, self.rot_sensitivity
        )
    }
}
