//! # SE(2) Command Resolver
//!
//! Maps gamepad events to planar delta poses `(x, y, yaw)` for mobile bases.
//!
//! ## Default Mapping
//!
//! | Command | Input |
//! |---------|-------|
//! | Move along x | Left Stick Up (+) / Down (-) |
//! | Move along y | Left Stick Left (+) / Right (-) |
//! | Rotate about z | Left Shoulder (+) / Right Shoulder (-) |
//! | Boost | A (hold) |
//!
//! The left-stick table rotates with [`Handedness`] so the pad can be held
//! sideways or upside down. Shoulders and boost never move.
//!
//! ## Usage
//!
//! ```
//! use pad_teleop::controller::se2::Se2Resolver;
//! use pad_teleop::controller::CommandResolver;
//! use pad_teleop::input::{GamepadEvent, GamepadInput};
//!
//! let mut resolver = Se2Resolver::new();
//! resolver.handle_event(&GamepadEvent::new(GamepadInput::LeftStickUp, 1.0));
//!
//! let ([x, y, yaw], gripper) = resolver.advance();
//! assert!((x - 0.05).abs() < 1e-9);
//! assert_eq!((y, yaw, gripper), (0.0, 0.0, false));
//! ```

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::calibration::DeadZone;
use super::gripper::{GripperToggle, DEFAULT_GRIPPER_DEBOUNCE};
use super::hooks::{CallbackTable, InputCallback};
use super::CommandResolver;
use crate::config::{GripperConfig, Se2Config};
use crate::error::{Result, TeleopError};
use crate::input::{GamepadEvent, GamepadInput};

/// Planar delta pose `(x, y, yaw)` in meters and radians.
pub type Se2Command = [f64; 3];

/// Default position sensitivity (meters per unit input).
pub const DEFAULT_SE2_POS_SENSITIVITY: f64 = 0.05;
/// Default rotation sensitivity (radians per unit input).
pub const DEFAULT_SE2_ROT_SENSITIVITY: f64 = 3.0;
/// Default boost multiplier.
pub const DEFAULT_BOOST_MULTIPLIER: f64 = 2.0;

/// Semantic direction tracked by the SE(2) resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Se2Axis {
    Forward,
    Backward,
    Left,
    Right,
    YawLeft,
    YawRight,
    Boost,
}

/// Physical left-stick directions, in lookup table column order.
const STICK_DIRECTIONS: [GamepadInput; 4] = [
    GamepadInput::LeftStickUp,
    GamepadInput::LeftStickDown,
    GamepadInput::LeftStickRight,
    GamepadInput::LeftStickLeft,
];

/// Semantic axis for each stick direction, one row per 90° counterclockwise
/// rotation of the pad.
const STICK_TABLES: [[Se2Axis; 4]; 4] = [
    // Up, Down, Right, Left
    [Se2Axis::Forward, Se2Axis::Backward, Se2Axis::Right, Se2Axis::Left],
    [Se2Axis::Left, Se2Axis::Right, Se2Axis::Forward, Se2Axis::Backward],
    [Se2Axis::Backward, Se2Axis::Forward, Se2Axis::Left, Se2Axis::Right],
    [Se2Axis::Right, Se2Axis::Left, Se2Axis::Backward, Se2Axis::Forward],
];

/// How the pad is held, as a number of 90° counterclockwise rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handedness {
    #[default]
    Standard,
    Rotated90,
    Rotated180,
    Rotated270,
}

impl TryFrom<u8> for Handedness {
    type Error = TeleopError;

    fn try_from(index: u8) -> Result<Self> {
        match index {
            0 => Ok(Self::Standard),
            1 => Ok(Self::Rotated90),
            2 => Ok(Self::Rotated180),
            3 => Ok(Self::Rotated270),
            other => Err(TeleopError::InvalidHandedness(other)),
        }
    }
}

impl Handedness {
    /// Accepts any index and reduces it modulo 4, warning when it wraps.
    #[must_use]
    pub fn wrapping(index: u32) -> Self {
        let reduced = (index % 4) as u8;
        if u32::from(reduced) != index {
            warn!("Handedness index {} wrapped to {}", index, reduced);
        }
        match reduced {
            1 => Self::Rotated90,
            2 => Self::Rotated180,
            3 => Self::Rotated270,
            _ => Self::Standard,
        }
    }

    /// Index 0-3 of this rotation.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Semantic axis driven by a left-stick direction under this rotation.
    #[must_use]
    pub fn stick_axis(self, input: GamepadInput) -> Option<Se2Axis> {
        let column = STICK_DIRECTIONS.iter().position(|&d| d == input)?;
        Some(STICK_TABLES[self.index()][column])
    }

    /// Physical stick direction that drives `axis`, if any.
    #[must_use]
    pub fn stick_for(self, axis: Se2Axis) -> Option<GamepadInput> {
        let column = STICK_TABLES[self.index()].iter().position(|&a| a == axis)?;
        Some(STICK_DIRECTIONS[column])
    }
}

/// Latest value of every SE(2) direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisState {
    pub forward: f64,
    pub backward: f64,
    pub left: f64,
    pub right: f64,
    pub yaw_left: f64,
    pub yaw_right: f64,
    pub boost: f64,
}

impl AxisState {
    /// Returns the stored value for `axis`.
    #[must_use]
    pub fn get(&self, axis: Se2Axis) -> f64 {
        match axis {
            Se2Axis::Forward => self.forward,
            Se2Axis::Backward => self.backward,
            Se2Axis::Left => self.left,
            Se2Axis::Right => self.right,
            Se2Axis::YawLeft => self.yaw_left,
            Se2Axis::YawRight => self.yaw_right,
            Se2Axis::Boost => self.boost,
        }
    }

    pub fn set(&mut self, axis: Se2Axis, value: f64) {
        let slot = match axis {
            Se2Axis::Forward => &mut self.forward,
            Se2Axis::Backward => &mut self.backward,
            Se2Axis::Left => &mut self.left,
            Se2Axis::Right => &mut self.right,
            Se2Axis::YawLeft => &mut self.yaw_left,
            Se2Axis::YawRight => &mut self.yaw_right,
            Se2Axis::Boost => &mut self.boost,
        };
        *slot = value;
    }

    #[must_use]
    pub fn boost_active(&self) -> bool {
        self.boost > 0.0
    }
}

/// Resolves gamepad events into planar delta poses.
///
/// The command is recomputed on every event; [`advance`](CommandResolver::advance)
/// only reads it.
#[derive(Debug)]
pub struct Se2Resolver {
    pos_sensitivity: f64,
    rot_sensitivity: f64,
    dead_zone: DeadZone,
    handedness: Handedness,
    boost_multiplier: f64,
    /// Button wired to the gripper. `None` reports an open gripper forever.
    gripper_button: Option<GamepadInput>,
    gripper: GripperToggle,
    axes: AxisState,
    command: Se2Command,
    callbacks: CallbackTable,
}

impl Default for Se2Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Se2Resolver {
    /// Creates a resolver with default sensitivities, standard grip and no
    /// gripper wiring.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pos_sensitivity: DEFAULT_SE2_POS_SENSITIVITY,
            rot_sensitivity: DEFAULT_SE2_ROT_SENSITIVITY,
            dead_zone: DeadZone::default(),
            handedness: Handedness::Standard,
            boost_multiplier: DEFAULT_BOOST_MULTIPLIER,
            gripper_button: None,
            gripper: GripperToggle::new(DEFAULT_GRIPPER_DEBOUNCE, Instant::now()),
            axes: AxisState::default(),
            command: [0.0; 3],
            callbacks: CallbackTable::new(),
        }
    }

    /// Builds a resolver from the `[se2]` and `[gripper]` config sections.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::InvalidHandedness`] if `handedness` is above 3.
    pub fn from_config(se2: &Se2Config, gripper: &GripperConfig) -> Result<Self> {
        let mut resolver = Self::new()
            .with_sensitivity(se2.pos_sensitivity, se2.rot_sensitivity)
            .with_dead_zone(se2.dead_zone)
            .with_handedness(Handedness::try_from(se2.handedness)?)
            .with_boost_multiplier(se2.boost_multiplier)
            .with_gripper_debounce(Duration::from_millis(gripper.debounce_ms));
        resolver.gripper_button = se2.gripper_button;
        Ok(resolver)
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

    #[must_use]
    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    #[must_use]
    pub fn with_boost_multiplier(mut self, multiplier: f64) -> Self {
        self.boost_multiplier = multiplier;
        self
    }

    /// Wires `button` to the gripper toggle.
    #[must_use]
    pub fn with_gripper_button(mut self, button: GamepadInput) -> Self {
        self.gripper_button = Some(button);
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
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    #[must_use]
    pub fn axes(&self) -> &AxisState {
        &self.axes
    }

    fn recompute(&mut self) {
        let a = &self.axes;
        let boost = if a.boost_active() { self.boost_multiplier } else { 1.0 };
        let pos = self.pos_sensitivity * boost;
        let rot = self.rot_sensitivity * boost;

        self.command = [
            (a.forward - a.backward) * pos,
            (a.left - a.right) * pos,
            (a.yaw_right - a.yaw_left) * rot,
        ];
    }
}

impl CommandResolver for Se2Resolver {
    type Command = Se2Command;

    fn handle_event(&mut self, event: &GamepadEvent) {
        let value = f64::from(self.dead_zone.apply(event.value));

        if let Some(axis) = self.handedness.stick_axis(event.input) {
            self.axes.set(axis, value);
        }

        match event.input {
            // Shoulders act as fixed-rate yaw buttons
            GamepadInput::LeftShoulder => {
                self.axes.yaw_right = if value > 0.0 { 1.0 } else { 0.0 };
            }
            GamepadInput::RightShoulder => {
                self.axes.yaw_left = if value > 0.0 { 1.0 } else { 0.0 };
            }
            GamepadInput::A => self.axes.boost = value,
            _ => {}
        }

        if self.gripper_button == Some(event.input) {
            self.gripper.press(event.value, event.timestamp);
        }

        self.recompute();
        debug!(
            "SE(2) {} = {:.3}: axes {:?}, command {:?}, boost {}",
            event.input,
            value,
            self.axes,
            self.command,
            if self.axes.boost_active() { "ON" } else { "OFF" }
        );

        self.callbacks.fire(event.input);
    }

    fn advance(&self) -> (Se2Command, bool) {
        let gripper = self.gripper_button.is_some() && self.gripper.is_closed();
        (self.command, gripper)
    }

    fn reset(&mut self) {
        self.axes = AxisState::default();
        self.recompute();
        debug!("SE(2) resolver reset");
    }

    fn add_callback(&mut self, input: GamepadInput, callback: InputCallback) {
        self.callbacks.register(input, callback);
    }
}

impl fmt::Display for Se2Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gamepad controller for SE(2)")?;
        writeln!(f, "\tHandedness: {} (rotated {}°)", self.handedness.index(), self.handedness.index() * 90)?;
        writeln!(f, "\t----------------------------------------------")?;
        for (label, axis) in [
            ("Move forward", Se2Axis::Forward),
            ("Move backward", Se2Axis::Backward),
            ("Move left", Se2Axis::Left),
            ("Move right", Se2Axis::Right),
        ] {
            if let Some(input) = self.handedness.stick_for(axis) {
                writeln!(f, "\t{}: {}", label, input)?;
            }
        }
        writeln!(f, "\tRotate: Left/Right Shoulder")?;
        writeln!(f, "\tBoost: A ({}x multiplier)", self.boost_multiplier)?;
        if let Some(button) = self.gripper_button {
            writeln!(f, "\tToggle gripper (open/close): {}", button)?;
        }
        write!(
            f,
            "\tSensitivity - Position: {:.3}, Rotation: {:.3}",
            self.pos_sensitivity, self.rot_sensitivity
        )
    }
}
