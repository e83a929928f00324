//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. Resolver sensitivities are accepted as written, while the
//! values that would break the control loop (tick rate, dead zones, handedness,
//! gripper wiring) are validated.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, TeleopError};
use crate::input::GamepadInput;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub se2: Se2Config,
    #[serde(default)]
    pub se3: Se3Config,
    #[serde(default)]
    pub gripper: GripperConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gamepad device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// evdev node such as `/dev/input/event5`. Empty means auto-detect.
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub index: usize,

    /// Take the pad exclusively so the desktop does not react to it.
    #[serde(default = "default_grab")]
    pub grab: bool,
}

/// SE(2) resolver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Se2Config {
    #[serde(default = "default_se2_pos_sensitivity")]
    pub pos_sensitivity: f64,

    #[serde(default = "default_se2_rot_sensitivity")]
    pub rot_sensitivity: f64,

    #[serde(default = "default_dead_zone")]
    pub dead_zone: f32,

    /// Number of 90° counterclockwise rotations of the pad (0-3).
    #[serde(default)]
    pub handedness: u8,

    #[serde(default = "default_boost_multiplier")]
    pub boost_multiplier: f64,

    /// Button wired to the gripper. Unset keeps the gripper open.
    #[serde(default)]
    pub gripper_button: Option<GamepadInput>,
}

/// SE(3) resolver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Se3Config {
    #[serde(default = "default_se3_pos_sensitivity")]
    pub pos_sensitivity: f64,

    #[serde(default = "default_se3_rot_sensitivity")]
    pub rot_sensitivity: f64,

    #[serde(default = "default_dead_zone")]
    pub dead_zone: f32,

    /// Raw value of a fully deflected stick. 1.0 for normalised hosts.
    #[serde(default = "default_axis_full_scale")]
    pub axis_full_scale: f32,
}

/// Gripper configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GripperConfig {
    #[serde(default = "default_gripper_debounce_ms")]
    pub debounce_ms: u64,
}

/// Control space driven by the pad
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Se2,
    #[default]
    Se3,
}

/// Control loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default)]
    pub mode: ControlMode,

    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Optional log file. Empty logs to stdout only.
    #[serde(default)]
    pub file: String,
}

// Default value functions
fn default_grab() -> bool { false }

fn default_se2_pos_sensitivity() -> f64 { 0.05 }
fn default_se2_rot_sensitivity() -> f64 { 3.0 }
fn default_boost_multiplier() -> f64 { 2.0 }

fn default_se3_pos_sensitivity() -> f64 { 0.05 }
fn default_se3_rot_sensitivity() -> f64 { 1.6 }
fn default_axis_full_scale() -> f32 { 1.0 }

fn default_dead_zone() -> f32 { 0.01 }
fn default_gripper_debounce_ms() -> u64 { 700 }

fn default_tick_rate_hz() -> u32 { 60 }
fn default_status_interval_ticks() -> u64 { 600 }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            index: 0,
            grab: default_grab(),
        }
    }
}

impl Default for Se2Config {
    fn default() -> Self {
        Self {
            pos_sensitivity: default_se2_pos_sensitivity(),
            rot_sensitivity: default_se2_rot_sensitivity(),
            dead_zone: default_dead_zone(),
            handedness: 0,
            boost_multiplier: default_boost_multiplier(),
            gripper_button: None,
        }
    }
}

impl Default for Se3Config {
    fn default() -> Self {
        Self {
            pos_sensitivity: default_se3_pos_sensitivity(),
            rot_sensitivity: default_se3_rot_sensitivity(),
            dead_zone: default_dead_zone(),
            axis_full_scale: default_axis_full_scale(),
        }
    }
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_gripper_debounce_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::default(),
            tick_rate_hz: default_tick_rate_hz(),
            status_interval_ticks: default_status_interval_ticks(),
        }
    }
}

/// Input that resets the resolver from the control loop (Start).
pub const RESET_INPUT: GamepadInput = GamepadInput::Menu2;

/// Inputs already bound in SE(2) mode that cannot be shared with the gripper.
const SE2_RESERVED_INPUTS: [GamepadInput; 8] = [
    GamepadInput::LeftStickUp,
    GamepadInput::LeftStickDown,
    GamepadInput::LeftStickLeft,
    GamepadInput::LeftStickRight,
    GamepadInput::LeftShoulder,
    GamepadInput::RightShoulder,
    GamepadInput::A,
    RESET_INPUT,
];

fn invalid(message: impl std::fmt::Display) -> TeleopError {
    TeleopError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pad_teleop::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate dead zones
        for (name, value) in [
            ("se2.dead_zone", self.se2.dead_zone),
            ("se3.dead_zone", self.se3.dead_zone),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(invalid(format!("{} must be between 0.0 and 1.0", name)));
            }
        }

        if self.se2.handedness > 3 {
            return Err(invalid(format!(
                "se2.handedness {} is out of bounds (must be 0-3)",
                self.se2.handedness
            )));
        }

        if let Some(button) = self.se2.gripper_button {
            if SE2_RESERVED_INPUTS.contains(&button) {
                return Err(invalid(format!(
                    "se2.gripper_button {:?} is already bound to another action",
                    button
                )));
            }
        }

        if !(self.se3.axis_full_scale > 0.0) {
            return Err(invalid("se3.axis_full_scale must be greater than 0"));
        }

        if self.gripper.debounce_ms > 10000 {
            return Err(invalid("gripper.debounce_ms must be between 0 and 10000"));
        }

        // Validate control loop timing
        if self.control.tick_rate_hz == 0 || self.control.tick_rate_hz > 1000 {
            return Err(invalid("tick_rate_hz must be between 1 and 1000"));
        }

        if self.control.status_interval_ticks == 0 {
            return Err(invalid("status_interval_ticks must be greater than 0"));
        }

        Ok(())
    }

    /// Device path override, if one is configured
    #[must_use]
    pub fn device_path(&self) -> Option<&str> {
        if self.device.path.is_empty() {
            None
        } else {
            Some(&self.device.path)
        }
    }
}
