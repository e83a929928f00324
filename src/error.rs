//! # Error Types
//!
//! Custom error types for Pad Teleop using `thiserror`.

use thiserror::Error;

/// Main error type for Pad Teleop
#[derive(Debug, Error)]
pub enum TeleopError {
    /// No gamepad available at the requested index
    #[error("no gamepad found at index {0}")]
    DeviceNotFound(usize),

    /// Handedness index outside the four defined rotations
    #[error("invalid handedness index {0} (must be 0-3)")]
    InvalidHandedness(u8),

    /// Gamepad backend errors
    #[error("gamepad device error: {0}")]
    Device(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Pad Teleop
pub type Result<T> = std::result::Result<T, TeleopError>;
