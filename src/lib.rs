//! # Pad Teleop Library
//!
//! Teleoperate a robot with an 8BitDo gamepad.
//!
//! This library turns gamepad events into delta-pose commands for either a
//! planar mobile base (SE(2): x, y, yaw) or an end effector (SE(3): position
//! and rotation vector), plus a debounced gripper toggle.

pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod input;
pub mod teleop;
