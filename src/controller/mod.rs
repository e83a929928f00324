//! # Controller Module
//!
//! Gamepad event to robot command resolution.
//!
//! This module handles:
//! - Dead-zone filtering of raw input values
//! - SE(2) planar commands with handedness remap and boost
//! - SE(3) 6-DOF commands with max-pair resolution and Euler to rotation vector
//! - Debounced gripper toggling
//! - Extra per-input callbacks for the embedding host

pub mod calibration;
pub mod gripper;
pub mod hooks;
pub mod rotation;
pub mod se2;
pub mod se3;

use std::fmt;

use crate::input::{GamepadEvent, GamepadInput};

pub use hooks::InputCallback;
pub use se2::{Handedness, Se2Command, Se2Resolver};
pub use se3::{Se3Command, Se3Resolver};

/// Turns a stream of gamepad events into a delta pose and gripper command.
///
/// Implementations resolve eagerly: all work happens in
/// [`handle_event`](Self::handle_event), so [`advance`](Self::advance) is a
/// plain read that can be called once per simulation tick.
pub trait CommandResolver: Send + fmt::Display + 'static {
    /// Resolved delta pose.
    type Command: Copy + fmt::Debug + PartialEq + Send;

    /// Updates internal state from one event, then fires any callback bound
    /// to the event's input.
    fn handle_event(&mut self, event: &GamepadEvent);

    /// Returns the latest delta pose and whether the gripper should be closed.
    fn advance(&self) -> (Self::Command, bool);

    /// Clears transient input state. Configuration is kept.
    fn reset(&mut self);

    /// Binds `callback` to `input`. It runs with no arguments every time an
    /// event for `input` arrives, after the state update.
    fn add_callback(&mut self, input: GamepadInput, callback: InputCallback);
}
