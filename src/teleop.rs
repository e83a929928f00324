//! # Teleop Device
//!
//! Binds a [`CommandResolver`] to one gamepad of an [`InputHost`].
//!
//! The host delivers events on its own thread while the control loop polls
//! [`Teleop::advance`] from another, so the resolver lives behind a mutex.
//! The host callback only holds a weak reference: once the device is dropped
//! a late event is ignored instead of keeping the resolver alive.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info};

use crate::controller::{CommandResolver, InputCallback};
use crate::error::{Result, TeleopError};
use crate::host::{InputHost, Subscription};
use crate::input::{GamepadEvent, GamepadInput};

/// Gamepad teleoperation device.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use pad_teleop::controller::Se3Resolver;
/// use pad_teleop::host::evdev::EvdevInputHost;
/// use pad_teleop::teleop::Teleop;
///
/// let host = Arc::new(EvdevInputHost::open(None)?);
/// let teleop = Teleop::attach(host, 0, Se3Resolver::new())?;
/// let (delta_pose, gripper_closed) = teleop.advance();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Teleop<R: CommandResolver, H: InputHost> {
    resolver: Arc<Mutex<R>>,
    subscription: Subscription<H>,
    device_name: String,
}

impl<R: CommandResolver, H: InputHost> fmt::Debug for Teleop<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teleop")
            .field("device_name", &self.device_name)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl<R: CommandResolver, H: InputHost> Teleop<R, H> {
    /// Subscribes `resolver` to the gamepad at `pad_index` on `host`
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if the host has no gamepad at `pad_index`.
    pub fn attach(host: Arc<H>, pad_index: usize, resolver: R) -> Result<Self> {
        let pad = host
            .gamepad(pad_index)
            .ok_or(TeleopError::DeviceNotFound(pad_index))?;
        let device_name = host
            .gamepad_name(pad)
            .unwrap_or_else(|| format!("Gamepad {}", pad_index));

        let resolver = Arc::new(Mutex::new(resolver));
        let weak: Weak<Mutex<R>> = Arc::downgrade(&resolver);
        let callback = Box::new(move |event: &GamepadEvent| {
            if let Some(resolver) = weak.upgrade() {
                resolver
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .handle_event(event);
            }
        });

        let subscription = Subscription::new(host, pad, callback);
        info!("Attached teleop device to \"{}\"", device_name);

        Ok(Self {
            resolver,
            subscription,
            device_name,
        })
    }

    fn lock(&self) -> MutexGuard<'_, R> {
        self.resolver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest delta pose and gripper state.
    pub fn advance(&self) -> (R::Command, bool) {
        self.lock().advance()
    }

    /// Clears transient input state.
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Binds an extra callback to `input`.
    ///
    /// The callback runs on the host's event thread while the resolver is
    /// locked, so it must not call back into this device.
    pub fn add_callback(&self, input: GamepadInput, callback: InputCallback) {
        self.lock().add_callback(input, callback);
    }

    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Device name followed by the resolver's control mapping.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}\n{}", self.device_name, *self.lock())
    }

    /// Stops event delivery. Dropping the device has the same effect.
    pub fn detach(self) {
        debug!("Detaching teleop device from \"{}\"", self.device_name);
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Handedness, Se2Resolver, Se3Resolver};
    use crate::host::mocks::MockInputHost;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    const EPS: f64 = 1e-6;

    fn attach_se2(host: &Arc<MockInputHost>, resolver: Se2Resolver) -> Teleop<Se2Resolver, MockInputHost> {
        Teleop::attach(Arc::clone(host), 0, resolver).unwrap()
    }

    fn emit(host: &MockInputHost, input: GamepadInput, value: f32) {
        host.emit(GamepadEvent::new(input, value));
    }

    #[test]
    fn test_attach_missing_gamepad() {
        let host = Arc::new(MockInputHost::disconnected());
        let result = Teleop::attach(host, 0, Se2Resolver::new());
        assert!(matches!(result, Err(TeleopError::DeviceNotFound(0))));

        let host = Arc::new(MockInputHost::new());
        let result = Teleop::attach(host, 3, Se2Resolver::new());
        assert!(matches!(result, Err(TeleopError::DeviceNotFound(3))));
    }

    #[test]
    fn test_no_input_is_zero() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new());
        assert_eq!(teleop.advance(), ([0.0; 3], false));
    }

    #[test]
    fn test_se2_events_flow_through_host() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new());

        emit(&host, GamepadInput::LeftStickUp, 1.0);
        emit(&host, GamepadInput::A, 1.0);
        let ([x, y, yaw], gripper) = teleop.advance();
        assert!((x - 0.1).abs() < EPS);
        assert_eq!((y, yaw, gripper), (0.0, 0.0, false));

        // Advance does not consume the command
        assert_eq!(teleop.advance().0, [x, y, yaw]);

        emit(&host, GamepadInput::LeftShoulder, 1.0);
        let ([_, _, yaw], _) = teleop.advance();
        assert!((yaw - 6.0).abs() < EPS);
    }

    #[test]
    fn test_se2_handedness_through_host() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new().with_handedness(Handedness::Rotated180));

        emit(&host, GamepadInput::LeftStickDown, 1.0);
        let ([x, _, _], _) = teleop.advance();
        assert!((x - 0.05).abs() < EPS);
    }

    #[test]
    fn test_reset_clears_state() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new());

        emit(&host, GamepadInput::LeftStickUp, 0.8);
        emit(&host, GamepadInput::RightShoulder, 1.0);
        teleop.reset();
        assert_eq!(teleop.advance(), ([0.0; 3], false));
    }

    #[test]
    fn test_se3_gripper_debounce_through_host() {
        let host = Arc::new(MockInputHost::new());
        let start = Instant::now();
        let teleop = Teleop::attach(Arc::clone(&host), 0, Se3Resolver::new().starting_at(start)).unwrap();

        host.emit(GamepadEvent::at(GamepadInput::A, 1.0, start + Duration::from_millis(800)));
        assert!(teleop.advance().1);

        // Second press inside the debounce window is dropped
        host.emit(GamepadEvent::at(GamepadInput::A, 1.0, start + Duration::from_millis(900)));
        assert!(teleop.advance().1);

        host.emit(GamepadEvent::at(GamepadInput::A, 1.0, start + Duration::from_millis(1600)));
        assert!(!teleop.advance().1);
    }

    #[test]
    fn test_se3_stick_and_button_through_host() {
        let host = Arc::new(MockInputHost::new());
        let teleop = Teleop::attach(Arc::clone(&host), 0, Se3Resolver::new()).unwrap();

        emit(&host, GamepadInput::LeftStickRight, 1.0);
        emit(&host, GamepadInput::B, 1.0);
        let (command, _) = teleop.advance();
        assert!((command[0] - 0.05).abs() < EPS);
        assert!((command[2] - 0.05).abs() < EPS);
        assert_eq!(&command[3..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_callbacks_fire_per_event() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new());
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        teleop.add_callback(
            GamepadInput::Menu2,
            Box::new(move || {
                handle.fetch_add(1, Ordering::SeqCst);
            }),
        );

        emit(&host, GamepadInput::Menu2, 1.0);
        emit(&host, GamepadInput::Menu2, 0.0);
        emit(&host, GamepadInput::Y, 1.0);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_unsubscribes_once() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new());
        assert_eq!(host.subscriber_count(), 1);

        drop(teleop);
        assert_eq!(host.subscriber_count(), 0);
        assert_eq!(host.unsubscribe_count(), 1);

        // Late events after release are not delivered anywhere
        emit(&host, GamepadInput::LeftStickUp, 1.0);
    }

    #[test]
    fn test_late_event_after_drop_is_ignored() {
        let host = Arc::new(MockInputHost::leaky());
        let teleop = attach_se2(&host, Se2Resolver::new());
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        teleop.add_callback(
            GamepadInput::LeftStickUp,
            Box::new(move || {
                handle.fetch_add(1, Ordering::SeqCst);
            }),
        );

        emit(&host, GamepadInput::LeftStickUp, 1.0);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(teleop);
        assert_eq!(host.unsubscribe_count(), 1);
        assert_eq!(host.subscriber_count(), 1);

        // The resolver is gone, so the stale callback does nothing
        emit(&host, GamepadInput::LeftStickUp, 1.0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detach_unsubscribes_once() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new());
        teleop.detach();
        assert_eq!(host.subscriber_count(), 0);
        assert_eq!(host.unsubscribe_count(), 1);
    }

    #[test]
    fn test_describe_lists_device_and_mapping() {
        let host = Arc::new(MockInputHost::new());
        let teleop = attach_se2(&host, Se2Resolver::new());
        let text = teleop.describe();
        assert_eq!(teleop.device_name(), "8BitDo Micro gamepad");
        assert!(text.starts_with("8BitDo Micro gamepad\n"));
        assert!(text.contains("Gamepad controller for SE(2)"));
    }
}
