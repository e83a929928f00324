//! # Host Module
//!
//! Interfaces to the environment that owns the gamepad.
//!
//! This module handles:
//! - Looking up a gamepad by index and subscribing to its events
//! - Releasing subscriptions exactly once through an RAII guard
//! - Writing host-wide settings such as the gamepad camera-control flag
//! - A Linux evdev host for running outside a simulator

pub mod evdev;
pub mod mapper;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::input::GamepadEvent;

/// Host setting that lets the simulator viewport camera follow the gamepad.
pub const GAMEPAD_CAMERA_CONTROL_SETTING: &str = "/persistent/app/omniverse/gamepadCameraControl";

/// Opaque handle of one gamepad known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GamepadHandle(pub usize);

/// Identifier returned by [`InputHost::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Event sink registered with a host.
pub type EventCallback = Box<dyn FnMut(&GamepadEvent) + Send>;

/// Input subsystem of the host.
///
/// Implementations deliver events for one gamepad on one thread at a time.
/// Callbacks must not subscribe or unsubscribe from inside the callback.
pub trait InputHost: Send + Sync + 'static {
    /// Returns the gamepad at `index`, if connected.
    fn gamepad(&self, index: usize) -> Option<GamepadHandle>;

    /// Human-readable device name.
    fn gamepad_name(&self, pad: GamepadHandle) -> Option<String>;

    /// Starts delivering events of `pad` to `callback`.
    fn subscribe(&self, pad: GamepadHandle, callback: EventCallback) -> SubscriptionId;

    /// Stops a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, pad: GamepadHandle, id: SubscriptionId);
}

/// Host-wide settings store.
#[cfg_attr(test, mockall::automock)]
pub trait HostSettings {
    fn set_bool(&mut self, key: &str, value: bool);
}

/// Stops the host from steering its viewport camera with the gamepad.
///
/// Call this once before attaching a teleop device when running inside a
/// simulator that binds the gamepad to its camera by default.
pub fn disable_gamepad_camera_control<S: HostSettings + ?Sized>(settings: &mut S) {
    settings.set_bool(GAMEPAD_CAMERA_CONTROL_SETTING, false);
    debug!("Disabled host gamepad camera control");
}

/// Live subscription on an [`InputHost`]. Dropping it unsubscribes.
#[must_use = "dropping the subscription stops event delivery"]
pub struct Subscription<H: InputHost> {
    host: Arc<H>,
    pad: GamepadHandle,
    id: Option<SubscriptionId>,
}

impl<H: InputHost> fmt::Debug for Subscription<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pad", &self.pad)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<H: InputHost> Subscription<H> {
    /// Subscribes `callback` to `pad` on `host`.
    pub fn new(host: Arc<H>, pad: GamepadHandle, callback: EventCallback) -> Self {
        let id = host.subscribe(pad, callback);
        debug!("Subscribed to gamepad {:?} as {:?}", pad, id);
        Self {
            host,
            pad,
            id: Some(id),
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Unsubscribes now instead of at drop.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.host.unsubscribe(self.pad, id);
            debug!("Unsubscribed {:?} from gamepad {:?}", id, self.pad);
        }
    }
}

impl<H: InputHost> Drop for Subscription<H> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Callback table for host implementations.
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    callbacks: BTreeMap<SubscriptionId, EventCallback>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("ids", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Subscribers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.insert(id, callback);
        id
    }

    /// Returns true if `id` was registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    /// Delivers `event` to every subscriber in subscription order.
    pub fn dispatch(&mut self, event: &GamepadEvent) {
        for callback in self.callbacks.values_mut() {
            callback(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory host with a single gamepad at index 0.
    pub struct MockInputHost {
        pub name: String,
        pub connected: bool,
        /// Keeps callbacks registered after `unsubscribe`, like a host that
        /// delivers one last in-flight event.
        pub leaky: bool,
        pub subscribers: Mutex<Subscribers>,
        pub unsubscribe_calls: Mutex<Vec<SubscriptionId>>,
    }

    impl MockInputHost {
        pub fn new() -> Self {
            Self {
                name: "8BitDo Micro gamepad".to_string(),
                connected: true,
                leaky: false,
                subscribers: Mutex::new(Subscribers::new()),
                unsubscribe_calls: Mutex::new(Vec::new()),
            }
        }

        pub fn disconnected() -> Self {
            Self {
                connected: false,
                ..Self::new()
            }
        }

        pub fn leaky() -> Self {
            Self {
                leaky: true,
                ..Self::new()
            }
        }

        pub fn emit(&self, event: GamepadEvent) {
            self.subscribers.lock().unwrap().dispatch(&event);
        }

        pub fn subscriber_count(&self) -> usize {
            self.subscribers.lock().unwrap().len()
        }

        pub fn unsubscribe_count(&self) -> usize {
            self.unsubscribe_calls.lock().unwrap().len()
        }
    }

    impl InputHost for MockInputHost {
        fn gamepad(&self, index: usize) -> Option<GamepadHandle> {
            (self.connected && index == 0).then_some(GamepadHandle(0))
        }

        fn gamepad_name(&self, _pad: GamepadHandle) -> Option<String> {
            Some(self.name.clone())
        }

        fn subscribe(&self, _pad: GamepadHandle, callback: EventCallback) -> SubscriptionId {
            self.subscribers.lock().unwrap().insert(callback)
        }

        fn unsubscribe(&self, _pad: GamepadHandle, id: SubscriptionId) {
            self.unsubscribe_calls.lock().unwrap().push(id);
            if !self.leaky {
                self.subscribers.lock().unwrap().remove(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockInputHost;
    use super::*;
    use crate::input::GamepadInput;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (Arc<AtomicUsize>, EventCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, Box::new(move |_event: &GamepadEvent| {
            handle.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_disable_camera_control_writes_flag() {
        let mut settings = MockHostSettings::new();
        settings
            .expect_set_bool()
            .withf(|key, value| key == GAMEPAD_CAMERA_CONTROL_SETTING && !*value)
            .times(1)
            .return_const(());

        disable_gamepad_camera_control(&mut settings);
    }

    #[test]
    fn test_subscribers_dispatch_in_order() {
        let mut subscribers = Subscribers::new();
        let (first, cb1) = counting_callback();
        let (second, cb2) = counting_callback();
        let id1 = subscribers.insert(cb1);
        let id2 = subscribers.insert(cb2);
        assert!(id1 < id2);

        subscribers.dispatch(&GamepadEvent::new(GamepadInput::A, 1.0));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        assert!(subscribers.remove(id1));
        assert!(!subscribers.remove(id1));
        subscribers.dispatch(&GamepadEvent::new(GamepadInput::A, 0.0));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscription_drop_unsubscribes_once() {
        let host = Arc::new(MockInputHost::new());
        let (count, callback) = counting_callback();

        let subscription = Subscription::new(Arc::clone(&host), GamepadHandle(0), callback);
        host.emit(GamepadEvent::new(GamepadInput::B, 1.0));
        assert_eq!(host.subscriber_count(), 1);

        drop(subscription);
        host.emit(GamepadEvent::new(GamepadInput::B, 1.0));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(host.subscriber_count(), 0);
        assert_eq!(host.unsubscribe_count(), 1);
    }

    #[test]
    fn test_subscription_cancel_unsubscribes_once() {
        let host = Arc::new(MockInputHost::new());
        let (_count, callback) = counting_callback();

        let subscription = Subscription::new(Arc::clone(&host), GamepadHandle(0), callback);
        assert!(subscription.id().is_some());
        subscription.cancel();

        assert_eq!(host.unsubscribe_count(), 1);
    }
}
