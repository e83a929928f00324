//! # evdev Gamepad Host
//!
//! Runs the teleop stack outside a simulator by reading a gamepad through the
//! Linux evdev interface and delivering its events to subscribers.
//!
//! ## Gamepad Detection
//!
//! Without an explicit path, the first `/dev/input/event*` device (in path
//! order) that reports both `BTN_SOUTH` and `ABS_X` is used. This matches
//! 8BitDo pads in X-input mode as well as Xbox and DualSense controllers.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Instant, SystemTime};
use tracing::{debug, info};

use super::mapper::{AxisRange, EventMapper};
use super::{EventCallback, GamepadHandle, InputHost, SubscriptionId, Subscribers};
use crate::error::{Result, TeleopError};

/// Directory scanned for event nodes when no path is configured
const INPUT_DIR: &str = "/dev/input";

/// Axes whose range is read from the device instead of the xpad defaults.
const CALIBRATED_AXES: [AbsoluteAxisType; 6] = [
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_RX,
    AbsoluteAxisType::ABS_RY,
    AbsoluteAxisType::ABS_Z,
    AbsoluteAxisType::ABS_RZ,
];

/// Gamepad host backed by one evdev device.
///
/// Exposes a single gamepad at index 0. [`pump`](Self::pump) blocks until the
/// device reports events, so run it on a dedicated thread.
pub struct EvdevInputHost {
    device: Mutex<Device>,
    device_path: String,
    name: String,
    mapper: EventMapper,
    subscribers: Mutex<Subscribers>,
}

impl std::fmt::Debug for EvdevInputHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevInputHost")
            .field("device_path", &self.device_path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EvdevInputHost {
    /// Open the gamepad at `path`, or detect the first one when `None`
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound`: No gamepad found on the system
    /// - `Device`: The given path cannot be opened or is not a gamepad
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pad_teleop::host::evdev::EvdevInputHost;
    ///
    /// let host = EvdevInputHost::open(None)?;
    /// println!("Connected to gamepad at: {}", host.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::open_path(Path::new(path)),
            None => Self::detect(),
        }
    }

    fn open_path(path: &Path) -> Result<Self> {
        let device = Device::open(path)
            .map_err(|e| TeleopError::Device(format!("Failed to open {}: {}", path.display(), e)))?;

        if !is_gamepad(&device) {
            return Err(TeleopError::Device(format!(
                "{} does not look like a gamepad",
                path.display()
            )));
        }

        Ok(Self::from_device(device, path.to_string_lossy().to_string()))
    }

    fn detect() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);

        if !input_dir.exists() {
            return Err(TeleopError::Device(format!("{} directory not found", INPUT_DIR)));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| TeleopError::Device(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TeleopError::Device(format!("Failed to read directory entry: {}", e)))?;

        // Sort for deterministic selection when several pads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();
            let is_event_node = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("event"));
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if is_gamepad(&device) {
                        return Ok(Self::from_device(device, path.to_string_lossy().to_string()));
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(TeleopError::DeviceNotFound(0))
    }

    fn from_device(device: Device, device_path: String) -> Self {
        let name = device.name().unwrap_or("Unknown gamepad").to_string();
        let mapper = calibrated_mapper(&device);
        info!("Found gamepad \"{}\" at: {}", name, device_path);

        Self {
            device: Mutex::new(device),
            device_path,
            name,
            mapper,
            subscribers: Mutex::new(Subscribers::new()),
        }
    }

    /// Get the device path of this gamepad
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Grab the device so no other reader (desktop, other apps) sees its events
    ///
    /// Call before starting the pump thread.
    pub fn grab(&self) -> Result<()> {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .grab()
            .map_err(|e| TeleopError::Device(format!("Failed to grab {}: {}", self.device_path, e)))?;
        info!("Grabbed {} for exclusive use", self.device_path);
        Ok(())
    }

    /// Fetch pending events and deliver them to every subscriber
    ///
    /// Blocks until the device reports at least one event. Returns the number
    /// of gamepad events dispatched.
    ///
    /// # Errors
    ///
    /// Returns `Device` error if fetching events fails (e.g., pad disconnected).
    pub fn pump(&self) -> Result<usize> {
        let events: Vec<_> = {
            let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
            let fetched = device
                .fetch_events()
                .map_err(|e| TeleopError::Device(format!("Failed to fetch events: {}", e)))?;
            let now = Instant::now();
            let wall_now = SystemTime::now();
            fetched
                .flat_map(|event| {
                    let at = event_instant(event.timestamp(), now, wall_now);
                    self.mapper.translate(&event, at)
                })
                .collect()
        };

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        for event in &events {
            subscribers.dispatch(event);
        }
        Ok(events.len())
    }
}

impl InputHost for EvdevInputHost {
    fn gamepad(&self, index: usize) -> Option<GamepadHandle> {
        (index == 0).then_some(GamepadHandle(0))
    }

    fn gamepad_name(&self, _pad: GamepadHandle) -> Option<String> {
        Some(self.name.clone())
    }

    fn subscribe(&self, _pad: GamepadHandle, callback: EventCallback) -> SubscriptionId {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(callback)
    }

    fn unsubscribe(&self, _pad: GamepadHandle, id: SubscriptionId) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

/// Converts a kernel event time to an `Instant` on the monotonic clock.
///
/// Falls back to `now` when the stamp lies in the future or cannot be
/// represented, so a clock step never reorders the debounce window.
fn event_instant(stamp: SystemTime, now: Instant, wall_now: SystemTime) -> Instant {
    wall_now
        .duration_since(stamp)
        .ok()
        .and_then(|age| now.checked_sub(age))
        .unwrap_or(now)
}

/// Returns true if the device exposes a face button and a stick.
fn is_gamepad(device: &Device) -> bool {
    let has_button = device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_SOUTH));
    let has_stick = device
        .supported_absolute_axes()
        .map_or(false, |axes| axes.contains(AbsoluteAxisType::ABS_X));
    has_button && has_stick
}

/// Builds a mapper from the device's reported axis ranges.
fn calibrated_mapper(device: &Device) -> EventMapper {
    let mut mapper = EventMapper::new();
    let Ok(abs_state) = device.get_abs_state() else {
        debug!("No abs info available, using default axis ranges");
        return mapper;
    };

    for axis in CALIBRATED_AXES {
        let supported = device
            .supported_absolute_axes()
            .map_or(false, |axes| axes.contains(axis));
        if !supported {
            continue;
        }
        let info = &abs_state[axis.0 as usize];
        let range = AxisRange {
            min: info.minimum,
            max: info.maximum,
        };
        debug!("Axis {:?} range {}..={}", axis, range.min, range.max);
        mapper = mapper.with_range(axis, range);
    }
    mapper
}
