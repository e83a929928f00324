//! # Calibration Module
//!
//! Dead-zone filtering for raw gamepad values.
//!
//! Unlike a rescaling deadzone, values inside the zone snap to exactly `0.0`
//! and values outside pass through untouched. Downstream sensitivity scaling
//! therefore sees the raw magnitude the host reported.
//!
//! ## Usage
//!
//! ```
//! use pad_teleop::controller::calibration::DeadZone;
//!
//! let dz = DeadZone::new(0.01);
//!
//! assert_eq!(dz.apply(0.005), 0.0);
//! assert_eq!(dz.apply(-0.005), 0.0);
//! assert_eq!(dz.apply(0.5), 0.5);
//! ```

/// Snaps small input values to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadZone {
    threshold: f32,
}

impl Default for DeadZone {
    fn default() -> Self {
        Self { threshold: 0.01 }
    }
}

impl DeadZone {
    /// Creates a dead zone with the given threshold.
    ///
    /// The threshold is taken as-is; a negative threshold disables filtering.
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Returns the configured threshold.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Returns `0.0` when `|value| < threshold`, otherwise `value` unchanged.
    #[inline]
    #[must_use]
    pub fn apply(&self, value: f32) -> f32 {
        if value.abs() < self.threshold {
            0.0
        } else {
            value
        }
    }

    /// Returns true if `magnitude` is strictly above the threshold.
    #[inline]
    #[must_use]
    pub fn exceeds(&self, magnitude: f32) -> bool {
        magnitude > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        assert_eq!(DeadZone::default().threshold(), 0.01);
    }

    #[test]
    fn test_inside_zone_snaps_to_zero() {
        let dz = DeadZone::new(0.1);
        assert_eq!(dz.apply(0.09), 0.0);
        assert_eq!(dz.apply(-0.09), 0.0);
        assert_eq!(dz.apply(0.0), 0.0);
    }

    #[test]
    fn test_outside_zone_passes_through() {
        let dz = DeadZone::new(0.1);
        assert_eq!(dz.apply(0.25), 0.25);
        assert_eq!(dz.apply(-0.75), -0.75);
    }

    #[test]
    fn test_boundary_value_is_kept() {
        // Strict less-than: a value equal to the threshold survives
        let dz = DeadZone::new(0.1);
        assert_eq!(dz.apply(0.1), 0.1);
        assert!(!dz.exceeds(0.1));
        assert!(dz.exceeds(0.11));
    }

    #[test]
    fn test_no_rescaling() {
        let dz = DeadZone::new(0.2);
        assert_eq!(dz.apply(0.3), 0.3);
    }

    #[test]
    fn test_negative_threshold_disables_filter() {
        let dz = DeadZone::new(-1.0);
        assert_eq!(dz.apply(0.0001), 0.0001);
    }
}
