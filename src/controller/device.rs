//! Device capability boundary
//!
//! Everything above this module talks to a gamepad through [`DeviceSampler`]:
//! one `pump` per tick, then indexed reads of raw axes, buttons and hats.
//! Indices are whatever the backend exposes; the calibration wizard discovers
//! which index means what.

use serde::Serialize;

/// Errors raised by a device backend
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// No device is available at the requested index
    #[error("No device available at index {0}")]
    NoDevice(usize),

    /// The underlying input library failed
    #[error("Device backend error: {0}")]
    Backend(String),
}

/// Discrete hat position, both components in {-1, 0, 1}
///
/// `y == 1` is up, `x == 1` is right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HatState {
    pub x: i8,
    pub y: i8,
}

impl HatState {
    pub const CENTERED: Self = Self { x: 0, y: 0 };
    pub const UP: Self = Self { x: 0, y: 1 };
    pub const DOWN: Self = Self { x: 0, y: -1 };
    pub const LEFT: Self = Self { x: -1, y: 0 };
    pub const RIGHT: Self = Self { x: 1, y: 0 };

    /// Builds a hat from arbitrary integers, collapsing each to its sign
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x: x.signum() as i8,
            y: y.signum() as i8,
        }
    }

    pub fn is_centered(&self) -> bool {
        *self == Self::CENTERED
    }
}

/// One instantaneous reading of every raw input of the open device
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSample {
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
    pub hats: Vec<HatState>,
}

impl RawSample {
    /// Raw axis value, `None` when the device has no such index
    pub fn axis(&self, index: usize) -> Option<f32> {
        self.axes.get(index).copied()
    }

    /// Raw button state; out-of-range indices read as released
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Raw hat state; out-of-range indices read as centered
    pub fn hat(&self, index: usize) -> HatState {
        self.hats.get(index).copied().unwrap_or_default()
    }

    pub fn pressed_buttons(&self) -> impl Iterator<Item = usize> + '_ {
        self.buttons
            .iter()
            .enumerate()
            .filter_map(|(index, pressed)| pressed.then_some(index))
    }
}

/// Name and GUID reported by a device when it is opened
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceIdentity {
    pub name: String,
    pub guid: Option<String>,
}

/// Connection metadata handed to every subscriber at handshake time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub connected: bool,
    pub name: String,
    pub guid: Option<String>,
    pub index: i64,
}

impl DeviceInfo {
    pub fn connected(identity: &DeviceIdentity, index: usize) -> Self {
        Self {
            connected: true,
            name: identity.name.clone(),
            guid: identity.guid.clone(),
            index: index as i64,
        }
    }

    /// Marks the session as disconnected, keeping the last known identity
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            connected: false,
            name: "No Device".to_string(),
            guid: None,
            index: -1,
        }
    }
}

/// Polling capability of a raw input device
///
/// A sampler holds at most one open device. Reads on a sampler without an open
/// device return neutral values (0.0, released, centered).
pub trait DeviceSampler {
    /// Processes pending backend events so that subsequent reads are current
    fn pump(&mut self);

    /// Number of devices currently attached to the system
    fn device_count(&self) -> usize;

    /// Opens the device at `index` and makes it the polled device
    fn open(&mut self, index: usize) -> Result<DeviceIdentity, DeviceError>;

    /// Releases the open device, if any
    fn release(&mut self);

    fn axis_count(&self) -> usize;
    fn button_count(&self) -> usize;
    fn hat_count(&self) -> usize;

    fn axis(&self, index: usize) -> f32;
    fn button(&self, index: usize) -> bool;
    fn hat(&self, index: usize) -> HatState;

    /// Reads every raw input of the open device at once
    fn snapshot(&self) -> RawSample {
        RawSample {
            axes: (0..self.axis_count()).map(|i| self.axis(i)).collect(),
            buttons: (0..self.button_count()).map(|i| self.button(i)).collect(),
            hats: (0..self.hat_count()).map(|i| self.hat(i)).collect(),
        }
    }
}

impl<T: DeviceSampler + ?Sized> DeviceSampler for Box<T> {
    fn pump(&mut self) {
        (**self).pump()
    }

    fn device_count(&self) -> usize {
        (**self).device_count()
    }

    fn open(&mut self, index: usize) -> Result<DeviceIdentity, DeviceError> {
        (**self).open(index)
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn axis_count(&self) -> usize {
        (**self).axis_count()
    }

    fn button_count(&self) -> usize {
        (**self).button_count()
    }

    fn hat_count(&self) -> usize {
        (**self).hat_count()
    }

    fn axis(&self, index: usize) -> f32 {
        (**self).axis(index)
    }

    fn button(&self, index: usize) -> bool {
        (**self).button(index)
    }

    fn hat(&self, index: usize) -> HatState {
        (**self).hat(index)
    }

    fn snapshot(&self) -> RawSample {
        (**self).snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hat_collapses_to_sign() {
        assert_eq!(HatState::new(5, -3), HatState { x: 1, y: -1 });
        assert!(HatState::new(0, 0).is_centered());
    }

    #[test]
    fn out_of_range_reads_are_neutral() {
        let sample = RawSample {
            axes: vec![0.5],
            buttons: vec![true],
            hats: vec![HatState::UP],
        };
        assert_eq!(sample.axis(3), None);
        assert!(!sample.button(7));
        assert_eq!(sample.hat(2), HatState::CENTERED);
    }

    #[test]
    fn disconnected_info_keeps_identity() {
        let identity = DeviceIdentity {
            name: "Pad".to_string(),
            guid: Some("abcd".to_string()),
        };
        let mut info = DeviceInfo::connected(&identity, 0);
        info.mark_disconnected();
        assert!(!info.connected);
        assert_eq!(info.name, "Pad");
        assert_eq!(info.index, 0);
    }

    #[test]
    fn default_info_serializes_to_handshake_shape() {
        let json = serde_json::to_value(DeviceInfo::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"connected": false, "name": "No Device", "guid": null, "index": -1})
        );
    }
}
