//! Error definitions for the calibration module

use thiserror::Error;

use crate::controller::device::DeviceError;

#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Nothing to calibrate against at start
    #[error("No device connected")]
    NoDevice,

    /// The operator cancelled; nothing was produced
    #[error("Calibration aborted")]
    Aborted,

    /// The device vanished mid-run
    #[error("Device disconnected during calibration")]
    Disconnected,

    #[error(transparent)]
    Device(#[from] DeviceError),
}
