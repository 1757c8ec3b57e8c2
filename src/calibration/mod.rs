//! Interactive calibration wizard
//!
//! Discovers which raw index drives each semantic control, with no prior
//! knowledge of the device, and measures the rest value of every axis.
//!
//! - [`session`]: the wizard as a pure state machine over (sample, time)
//! - [`tracker`]: winner detection and hold confirmation
//! - [`calibrator`]: typestate driver that owns the device during a run
//! - [`settings`]: tuning parameters and the named presets

pub mod calibrator;
pub mod error;
pub mod session;
pub mod settings;
pub mod tracker;

pub use calibrator::{Attached, CalibrationPhase, Calibrator, Finished, Idle};
pub use error::CalibrationError;
pub use session::{CalibrationSession, Feedback, Target};
pub use settings::{CalibrationPreset, CalibrationSettings};
pub use tracker::{HoldStatus, HoldTracker, RawInput, ResetReason, Winner};
