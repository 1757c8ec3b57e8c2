//! Controller subsystem for raw gamepad access
//!
//! 1. [`device`] - the polling capability every other module consumes
//! 2. [`gilrs_backend`] - real hardware through gilrs (feature `gilrs`)
//! 3. [`scripted`] - replayed samples for tests
//! 4. [`sniffer`] - raw diagnostics by index
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► DeviceSampler ──► RawSample ──► Calibration / Normalization
//!             (pump + reads)    (by index)
//! ```
//!
//! Only one owner polls a sampler at a time: the calibration wizard or the
//! broadcast loop, never both.

pub mod device;
#[cfg(feature = "gilrs")]
pub mod gilrs_backend;
pub mod scripted;
pub mod sniffer;

pub use device::{DeviceError, DeviceIdentity, DeviceInfo, DeviceSampler, HatState, RawSample};
#[cfg(feature = "gilrs")]
pub use gilrs_backend::GilrsSampler;
pub use scripted::ScriptedSampler;
