//! Mapping from raw device indices to semantic controller state
//!
//! A [`MappingProfile`] is produced once by calibration and loaded at startup.
//! The [`NormalizationPipeline`] applies it to every raw sample:
//!
//! ```text
//! RawSample ──► [profile lookup] ──► [baseline - clamp] ──► ControllerState
//! ```

pub mod error;
pub mod names;
pub mod normalize;
pub mod profile;
pub mod state;

pub use error::ProfileError;
pub use names::{AxisName, ButtonName, DPAD};
pub use normalize::{normalize, normalize_axis, NormalizationPipeline};
pub use profile::{MappingProfile, ProfileDocument};
pub use state::ControllerState;
