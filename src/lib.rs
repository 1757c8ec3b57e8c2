//! nexuscontroller
//!
//! Calibrates an unknown gamepad into a semantic mapping profile, then streams
//! the normalized controller state to websocket subscribers at a fixed rate.
//!
//! ```text
//! DeviceSampler ──► NormalizationPipeline ──► codec ──► Streamer ──► subscribers
//!       │                    ▲
//!       └──► Calibrator ─────┘ (MappingProfile)
//! ```

pub mod broadcast;
pub mod calibration;
pub mod codec;
pub mod config;
pub mod controller;
pub mod mapping;
