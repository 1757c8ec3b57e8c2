//! Fixed-rate broadcast loop
//!
//! ```text
//!            ┌──────────── every 1/frame_rate ─────────────┐
//!            ▼                                             │
//!  pump ──► acquire / detect loss ──► normalize ──► encode ──► fan-out
//! ```
//!
//! The streamer owns the sampler for its lifetime. Its only suspension point is
//! the interval tick, so cancellation is observed within one frame period.

use std::time::{Duration, Instant};

use chrono::Local;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::BroadcastError;
use super::subscribers::SubscriberSet;
use crate::codec::FrameFormat;
use crate::controller::device::{DeviceInfo, DeviceSampler};
use crate::mapping::NormalizationPipeline;

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    pub frame_rate: u32,
    pub frame_format: FrameFormat,
    pub device_index: usize,
    pub stats_interval: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            frame_format: FrameFormat::Text,
            device_index: 0,
            stats_interval: Duration::from_secs(10),
        }
    }
}

impl StreamSettings {
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No device held and none could be opened
    NoDevice,
    /// The held device went away; handle released
    DeviceLost,
    /// A state was produced but nobody is listening
    Idle,
    Delivered { recipients: usize, dropped: usize },
}

#[derive(Debug, Default)]
struct StreamStats {
    frames: u64,
    deliveries: u64,
    dropped: u64,
    idle_ticks: u64,
    missing_ticks: u64,
}

pub struct Streamer<D: DeviceSampler> {
    sampler: D,
    pipeline: NormalizationPipeline,
    subscribers: SubscriberSet,
    settings: StreamSettings,
    device_info: Option<DeviceInfo>,
    stats: StreamStats,
}

impl<D: DeviceSampler> Streamer<D> {
    pub fn new(
        sampler: D,
        pipeline: NormalizationPipeline,
        subscribers: SubscriberSet,
        settings: Option<StreamSettings>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        debug!("Creating streamer with settings: {:?}", settings);

        Self {
            sampler,
            pipeline,
            subscribers,
            settings,
            device_info: None,
            stats: StreamStats::default(),
        }
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// True while a device handle is held
    pub fn is_attached(&self) -> bool {
        self.device_info.is_some()
    }

    /// One frame: poll, maintain the device handle, normalize, encode, deliver
    pub fn tick(&mut self) -> Result<TickOutcome, BroadcastError> {
        self.sampler.pump();

        if self.device_info.is_some() {
            if self.sampler.device_count() == 0 {
                self.detach();
                return Ok(TickOutcome::DeviceLost);
            }
        } else if !self.try_attach() {
            self.stats.missing_ticks += 1;
            return Ok(TickOutcome::NoDevice);
        }

        if self.subscribers.is_empty() {
            self.stats.idle_ticks += 1;
            return Ok(TickOutcome::Idle);
        }

        let state = self.pipeline.apply(&self.sampler.snapshot());
        let Some(payload) = self.settings.frame_format.encode(Some(&state))? else {
            return Ok(TickOutcome::Idle);
        };

        let report = self.subscribers.broadcast(&payload);
        self.stats.frames += 1;
        self.stats.deliveries += report.delivered as u64;
        self.stats.dropped += report.dropped as u64;

        Ok(TickOutcome::Delivered {
            recipients: report.delivered,
            dropped: report.dropped,
        })
    }

    fn try_attach(&mut self) -> bool {
        if self.sampler.device_count() == 0 {
            return false;
        }

        let index = self.settings.device_index;
        let identity = match self.sampler.open(index) {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Device not available yet: {}", e);
                return false;
            }
        };

        let profile = self.pipeline.profile();
        if profile.guid_mismatch(identity.guid.as_deref()) {
            warn!(
                "Device GUID {} differs from profile GUID {}, applying the mapping anyway",
                identity.guid.as_deref().unwrap_or("unknown"),
                profile.device_guid().unwrap_or("unknown")
            );
        }

        let info = DeviceInfo::connected(&identity, index);
        info!("Joystick connected: {} (index {})", info.name, index);
        self.subscribers.publish_device_info(info.clone());
        self.device_info = Some(info);
        true
    }

    fn detach(&mut self) {
        self.sampler.release();
        if let Some(mut info) = self.device_info.take() {
            warn!("Joystick disconnected: {}", info.name);
            info.mark_disconnected();
            self.subscribers.publish_device_info(info);
        }
    }

    fn log_stats(&mut self) {
        let stats = std::mem::take(&mut self.stats);
        info!(
            "[{}] frames: {}, deliveries: {}, dropped subscribers: {}, idle ticks: {}, ticks without device: {}, live subscribers: {}",
            Local::now().format("%H:%M:%S"),
            stats.frames,
            stats.deliveries,
            stats.dropped,
            stats.idle_ticks,
            stats.missing_ticks,
            self.subscribers.len()
        );
    }

    /// Ticks at the configured rate until `cancel` fires, then releases the device
    pub async fn run(mut self, cancel: CancellationToken) -> D {
        let period = self.settings.frame_period();
        info!(
            "Broadcast loop running at {} Hz ({:?} frames)",
            self.settings.frame_rate, self.settings.frame_format
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_stats = Instant::now();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            if cancel.is_cancelled() {
                break;
            }

            if let Err(e) = self.tick() {
                error!("Frame skipped: {}", e);
            }

            if last_stats.elapsed() >= self.settings.stats_interval {
                self.log_stats();
                last_stats = Instant::now();
            }
        }

        self.shutdown()
    }

    /// Releases the device and hands the sampler back
    pub fn shutdown(mut self) -> D {
        if self.device_info.is_some() {
            self.detach();
        } else {
            self.sampler.release();
        }
        info!("Broadcast loop stopped");
        self.sampler
    }
}
