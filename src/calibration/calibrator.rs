//! Device-facing driver of a [`CalibrationSession`]
//!
//! The calibrator owns the sampler exclusively for the whole run and walks a
//! typestate lifecycle:
//!
//! ```text
//! Calibrator<Idle> ──attach()──► Calibrator<Attached> ──run()──► Calibrator<Finished>
//!        │                               │
//!        └── NoDevice                    └── Aborted | Disconnected
//! ```
//!
//! `run` blocks the calling thread; async callers should wrap it in
//! `spawn_blocking`.

use std::time::Instant;

use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::CalibrationError;
use super::session::{CalibrationSession, Feedback};
use super::settings::CalibrationSettings;
use crate::controller::device::{DeviceError, DeviceIdentity, DeviceSampler};
use crate::mapping::MappingProfile;

#[state]
#[derive(Debug, Clone)]
pub enum CalibrationPhase {
    Idle,
    Attached,
    Finished(MappingProfile),
}

#[machine]
pub struct Calibrator<S: CalibrationPhase> {
    sampler: Box<dyn DeviceSampler>,
    settings: CalibrationSettings,
    device_index: usize,
    identity: Option<DeviceIdentity>,
}

impl<S: CalibrationPhase> Calibrator<S> {
    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }
}

impl Calibrator<Idle> {
    pub fn create(
        sampler: Box<dyn DeviceSampler>,
        settings: Option<CalibrationSettings>,
        device_index: usize,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        debug!("Creating calibrator with settings: {:?}", settings);

        Self::new(sampler, settings, device_index, None)
    }

    /// Opens the device; fails fast when nothing is connected
    pub fn attach(mut self) -> Result<Calibrator<Attached>, CalibrationError> {
        self.sampler.pump();

        let available = self.sampler.device_count();
        if available == 0 {
            error!("No joystick found, nothing to calibrate");
            return Err(CalibrationError::NoDevice);
        }

        let identity = match self.sampler.open(self.device_index) {
            Ok(identity) => identity,
            Err(DeviceError::NoDevice(index)) => {
                error!("No joystick at index {} ({} available)", index, available);
                return Err(CalibrationError::NoDevice);
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Calibrating '{}' (guid: {})",
            identity.name,
            identity.guid.as_deref().unwrap_or("unknown")
        );
        info!(
            "{} axes, {} buttons, {} hats",
            self.sampler.axis_count(),
            self.sampler.button_count(),
            self.sampler.hat_count()
        );

        self.identity = Some(identity);
        Ok(self.transition())
    }
}

impl Calibrator<Attached> {
    /// Runs the wizard until every target is mapped
    ///
    /// Every feedback is handed to `observer` for operator display. The device
    /// is released whether the run completes or not.
    pub fn run(
        mut self,
        cancel: &CancellationToken,
        observer: &mut dyn FnMut(&Feedback),
    ) -> Result<Calibrator<Finished>, CalibrationError> {
        let identity = self.identity.clone().unwrap_or_default();
        let mut session = CalibrationSession::new(&identity, self.settings.clone());
        let started = Instant::now();

        let outcome = loop {
            if cancel.is_cancelled() {
                warn!("Calibration aborted, discarding partial mapping");
                break Err(CalibrationError::Aborted);
            }

            self.sampler.pump();
            if self.sampler.device_count() == 0 {
                error!("Device lost during calibration");
                break Err(CalibrationError::Disconnected);
            }

            let feedback = session.feed(&self.sampler.snapshot(), started.elapsed());
            observer(&feedback);

            if session.is_complete() {
                break Ok(());
            }
            std::thread::sleep(self.settings.poll_interval);
        };

        self.sampler.release();
        outcome?;

        match session.finish() {
            Some(profile) => {
                info!(
                    "Calibration finished in {:.1}s",
                    started.elapsed().as_secs_f32()
                );
                Ok(self.transition_with(profile))
            }
            None => Err(CalibrationError::Aborted),
        }
    }
}

impl Calibrator<Finished> {
    pub fn profile(&self) -> Option<&MappingProfile> {
        self.get_state_data()
    }

    pub fn into_profile(self) -> Option<MappingProfile> {
        self.get_state_data().cloned()
    }
}
