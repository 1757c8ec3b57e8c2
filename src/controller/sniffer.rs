//! Raw input sniffer
//!
//! Prints whatever the device reports by index, without any mapping. Useful to
//! check that a pad is seen at all and to spot noisy axes before calibrating.

use std::time::Duration;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::device::{DeviceSampler, RawSample};

pub const SNIFF_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_NOISE_FLOOR: f32 = 0.03;

/// One line describing every active input, `None` when the device is idle
pub fn describe_activity(sample: &RawSample, noise_floor: f32) -> Option<String> {
    let mut parts = Vec::new();

    for (index, value) in sample.axes.iter().enumerate() {
        if value.abs() > noise_floor {
            parts.push(format!("AXIS_{}: {:+.3}", index, value));
        }
    }
    for index in sample.pressed_buttons() {
        parts.push(format!("BTN_{}", index));
    }
    for (index, hat) in sample.hats.iter().enumerate() {
        if !hat.is_centered() {
            parts.push(format!("HAT_{}: ({},{})", index, hat.x, hat.y));
        }
    }

    (!parts.is_empty()).then(|| parts.join(" | "))
}

/// Polls the first device and prints activity until cancelled
///
/// Blocking; run it on a dedicated thread.
pub fn run_sniffer<D: DeviceSampler>(
    sampler: &mut D,
    noise_floor: f32,
    cancel: &CancellationToken,
) {
    let mut attached = false;

    while !cancel.is_cancelled() {
        sampler.pump();

        if !attached {
            if sampler.device_count() > 0 {
                match sampler.open(0) {
                    Ok(identity) => {
                        info!(
                            "Sniffing {} ({} axes, {} buttons, {} hats)",
                            identity.name,
                            sampler.axis_count(),
                            sampler.button_count(),
                            sampler.hat_count()
                        );
                        attached = true;
                    }
                    Err(e) => warn!("Unable to open device: {}", e),
                }
            }
        } else if sampler.device_count() == 0 {
            warn!("Device lost, waiting for reconnect");
            sampler.release();
            attached = false;
        }

        if attached {
            if let Some(line) = describe_activity(&sampler.snapshot(), noise_floor) {
                println!("{} {}", Local::now().format("%H:%M:%S%.3f"), line);
            }
        }

        std::thread::sleep(SNIFF_INTERVAL);
    }

    sampler.release();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device::HatState;

    #[test]
    fn idle_device_prints_nothing() {
        let sample = RawSample {
            axes: vec![0.01, -0.02],
            buttons: vec![false, false],
            hats: vec![HatState::CENTERED],
        };
        assert_eq!(describe_activity(&sample, DEFAULT_NOISE_FLOOR), None);
    }

    #[test]
    fn lists_axes_buttons_and_hats() {
        let sample = RawSample {
            axes: vec![0.0, -0.5],
            buttons: vec![false, true, true],
            hats: vec![HatState::UP],
        };
        let line = describe_activity(&sample, DEFAULT_NOISE_FLOOR).unwrap();
        assert_eq!(line, "AXIS_1: -0.500 | BTN_1 | BTN_2 | HAT_0: (0,1)");
    }

    #[test]
    fn stops_and_releases_when_cancelled() {
        use crate::controller::scripted::ScriptedSampler;

        let mut sampler = ScriptedSampler::new("Pad", None);
        let handle = sampler.clone();
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_sniffer(&mut sampler, DEFAULT_NOISE_FLOOR, &cancel);
        assert_eq!(handle.pump_count(), 0);
        assert!(!handle.is_open());
    }
}
