use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named robustness levels for the calibration wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationPreset {
    /// Short holds, for a pad known to be clean
    Quick,
    #[default]
    Standard,
    /// Long holds and a lower threshold, for worn or noisy hardware
    Paranoid,
}

/// Tuning for the calibration state machine
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    /// Max distance from baseline an axis may rest at while awaiting neutral
    pub neutral_band: f32,
    /// Min deviation from baseline for an axis to count as deflected
    pub trigger_threshold: f32,
    /// How long a candidate must stay the unique winner
    pub hold_duration: Duration,
    /// How long the device must sit still before the next prompt
    pub stability_window: Duration,
    /// Max change between consecutive samples that still counts as still
    pub stability_tolerance: f32,
    pub poll_interval: Duration,
    pub baseline_samples: usize,
    pub baseline_spacing: Duration,
}

impl CalibrationSettings {
    pub fn preset(preset: CalibrationPreset) -> Self {
        let (neutral_band, trigger_threshold, hold_ms, stability_ms) = match preset {
            CalibrationPreset::Quick => (0.3, 0.6, 400, 100),
            CalibrationPreset::Standard => (0.2, 0.6, 800, 100),
            CalibrationPreset::Paranoid => (0.3, 0.5, 1000, 200),
        };

        Self {
            neutral_band,
            trigger_threshold,
            hold_duration: Duration::from_millis(hold_ms),
            stability_window: Duration::from_millis(stability_ms),
            stability_tolerance: 0.01,
            poll_interval: Duration::from_millis(10),
            baseline_samples: 20,
            baseline_spacing: Duration::from_millis(50),
        }
    }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self::preset(CalibrationPreset::Standard)
    }
}

impl From<CalibrationPreset> for CalibrationSettings {
    fn from(preset: CalibrationPreset) -> Self {
        Self::preset(preset)
    }
}
