//! Calibration session: the wizard as a pure state machine
//!
//! The session never touches a device or a clock. The caller pulls a sample,
//! hands it over together with the elapsed time and gets [`Feedback`] back:
//!
//! ```text
//!  Baseline ──► Settling(t0) ──► Resolving(t0) ──► Settling(t1) ──► ... ──► Done
//!  (touch nothing)  (await neutral)   (hold-confirm)
//! ```
//!
//! Targets run in a fixed order: the ten buttons, the six axes, then the dpad.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::settings::CalibrationSettings;
use super::tracker::{
    axis_winner, button_winner, hat_up, trigger_winner, HoldStatus, HoldTracker, RawInput,
    ResetReason, Winner,
};
use crate::controller::device::{DeviceIdentity, RawSample};
use crate::mapping::{AxisName, ButtonName, MappingProfile, DPAD};

/// One semantic control to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Button(ButtonName),
    Axis(AxisName),
    Dpad,
}

impl Target {
    /// All targets in resolution order
    pub fn sequence() -> Vec<Target> {
        ButtonName::ALL
            .into_iter()
            .map(Target::Button)
            .chain(AxisName::ALL.into_iter().map(Target::Axis))
            .chain(std::iter::once(Target::Dpad))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Target::Button(button) => button.as_str(),
            Target::Axis(axis) => axis.as_str(),
            Target::Dpad => DPAD,
        }
    }

    /// Operator instruction shown when the target becomes active
    pub fn instruction(&self) -> String {
        match self {
            Target::Button(button) => format!("Press and hold {}", button),
            Target::Axis(axis) if axis.is_trigger() => format!("Pull and hold {}", axis),
            Target::Axis(axis) => format!("Push {} to its limit and hold", axis),
            Target::Dpad => "Press the d-pad UP".to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the session made of the latest sample
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// A rest sample was recorded
    BaselineProgress { collected: usize, total: usize },
    /// The rest value of every axis is known
    BaselineRecorded { axes: usize },
    /// Waiting for the device to return to rest before `target`
    Settling { target: Target },
    /// The device is at rest; the operator should actuate `target`
    Prompt { target: Target },
    Holding {
        target: Target,
        input: RawInput,
        held: Duration,
    },
    Reset {
        target: Target,
        previous: RawInput,
        reason: ResetReason,
    },
    Committed { target: Target, input: RawInput },
    /// Every target has a mapping
    Complete,
    /// Nothing changed
    Waiting,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::BaselineProgress { collected, total } => {
                write!(f, "Recording rest values, touch nothing ({}/{})", collected, total)
            }
            Feedback::BaselineRecorded { axes } => {
                write!(f, "Rest values recorded for {} axes", axes)
            }
            Feedback::Settling { target } => write!(f, "Release everything before {}", target),
            Feedback::Prompt { target } => f.write_str(&target.instruction()),
            Feedback::Holding {
                target,
                input,
                held,
            } => write!(f, "{}: holding {} ({} ms)", target, input, held.as_millis()),
            Feedback::Reset {
                target,
                previous,
                reason,
            } => write!(f, "{}: dropped {}, {}", target, previous, reason),
            Feedback::Committed { target, input } => write!(f, "{} -> {}", target, input),
            Feedback::Complete => write!(f, "Calibration complete"),
            Feedback::Waiting => write!(f, "Waiting"),
        }
    }
}

#[derive(Debug, Clone)]
enum Stage {
    Baseline {
        sums: Vec<f64>,
        counts: Vec<usize>,
        collected: usize,
        next_at: Option<Duration>,
    },
    Settling {
        target: usize,
        previous: Option<(RawSample, Duration)>,
        still_since: Option<Duration>,
    },
    Resolving {
        target: usize,
        tracker: HoldTracker,
    },
    Done,
}

/// Drives one calibration run from raw samples to a [`MappingProfile`]
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    settings: CalibrationSettings,
    targets: Vec<Target>,
    stage: Stage,
    baseline: Vec<f32>,
    used: HashSet<RawInput>,
    profile: MappingProfile,
}

impl CalibrationSession {
    pub fn new(identity: &DeviceIdentity, settings: CalibrationSettings) -> Self {
        info!(
            "Starting calibration for '{}' ({} targets)",
            identity.name,
            Target::sequence().len()
        );
        Self {
            settings,
            targets: Target::sequence(),
            stage: Stage::Baseline {
                sums: Vec::new(),
                counts: Vec::new(),
                collected: 0,
                next_at: None,
            },
            baseline: Vec::new(),
            used: HashSet::new(),
            profile: MappingProfile::new(identity.name.clone(), identity.guid.clone()),
        }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Measured rest value per raw axis
    pub fn baseline(&self) -> &[f32] {
        &self.baseline
    }

    /// The target currently being settled or resolved
    pub fn current_target(&self) -> Option<Target> {
        match &self.stage {
            Stage::Settling { target, .. } | Stage::Resolving { target, .. } => {
                self.targets.get(*target).copied()
            }
            Stage::Baseline { .. } | Stage::Done => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.stage, Stage::Done)
    }

    /// The calibrated profile, or `None` while targets remain
    pub fn finish(self) -> Option<MappingProfile> {
        self.is_complete().then_some(self.profile)
    }

    /// Advances the session with one sample observed at `now`
    ///
    /// `now` is the time since the session started and must not go backwards.
    pub fn feed(&mut self, sample: &RawSample, now: Duration) -> Feedback {
        let stage = std::mem::replace(&mut self.stage, Stage::Done);
        let (next, feedback) = match stage {
            Stage::Baseline {
                sums,
                counts,
                collected,
                next_at,
            } => self.record_baseline(sample, now, sums, counts, collected, next_at),
            Stage::Settling {
                target,
                previous,
                still_since,
            } => self.settle(sample, now, target, previous, still_since),
            Stage::Resolving {
                target,
                mut tracker,
            } => self.resolve(sample, now, target, &mut tracker),
            Stage::Done => (Stage::Done, Feedback::Complete),
        };
        self.stage = next;
        feedback
    }

    fn record_baseline(
        &mut self,
        sample: &RawSample,
        now: Duration,
        mut sums: Vec<f64>,
        mut counts: Vec<usize>,
        collected: usize,
        next_at: Option<Duration>,
    ) -> (Stage, Feedback) {
        if next_at.is_some_and(|due| now < due) {
            let stage = Stage::Baseline {
                sums,
                counts,
                collected,
                next_at,
            };
            return (stage, Feedback::Waiting);
        }

        if sums.len() < sample.axes.len() {
            sums.resize(sample.axes.len(), 0.0);
            counts.resize(sample.axes.len(), 0);
        }
        for (index, raw) in sample.axes.iter().enumerate() {
            sums[index] += f64::from(*raw);
            counts[index] += 1;
        }
        let collected = collected + 1;
        debug!("Baseline sample {}/{}", collected, self.settings.baseline_samples);

        if collected < self.settings.baseline_samples {
            let stage = Stage::Baseline {
                sums,
                counts,
                collected,
                next_at: Some(now + self.settings.baseline_spacing),
            };
            let total = self.settings.baseline_samples;
            return (stage, Feedback::BaselineProgress { collected, total });
        }

        self.baseline = sums
            .iter()
            .zip(&counts)
            .map(|(sum, count)| if *count == 0 { 0.0 } else { (sum / *count as f64) as f32 })
            .collect();
        for (index, rest) in self.baseline.iter().enumerate() {
            self.profile.set_baseline(index, *rest);
        }
        info!("Baseline recorded: {:?}", self.baseline);

        let axes = self.baseline.len();
        (self.settling(0), Feedback::BaselineRecorded { axes })
    }

    fn settling(&self, target: usize) -> Stage {
        if target >= self.targets.len() {
            return Stage::Done;
        }
        Stage::Settling {
            target,
            previous: None,
            still_since: None,
        }
    }

    fn rest(&self, axis: usize) -> f32 {
        self.baseline.get(axis).copied().unwrap_or(0.0)
    }

    fn is_neutral(&self, sample: &RawSample) -> bool {
        let axes_at_rest = sample
            .axes
            .iter()
            .enumerate()
            .all(|(index, raw)| (raw - self.rest(index)).abs() <= self.settings.neutral_band);
        axes_at_rest
            && sample.pressed_buttons().next().is_none()
            && sample.hats.iter().all(|hat| hat.is_centered())
    }

    fn is_still(&self, previous: &RawSample, sample: &RawSample) -> bool {
        previous.axes.len() == sample.axes.len()
            && previous
                .axes
                .iter()
                .zip(&sample.axes)
                .all(|(before, after)| (after - before).abs() <= self.settings.stability_tolerance)
    }

    fn settle(
        &mut self,
        sample: &RawSample,
        now: Duration,
        target: usize,
        previous: Option<(RawSample, Duration)>,
        still_since: Option<Duration>,
    ) -> (Stage, Feedback) {
        let Some(current) = self.targets.get(target).copied() else {
            return (Stage::Done, Feedback::Complete);
        };

        let still_since = match previous {
            Some((before, at)) if self.is_neutral(sample) && self.is_still(&before, sample) => {
                let start = if self.is_neutral(&before) { at } else { now };
                Some(still_since.unwrap_or(start))
            }
            _ => None,
        };

        if still_since.is_some_and(|since| now.saturating_sub(since) >= self.settings.stability_window)
        {
            info!("Device at rest, prompting for {}", current);
            let stage = Stage::Resolving {
                target,
                tracker: HoldTracker::new(self.settings.hold_duration),
            };
            return (stage, Feedback::Prompt { target: current });
        }

        let stage = Stage::Settling {
            target,
            previous: Some((sample.clone(), now)),
            still_since,
        };
        (stage, Feedback::Settling { target: current })
    }

    fn winner(&self, target: Target, sample: &RawSample) -> Winner {
        let threshold = self.settings.trigger_threshold;
        match target {
            Target::Button(_) => button_winner(sample),
            Target::Axis(axis) if axis.is_trigger() => {
                trigger_winner(sample, &self.baseline, threshold)
            }
            Target::Axis(_) => axis_winner(sample, &self.baseline, threshold),
            Target::Dpad => hat_up(sample).map_or(Winner::None, Winner::Unique),
        }
    }

    fn resolve(
        &mut self,
        sample: &RawSample,
        now: Duration,
        target: usize,
        tracker: &mut HoldTracker,
    ) -> (Stage, Feedback) {
        let Some(current) = self.targets.get(target).copied() else {
            return (Stage::Done, Feedback::Complete);
        };

        let winner = self.winner(current, sample);
        let status = match (current, winner) {
            (Target::Dpad, Winner::Unique(input)) => HoldStatus::Confirmed(input),
            _ => tracker.observe(winner, now),
        };

        let feedback = match status {
            HoldStatus::Idle => Feedback::Waiting,
            HoldStatus::Holding { input, held } => {
                debug!("{}: holding {} for {:?}", current, input, held);
                Feedback::Holding {
                    target: current,
                    input,
                    held,
                }
            }
            HoldStatus::Reset { previous, reason } => {
                debug!("{}: candidate {} reset ({})", current, previous, reason);
                Feedback::Reset {
                    target: current,
                    previous,
                    reason,
                }
            }
            HoldStatus::Confirmed(input) => {
                self.commit(current, input);
                return (
                    self.settling(target + 1),
                    Feedback::Committed {
                        target: current,
                        input,
                    },
                );
            }
        };

        let stage = Stage::Resolving {
            target,
            tracker: tracker.clone(),
        };
        (stage, feedback)
    }

    fn commit(&mut self, target: Target, input: RawInput) {
        if !self.used.insert(input) {
            warn!("{} is already mapped to another control, mapping {} anyway", input, target);
        }

        match (target, input) {
            (Target::Button(button), RawInput::Button(index)) => {
                self.profile.map_button(button, index);
            }
            (Target::Axis(axis), RawInput::Axis(index)) => {
                self.profile.map_axis(axis, index);
            }
            (Target::Axis(axis), RawInput::Button(index)) => {
                info!("{} is digital on this device", axis);
                self.profile.map_digital_trigger(axis, index);
            }
            (Target::Dpad, RawInput::Hat(index)) => {
                self.profile.map_dpad(index);
            }
            (target, input) => {
                warn!("Ignoring {} for {}", input, target);
                return;
            }
        }
        info!("Mapped {} -> {}", target, input);
    }
}
