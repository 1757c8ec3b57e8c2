//! Normalization pipeline: raw sample + profile -> controller state
//!
//! Pure and side-effect free. A control the profile does not map reads as
//! released / 0.0; a raw index the device does not report reads the same way.

use tracing::trace;

use super::names::{AxisName, ButtonName};
use super::profile::MappingProfile;
use super::state::ControllerState;
use crate::controller::device::{HatState, RawSample};

/// Subtracts the rest value and clamps into [-1.0, 1.0]
///
/// Clamping happens after the subtraction: a trigger resting near -1 can
/// otherwise overshoot to almost 2.0 when fully pressed.
pub fn normalize_axis(raw: f32, baseline: f32) -> f32 {
    let corrected = raw - baseline;
    if corrected.is_nan() {
        return 0.0;
    }
    corrected.clamp(-1.0, 1.0)
}

/// Owns the mapping profile for the lifetime of a streaming session
#[derive(Debug, Clone)]
pub struct NormalizationPipeline {
    profile: MappingProfile,
}

impl NormalizationPipeline {
    pub fn new(profile: MappingProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &MappingProfile {
        &self.profile
    }

    pub fn apply(&self, sample: &RawSample) -> ControllerState {
        let dpad = self.dpad(sample);

        let state = ControllerState {
            a: self.button(sample, ButtonName::FaceBottom),
            b: self.button(sample, ButtonName::FaceRight),
            x: self.button(sample, ButtonName::FaceLeft),
            y: self.button(sample, ButtonName::FaceTop),
            lb: self.button(sample, ButtonName::ShoulderLeft),
            rb: self.button(sample, ButtonName::ShoulderRight),
            back: self.button(sample, ButtonName::Select),
            start: self.button(sample, ButtonName::Start),
            l3: self.button(sample, ButtonName::ThumbLeft),
            r3: self.button(sample, ButtonName::ThumbRight),
            up: dpad.y == 1,
            down: dpad.y == -1,
            left: dpad.x == -1,
            right: dpad.x == 1,
            lx: self.axis(sample, AxisName::LeftStickX),
            ly: self.axis(sample, AxisName::LeftStickY),
            rx: self.axis(sample, AxisName::RightStickX),
            ry: self.axis(sample, AxisName::RightStickY),
            lt: self.axis(sample, AxisName::TriggerLeft),
            rt: self.axis(sample, AxisName::TriggerRight),
        };
        trace!("Normalized state: {:?}", state);
        state
    }

    fn button(&self, sample: &RawSample, name: ButtonName) -> bool {
        self.profile
            .button(name)
            .is_some_and(|index| sample.button(index))
    }

    fn dpad(&self, sample: &RawSample) -> HatState {
        self.profile
            .dpad()
            .map_or(HatState::CENTERED, |hat| sample.hat(hat))
    }

    fn axis(&self, sample: &RawSample, name: AxisName) -> f32 {
        // An axis mapping decides over a digital one when a profile holds both
        if let Some(index) = self.profile.axis(name) {
            return sample
                .axis(index)
                .map_or(0.0, |raw| normalize_axis(raw, self.profile.baseline(index)));
        }
        match self.profile.digital_trigger(name) {
            Some(index) if sample.button(index) => 1.0,
            _ => 0.0,
        }
    }
}

/// Convenience wrapper around [`NormalizationPipeline::apply`]
pub fn normalize(sample: &RawSample, profile: &MappingProfile) -> ControllerState {
    NormalizationPipeline::new(profile.clone()).apply(sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn sample(axes: Vec<f32>, buttons: Vec<bool>, hats: Vec<HatState>) -> RawSample {
        RawSample {
            axes,
            buttons,
            hats,
        }
    }

    #[test]
    fn normalize_axis_is_clamped_difference() {
        let cases = [
            (0.4, 0.1, 0.3),
            (1.0, -1.0, 1.0),
            (-1.0, 0.5, -1.0),
            (0.0, 0.0, 0.0),
            (-0.25, -0.5, 0.25),
        ];
        for (raw, base, expected) in cases {
            let value = normalize_axis(raw, base);
            assert!(approx(value, expected), "{} - {} gave {}", raw, base, value);
            assert_eq!(value.clamp(-1.0, 1.0), value);
        }
    }

    #[test]
    fn nan_reads_as_rest() {
        assert_eq!(normalize_axis(f32::NAN, 0.0), 0.0);
    }

    #[test]
    fn button_and_baseline_corrected_axis() {
        let mut profile = MappingProfile::new("Pad", None);
        profile
            .map_button(ButtonName::FaceBottom, 0)
            .map_axis(AxisName::LeftStickX, 0)
            .set_baseline(0, 0.1);

        let state = normalize(&sample(vec![0.4], vec![true], vec![]), &profile);
        assert!(state.a);
        assert!(approx(state.lx, 0.3));
        assert!(!state.b);
        assert_eq!(state.ly, 0.0);
    }

    #[test]
    fn empty_profile_yields_neutral_state() {
        let raw = sample(vec![1.0; 8], vec![true; 16], vec![HatState::UP]);
        assert_eq!(
            normalize(&raw, &MappingProfile::empty()),
            ControllerState::default()
        );
    }

    #[test]
    fn trigger_resting_low_does_not_overshoot() {
        let mut profile = MappingProfile::new("Pad", None);
        profile
            .map_axis(AxisName::TriggerLeft, 2)
            .set_baseline(2, -1.0);

        let rest = normalize(&sample(vec![0.0, 0.0, -1.0], vec![], vec![]), &profile);
        let full = normalize(&sample(vec![0.0, 0.0, 1.0], vec![], vec![]), &profile);
        assert_eq!(rest.lt, 0.0);
        assert_eq!(full.lt, 1.0);
    }

    #[test]
    fn dpad_follows_hat_components() {
        let mut profile = MappingProfile::new("Pad", None);
        profile.map_dpad(0);

        let state = normalize(&sample(vec![], vec![], vec![HatState::new(-1, 1)]), &profile);
        assert!(state.up && state.left);
        assert!(!state.down && !state.right);

        let state = normalize(&sample(vec![], vec![], vec![HatState::DOWN]), &profile);
        assert!(state.down && !state.up);
    }

    #[test]
    fn digital_trigger_surfaces_as_axis() {
        let mut profile = MappingProfile::new("Pad", None);
        profile.map_digital_trigger(AxisName::TriggerRight, 7);

        let released = normalize(&sample(vec![], vec![false; 8], vec![]), &profile);
        assert_eq!(released.rt, 0.0);

        let mut buttons = vec![false; 8];
        buttons[7] = true;
        let pressed = normalize(&sample(vec![], buttons, vec![]), &profile);
        assert_eq!(pressed.rt, 1.0);
        assert!(!pressed.rb);
    }

    #[test]
    fn axis_mapping_wins_over_digital_trigger() {
        let mut profile = MappingProfile::new("Pad", None);
        profile
            .map_axis(AxisName::TriggerLeft, 0)
            .map_digital_trigger(AxisName::TriggerLeft, 0);

        let state = normalize(&sample(vec![0.25], vec![true], vec![]), &profile);
        assert!(approx(state.lt, 0.25));
    }

    #[test]
    fn indices_beyond_device_read_neutral() {
        let mut profile = MappingProfile::new("Pad", None);
        profile
            .map_button(ButtonName::Start, 40)
            .map_axis(AxisName::RightStickY, 12)
            .map_dpad(3);

        let state = normalize(&sample(vec![0.9], vec![true], vec![HatState::UP]), &profile);
        assert_eq!(state, ControllerState::default());
    }
}
