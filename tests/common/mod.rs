//! Shared fixtures for integration tests

#![allow(dead_code)]

use nexuscontroller::controller::{HatState, RawSample, ScriptedSampler};
use nexuscontroller::mapping::{AxisName, ButtonName, MappingProfile};

pub const AXES: usize = 5;
pub const BUTTONS: usize = 12;

/// Idle pad: sticks centered, left trigger axis resting at -1
pub fn rest() -> RawSample {
    RawSample {
        axes: vec![0.0, 0.0, -1.0, 0.0, 0.0],
        buttons: vec![false; BUTTONS],
        hats: vec![HatState::CENTERED],
    }
}

pub fn with_button(index: usize) -> RawSample {
    let mut sample = rest();
    sample.buttons[index] = true;
    sample
}

pub fn with_axis(index: usize, value: f32) -> RawSample {
    let mut sample = rest();
    sample.axes[index] = value;
    sample
}

pub fn with_hat(hat: HatState) -> RawSample {
    let mut sample = rest();
    sample.hats[0] = hat;
    sample
}

pub fn pad() -> ScriptedSampler {
    ScriptedSampler::new("Test Pad", Some("030000005e0400008e02000014010000"))
}

/// Profile matching the layout the fixtures above describe
pub fn pad_profile() -> MappingProfile {
    let mut profile = MappingProfile::new("Test Pad", Some("030000005e0400008e02000014010000".to_string()));
    for (name, index) in ButtonName::ALL.into_iter().zip([0, 1, 2, 3, 4, 5, 6, 7, 9, 10]) {
        profile.map_button(name, index);
    }
    profile
        .map_axis(AxisName::LeftStickX, 0)
        .map_axis(AxisName::LeftStickY, 1)
        .map_axis(AxisName::TriggerLeft, 2)
        .map_axis(AxisName::RightStickX, 3)
        .map_axis(AxisName::RightStickY, 4)
        .map_digital_trigger(AxisName::TriggerRight, 11)
        .map_dpad(0)
        .set_baseline(2, -1.0);
    profile
}
