//! Semantic control names as they appear in a mapping profile

use std::fmt;
use std::str::FromStr;

/// Digital controls resolved by calibration, in calibration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ButtonName {
    FaceBottom,
    FaceRight,
    FaceLeft,
    FaceTop,
    ShoulderLeft,
    ShoulderRight,
    Select,
    Start,
    ThumbLeft,
    ThumbRight,
}

impl ButtonName {
    pub const ALL: [ButtonName; 10] = [
        ButtonName::FaceBottom,
        ButtonName::FaceRight,
        ButtonName::FaceLeft,
        ButtonName::FaceTop,
        ButtonName::ShoulderLeft,
        ButtonName::ShoulderRight,
        ButtonName::Select,
        ButtonName::Start,
        ButtonName::ThumbLeft,
        ButtonName::ThumbRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonName::FaceBottom => "face_bottom",
            ButtonName::FaceRight => "face_right",
            ButtonName::FaceLeft => "face_left",
            ButtonName::FaceTop => "face_top",
            ButtonName::ShoulderLeft => "shoulder_left",
            ButtonName::ShoulderRight => "shoulder_right",
            ButtonName::Select => "select",
            ButtonName::Start => "start",
            ButtonName::ThumbLeft => "thumbl",
            ButtonName::ThumbRight => "thumbr",
        }
    }
}

/// Analog controls resolved by calibration, in calibration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisName {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    TriggerLeft,
    TriggerRight,
}

impl AxisName {
    pub const ALL: [AxisName; 6] = [
        AxisName::LeftStickX,
        AxisName::LeftStickY,
        AxisName::RightStickX,
        AxisName::RightStickY,
        AxisName::TriggerLeft,
        AxisName::TriggerRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisName::LeftStickX => "left_stick_x",
            AxisName::LeftStickY => "left_stick_y",
            AxisName::RightStickX => "right_stick_x",
            AxisName::RightStickY => "right_stick_y",
            AxisName::TriggerLeft => "trigger_left",
            AxisName::TriggerRight => "trigger_right",
        }
    }

    /// Triggers may be stored as digital buttons
    pub fn is_trigger(&self) -> bool {
        matches!(self, AxisName::TriggerLeft | AxisName::TriggerRight)
    }
}

/// Key of the only hat mapping
pub const DPAD: &str = "dpad";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown control name: {0}")]
pub struct UnknownName(pub String);

impl FromStr for ButtonName {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ButtonName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl FromStr for AxisName {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AxisName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl fmt::Display for ButtonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AxisName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_strings() {
        for name in ButtonName::ALL {
            assert_eq!(name.as_str().parse::<ButtonName>(), Ok(name));
        }
        for name in AxisName::ALL {
            assert_eq!(name.to_string().parse::<AxisName>(), Ok(name));
        }
    }

    #[test]
    fn thumb_names_use_short_form() {
        assert_eq!("thumbl".parse::<ButtonName>(), Ok(ButtonName::ThumbLeft));
        assert!("thumb_left".parse::<ButtonName>().is_err());
    }

    #[test]
    fn only_triggers_are_triggers() {
        let triggers: Vec<_> = AxisName::ALL.into_iter().filter(AxisName::is_trigger).collect();
        assert_eq!(triggers, vec![AxisName::TriggerLeft, AxisName::TriggerRight]);
    }
}
