//! gilrs implementation of [`DeviceSampler`]
//!
//! gilrs reports inputs through its own semantic enums. To expose plain indices
//! the sampler builds a [`RawLayout`] when a gamepad is opened: every axis and
//! button code gilrs knows for that pad, in a fixed order, deduplicated. The same
//! pad therefore always yields the same indices, which is what a stored mapping
//! profile relies on.
//!
//! `Gilrs` is not `Send`; the sampler has to stay on the thread that created it.

use gilrs::ev::Code;
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs, GilrsBuilder};
use tracing::{debug, error, info, warn};

use super::device::{DeviceError, DeviceIdentity, DeviceSampler, HatState};

const LAYOUT_AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

const ANALOG_TRIGGERS: [Button; 2] = [Button::LeftTrigger2, Button::RightTrigger2];

const LAYOUT_BUTTONS: [Button; 15] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::Mode,
    Button::C,
    Button::Z,
    Button::LeftTrigger2,
    Button::RightTrigger2,
];

// Dpad axes above this magnitude count as pressed
const HAT_AXIS_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum AxisSource {
    Axis(Code),
    // Analog button value in [0, 1], reported as [-1, 1] so it rests near -1
    AnalogButton(Code),
}

#[derive(Debug, Clone, Copy)]
enum HatSource {
    Axes {
        x: Code,
        y: Code,
    },
    Buttons {
        up: Option<Code>,
        down: Option<Code>,
        left: Option<Code>,
        right: Option<Code>,
    },
}

#[derive(Debug, Clone, Default)]
struct RawLayout {
    axes: Vec<AxisSource>,
    buttons: Vec<Code>,
    hat: Option<HatSource>,
}

#[derive(Debug)]
struct ActiveGamepad {
    id: GamepadId,
    layout: RawLayout,
}

pub struct GilrsSampler {
    gilrs: Gilrs,
    active: Option<ActiveGamepad>,
}

impl GilrsSampler {
    pub fn new() -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        // Default filters smooth jitter away; calibration needs to see it
        let gilrs = GilrsBuilder::new()
            .with_default_filters(false)
            .build()
            .map_err(|e| {
                error!("Failed to initialize gilrs: {}", e);
                DeviceError::Backend(e.to_string())
            })?;

        for (id, gamepad) in gilrs.gamepads() {
            info!(
                "Detected gamepad {}: {} [{}]",
                id,
                gamepad.name(),
                guid_string(gamepad.uuid())
            );
        }

        Ok(Self {
            gilrs,
            active: None,
        })
    }

    fn build_layout(&self, id: GamepadId) -> Option<RawLayout> {
        let gamepad = self.gilrs.connected_gamepad(id)?;
        let mut layout = RawLayout::default();

        for axis in LAYOUT_AXES {
            if let Some(code) = gamepad.axis_code(axis) {
                push_unique(&mut layout.axes, AxisSource::Axis(code));
            }
        }
        for button in ANALOG_TRIGGERS {
            if let Some(code) = gamepad.button_code(button) {
                push_unique(&mut layout.axes, AxisSource::AnalogButton(code));
            }
        }
        for button in LAYOUT_BUTTONS {
            if let Some(code) = gamepad.button_code(button) {
                push_unique(&mut layout.buttons, code);
            }
        }

        layout.hat = match (
            gamepad.axis_code(Axis::DPadX),
            gamepad.axis_code(Axis::DPadY),
        ) {
            (Some(x), Some(y)) => Some(HatSource::Axes { x, y }),
            _ => {
                let up = gamepad.button_code(Button::DPadUp);
                let down = gamepad.button_code(Button::DPadDown);
                let left = gamepad.button_code(Button::DPadLeft);
                let right = gamepad.button_code(Button::DPadRight);
                if up.is_some() || down.is_some() || left.is_some() || right.is_some() {
                    Some(HatSource::Buttons {
                        up,
                        down,
                        left,
                        right,
                    })
                } else {
                    None
                }
            }
        };

        debug!(
            "Raw layout for {}: {} axes, {} buttons, hat: {}",
            gamepad.name(),
            layout.axes.len(),
            layout.buttons.len(),
            layout.hat.is_some()
        );
        Some(layout)
    }

    fn active_layout(&self) -> Option<(gilrs::Gamepad<'_>, &RawLayout)> {
        let active = self.active.as_ref()?;
        let gamepad = self.gilrs.connected_gamepad(active.id)?;
        Some((gamepad, &active.layout))
    }
}

impl DeviceSampler for GilrsSampler {
    fn pump(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    info!("Gamepad {} connected", id);
                }
                EventType::Disconnected => {
                    warn!("Gamepad {} disconnected", id);
                }
                _ => {}
            }
        }
    }

    fn device_count(&self) -> usize {
        self.gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .count()
    }

    fn open(&mut self, index: usize) -> Result<DeviceIdentity, DeviceError> {
        let (id, identity) = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .nth(index)
            .map(|(id, gamepad)| {
                (
                    id,
                    DeviceIdentity {
                        name: gamepad.name().to_string(),
                        guid: Some(guid_string(gamepad.uuid())),
                    },
                )
            })
            .ok_or(DeviceError::NoDevice(index))?;

        let layout = self.build_layout(id).ok_or(DeviceError::NoDevice(index))?;
        self.active = Some(ActiveGamepad { id, layout });
        info!("Opened gamepad {}: {}", id, identity.name);
        Ok(identity)
    }

    fn release(&mut self) {
        if let Some(active) = self.active.take() {
            info!("Released gamepad {}", active.id);
        }
    }

    fn axis_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.layout.axes.len())
    }

    fn button_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.layout.buttons.len())
    }

    fn hat_count(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |a| usize::from(a.layout.hat.is_some()))
    }

    fn axis(&self, index: usize) -> f32 {
        let Some((gamepad, layout)) = self.active_layout() else {
            return 0.0;
        };
        match layout.axes.get(index) {
            Some(AxisSource::Axis(code)) => gamepad.state().value(*code),
            Some(AxisSource::AnalogButton(code)) => gamepad
                .state()
                .button_data(*code)
                .map_or(-1.0, |data| data.value() * 2.0 - 1.0),
            None => 0.0,
        }
    }

    fn button(&self, index: usize) -> bool {
        let Some((gamepad, layout)) = self.active_layout() else {
            return false;
        };
        layout
            .buttons
            .get(index)
            .is_some_and(|code| gamepad.state().is_pressed(*code))
    }

    fn hat(&self, index: usize) -> HatState {
        let Some((gamepad, layout)) = self.active_layout() else {
            return HatState::CENTERED;
        };
        if index != 0 {
            return HatState::CENTERED;
        }
        let state = gamepad.state();
        match layout.hat {
            Some(HatSource::Axes { x, y }) => HatState::new(
                axis_direction(state.value(x)),
                axis_direction(state.value(y)),
            ),
            Some(HatSource::Buttons {
                up,
                down,
                left,
                right,
            }) => {
                let pressed = |code: Option<Code>| code.is_some_and(|c| state.is_pressed(c));
                let x = i32::from(pressed(right)) - i32::from(pressed(left));
                let y = i32::from(pressed(up)) - i32::from(pressed(down));
                HatState::new(x, y)
            }
            None => HatState::CENTERED,
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn axis_direction(value: f32) -> i32 {
    if value > HAT_AXIS_THRESHOLD {
        1
    } else if value < -HAT_AXIS_THRESHOLD {
        -1
    } else {
        0
    }
}

/// Lowercase hex rendering of a gamepad UUID
pub fn guid_string(uuid: [u8; 16]) -> String {
    uuid.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_is_lowercase_hex() {
        let mut uuid = [0u8; 16];
        uuid[0] = 0x03;
        uuid[15] = 0xAB;
        let guid = guid_string(uuid);
        assert_eq!(guid.len(), 32);
        assert!(guid.starts_with("03"));
        assert!(guid.ends_with("ab"));
    }

    #[test]
    fn dpad_axis_direction_uses_threshold() {
        assert_eq!(axis_direction(1.0), 1);
        assert_eq!(axis_direction(-0.9), -1);
        assert_eq!(axis_direction(0.2), 0);
    }
}
