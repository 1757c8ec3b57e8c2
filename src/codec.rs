//! Frame codec
//!
//! Two stateless encodings of a [`ControllerState`]:
//!
//! - **binary**: 16 bytes, little-endian.
//!
//!   ```text
//!   offset 0   u16  button mask (bit 0 = a ... bit 13 = right)
//!   offset 2   i16  lx, ly, rx, ry, lt, rt   (value * 32767, rounded)
//!   offset 14  u16  reserved, always 0
//!   ```
//!
//! - **text**: one JSON object with the keys `a b x y lb rb back start l3 r3
//!   up down left right lx ly rx ry lt rt`, floats rounded to 4 decimals.

use serde::{Deserialize, Serialize};

use crate::mapping::ControllerState;

pub const BINARY_FRAME_LEN: usize = 16;

/// Wire format used by the broadcast loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Text,
    Binary,
}

/// One encoded frame, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameFormat {
    /// Encodes a state; an absent state produces no payload at all
    pub fn encode(&self, state: Option<&ControllerState>) -> Result<Option<Payload>, serde_json::Error> {
        let payload = match self {
            FrameFormat::Text => state.map(encode_text).transpose()?.map(Payload::Text),
            FrameFormat::Binary => Some(Payload::Binary(binary_frame(state))),
        };
        Ok(payload.filter(|p| !p.is_empty()))
    }
}

/// Scales a normalized axis to a signed 16-bit wire value
pub fn axis_to_wire(value: f32) -> i16 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

pub fn button_mask(state: &ControllerState) -> u16 {
    state
        .flags()
        .iter()
        .enumerate()
        .fold(0u16, |mask, (bit, set)| mask | (u16::from(*set) << bit))
}

/// Inverse of [`button_mask`]
pub fn unpack_flags(mask: u16) -> [bool; 14] {
    std::array::from_fn(|bit| mask & (1 << bit) != 0)
}

pub fn encode_binary(state: &ControllerState) -> [u8; BINARY_FRAME_LEN] {
    let mut frame = [0u8; BINARY_FRAME_LEN];
    frame[0..2].copy_from_slice(&button_mask(state).to_le_bytes());
    for (slot, value) in state.axes().into_iter().enumerate() {
        let offset = 2 + slot * 2;
        frame[offset..offset + 2].copy_from_slice(&axis_to_wire(value).to_le_bytes());
    }
    frame
}

/// Binary frame as an owned buffer; empty when there is no state
pub fn binary_frame(state: Option<&ControllerState>) -> Vec<u8> {
    state.map(|s| encode_binary(s).to_vec()).unwrap_or_default()
}

#[derive(Serialize)]
struct TextFrame {
    a: bool,
    b: bool,
    x: bool,
    y: bool,
    lb: bool,
    rb: bool,
    back: bool,
    start: bool,
    l3: bool,
    r3: bool,
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    lx: f64,
    ly: f64,
    rx: f64,
    ry: f64,
    lt: f64,
    rt: f64,
}

fn round4(value: f32) -> f64 {
    (f64::from(value) * 10_000.0).round() / 10_000.0
}

pub fn encode_text(state: &ControllerState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&TextFrame {
        a: state.a,
        b: state.b,
        x: state.x,
        y: state.y,
        lb: state.lb,
        rb: state.rb,
        back: state.back,
        start: state.start,
        l3: state.l3,
        r3: state.r3,
        up: state.up,
        down: state.down,
        left: state.left,
        right: state.right,
        lx: round4(state.lx),
        ly: round4(state.ly),
        rx: round4(state.rx),
        ry: round4(state.ry),
        lt: round4(state.lt),
        rt: round4(state.rt),
    })
}
