/// Normalized snapshot of the controller for one tick
///
/// Built fresh by the normalization pipeline every tick and handed to the frame
/// codec. Axis values are always within [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub lb: bool,
    pub rb: bool,
    pub back: bool,
    pub start: bool,
    pub l3: bool,
    pub r3: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub lx: f32,
    pub ly: f32,
    pub rx: f32,
    pub ry: f32,
    pub lt: f32,
    pub rt: f32,
}

impl ControllerState {
    /// The fourteen digital flags in wire bit order (bit 0 = `a` ... bit 13 = `right`)
    pub fn flags(&self) -> [bool; 14] {
        [
            self.a, self.b, self.x, self.y, self.lb, self.rb, self.back, self.start, self.l3,
            self.r3, self.up, self.down, self.left, self.right,
        ]
    }

    /// The six axes in wire order: lx, ly, rx, ry, lt, rt
    pub fn axes(&self) -> [f32; 6] {
        [self.lx, self.ly, self.rx, self.ry, self.lt, self.rt]
    }
}
