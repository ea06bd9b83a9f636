/// 2D vector utilities for the pitch plane.
/// x grows to the right, y grows toward the human player's goal (downward on screen).

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Lengths below this are treated as zero when normalizing.
pub const NORMALIZE_EPSILON: f32 = 1e-6;

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `angle` radians from the +x axis.
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        length(self)
    }
}

/// Shorthand constructor
pub fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

pub fn add(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x + b.x, a.y + b.y)
}

/// a - b
pub fn sub(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x - b.x, a.y - b.y)
}

pub fn scale(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(v.x * s, v.y * s)
}

pub fn length(v: Vec2) -> f32 {
    (v.x * v.x + v.y * v.y).sqrt()
}

pub fn distance(a: Vec2, b: Vec2) -> f32 {
    length(sub(a, b))
}

/// Normalize to unit length, or `None` when the vector is (nearly) zero.
pub fn try_normalize(v: Vec2) -> Option<Vec2> {
    let len = length(v);
    if len < NORMALIZE_EPSILON || !len.is_finite() {
        return None;
    }
    Some(Vec2::new(v.x / len, v.y / len))
}

/// Rescale `v` to `magnitude`, keeping its direction. `None` for zero vectors.
pub fn with_length(v: Vec2, magnitude: f32) -> Option<Vec2> {
    try_normalize(v).map(|dir| scale(dir, magnitude))
}

/// Clamp the length of `v` to at most `max`.
pub fn clamp_length(v: Vec2, max: f32) -> Vec2 {
    let len = length(v);
    if len > max && len > NORMALIZE_EPSILON {
        scale(v, max / len)
    } else {
        v
    }
}
