//! Per-ball kinetic bookkeeping and the constant-speed governor.

use crate::field::{in_goal_mouth, BALL_RADIUS, FIELD_HEIGHT, FIELD_WIDTH, WALL_THICKNESS};
use crate::physics::{BodyHandle, PhysicsWorld};
use rand::Rng;
use soccer_shared::vec2::{scale, try_normalize, vec2, with_length, Vec2};

/// Below this speed the governor relaunches instead of rescaling
pub const SPEED_DEADBAND: f32 = 0.1;

pub const POWER_UP_SPEED_FACTOR: f32 = 2.0;

/// Speed, power-up and touch state for one ball, independent of rapier's own
/// velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KineticProfile {
    pub base_speed: f32,
    pub current_speed: f32,
    pub powered_up: bool,
    pub touch_count: u32,
    touches_to_power_up: u32,
}

impl KineticProfile {
    pub fn new(base_speed: f32, touches_to_power_up: u32) -> Self {
        Self {
            base_speed,
            current_speed: base_speed,
            powered_up: false,
            touch_count: 0,
            touches_to_power_up,
        }
    }

    /// Count a kick. Returns true if this touch powered the ball up.
    pub fn register_touch(&mut self) -> bool {
        self.touch_count += 1;
        if !self.powered_up && self.touch_count >= self.touches_to_power_up {
            self.powered_up = true;
            self.current_speed = self.base_speed * POWER_UP_SPEED_FACTOR;
            return true;
        }
        false
    }

    /// Back to base speed with no touches. Returns true if the ball was powered up.
    pub fn reset(&mut self) -> bool {
        let was_powered = self.powered_up;
        self.powered_up = false;
        self.touch_count = 0;
        self.current_speed = self.base_speed;
        was_powered
    }
}

pub fn random_direction(rng: &mut impl Rng) -> Vec2 {
    Vec2::from_angle(rng.gen::<f32>() * std::f32::consts::TAU)
}

/// Normalize `v` or fall back to a random direction when it is degenerate.
pub fn direction_or_random(v: Vec2, rng: &mut impl Rng) -> Vec2 {
    try_normalize(v).unwrap_or_else(|| random_direction(rng))
}

/// Rescale the ball's velocity to exactly `current_speed`. A near-stationary
/// ball is relaunched in a random direction.
pub fn govern_speed(
    world: &mut PhysicsWorld,
    body: BodyHandle,
    profile: &KineticProfile,
    rng: &mut impl Rng,
) {
    let Some(v) = world.velocity(body) else {
        return;
    };
    let rescaled = if v.length() > SPEED_DEADBAND {
        with_length(v, profile.current_speed)
    } else {
        None
    };
    let next = rescaled.unwrap_or_else(|| scale(random_direction(rng), profile.current_speed));
    world.set_velocity(body, next);
}

/// Keep the ball inside the walls. Outside the goal mouth the end lines also
/// count as walls. A clamped ball leaves the wall at `current_speed`.
pub fn contain_ball(world: &mut PhysicsWorld, body: BodyHandle, profile: &KineticProfile) {
    let (Some(p), Some(v)) = (world.position(body), world.velocity(body)) else {
        return;
    };
    let min = WALL_THICKNESS + BALL_RADIUS;
    let max_x = FIELD_WIDTH - WALL_THICKNESS - BALL_RADIUS;
    let max_y = FIELD_HEIGHT - WALL_THICKNESS - BALL_RADIUS;

    let mut pos = p;
    let mut dir = v;
    let mut clamped = false;

    if p.x < min {
        pos.x = min;
        dir.x = v.x.abs();
        clamped = true;
    } else if p.x > max_x {
        pos.x = max_x;
        dir.x = -v.x.abs();
        clamped = true;
    }

    if !in_goal_mouth(p.x) {
        if p.y < min {
            pos.y = min;
            dir.y = v.y.abs();
            clamped = true;
        } else if p.y > max_y {
            pos.y = max_y;
            dir.y = -v.y.abs();
            clamped = true;
        }
    }

    if !clamped {
        return;
    }
    world.set_position(body, pos);
    // A stationary ball clamped at a wall is sent straight back into play
    let fallback = vec2(inward(pos.x, min, max_x), inward(pos.y, min, max_y));
    let next = with_length(dir, profile.current_speed)
        .or_else(|| with_length(fallback, profile.current_speed))
        .unwrap_or(dir);
    world.set_velocity(body, next);
}

fn inward(coord: f32, min: f32, max: f32) -> f32 {
    if coord <= min {
        1.0
    } else if coord >= max {
        -1.0
    } else {
        0.0
    }
}
