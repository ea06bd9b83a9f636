//! Stuck-ball detection and the nudges that get a ball moving again.
//!
//! Checks run in a fixed order and the first one that fires wins for that
//! tick, so corrections never stack.

use crate::ball::{direction_or_random, random_direction, KineticProfile};
use crate::field::{center, BALL_RADIUS, FIELD_HEIGHT, FIELD_WIDTH, PLAYER_RADIUS, WALL_THICKNESS};
use crate::physics::{BodyHandle, PhysicsWorld};
use rand::Rng;
use soccer_shared::vec2::{distance, scale, sub, vec2, Vec2};

pub const CORNER_THRESHOLD: f32 = BALL_RADIUS * 1.5;
pub const CORNER_MAX_SPEED: f32 = 1.0;
pub const CORNER_INSET: f32 = 5.0;
pub const LOW_SPEED: f32 = 0.5;
pub const WALL_PROXIMITY: f32 = WALL_THICKNESS + BALL_RADIUS * 2.0;
pub const PLAYER_PROXIMITY: f32 = PLAYER_RADIUS + BALL_RADIUS * 2.0;
pub const STALL_SECONDS: f32 = 2.0;
pub const STALL_NUDGE_FACTOR: f32 = 1.5;

/// Which correction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Corner,
    LowSpeed,
    WallWedge,
    Stall,
}

/// Tracks how long a ball has stayed within one radius of a fixed point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StuckTimer {
    pub is_stuck: bool,
    pub stuck_since: f32,
    pub last_position: Vec2,
}

impl StuckTimer {
    pub fn new(position: Vec2, now: f32) -> Self {
        Self {
            is_stuck: false,
            stuck_since: now,
            last_position: position,
        }
    }

    pub fn reset(&mut self, position: Vec2, now: f32) {
        *self = Self::new(position, now);
    }

    /// Update with this tick's position. Returns true once the ball has
    /// stayed put for longer than the stall window.
    fn observe(&mut self, position: Vec2, now: f32) -> bool {
        if distance(position, self.last_position) >= BALL_RADIUS {
            self.reset(position, now);
            return false;
        }
        self.is_stuck = true;
        now - self.stuck_since > STALL_SECONDS
    }
}

/// Run the recovery checks for one ball against the given player positions.
pub fn recover_ball(
    world: &mut PhysicsWorld,
    body: BodyHandle,
    profile: &KineticProfile,
    timer: &mut StuckTimer,
    players: &[Vec2],
    now: f32,
    rng: &mut impl Rng,
) -> Option<Recovery> {
    let (pos, vel) = (world.position(body)?, world.velocity(body)?);
    let speed = vel.length();
    let stalled = timer.observe(pos, now);
    let target_speed = profile.current_speed;

    if let Some((escape_pos, dir)) = corner_escape(pos, speed) {
        world.set_position(body, escape_pos);
        world.set_velocity(body, scale(dir, target_speed));
        return Some(Recovery::Corner);
    }

    if speed < LOW_SPEED {
        world.set_velocity(body, scale(random_direction(rng), target_speed));
        return Some(Recovery::LowSpeed);
    }

    let near_player = players
        .iter()
        .any(|p| distance(pos, *p) < PLAYER_PROXIMITY);
    if near_wall(pos) && near_player {
        let dir = direction_or_random(sub(center(), pos), rng);
        world.set_velocity(body, scale(dir, target_speed));
        return Some(Recovery::WallWedge);
    }

    if stalled {
        let dir = direction_or_random(sub(center(), pos), rng);
        world.set_velocity(body, scale(dir, target_speed * STALL_NUDGE_FACTOR));
        timer.reset(pos, now);
        return Some(Recovery::Stall);
    }

    None
}

/// If a slow ball sits in a corner, where to put it and which way to send it.
fn corner_escape(pos: Vec2, speed: f32) -> Option<(Vec2, Vec2)> {
    if speed >= CORNER_MAX_SPEED {
        return None;
    }
    let sx = if pos.x < CORNER_THRESHOLD {
        1.0
    } else if pos.x > FIELD_WIDTH - CORNER_THRESHOLD {
        -1.0
    } else {
        return None;
    };
    let sy = if pos.y < CORNER_THRESHOLD {
        1.0
    } else if pos.y > FIELD_HEIGHT - CORNER_THRESHOLD {
        -1.0
    } else {
        return None;
    };
    let inset = CORNER_THRESHOLD + CORNER_INSET;
    let x = if sx > 0.0 { inset } else { FIELD_WIDTH - inset };
    let y = if sy > 0.0 { inset } else { FIELD_HEIGHT - inset };
    let diag = std::f32::consts::FRAC_1_SQRT_2;
    Some((vec2(x, y), vec2(sx * diag, sy * diag)))
}

fn near_wall(pos: Vec2) -> bool {
    pos.x < WALL_PROXIMITY
        || pos.x > FIELD_WIDTH - WALL_PROXIMITY
        || pos.y < WALL_PROXIMITY
        || pos.y > FIELD_HEIGHT - WALL_PROXIMITY
}
