use crate::field::{FIELD_HEIGHT, FIELD_WIDTH, PLAYER_RADIUS, WALL_THICKNESS};
use crate::physics::{BodyHandle, PhysicsWorld};
use soccer_shared::team::Side;
use soccer_shared::vec2::{vec2, Vec2};

pub const HORIZONTAL_MARGIN: f32 = PLAYER_RADIUS + WALL_THICKNESS;
pub const BOUNCE_DAMPING: f32 = 0.5;

/// Keep a player in its own half and between the side walls. A crossing is
/// answered with a soft bounce: the position is clamped and the crossing
/// velocity component is inverted and halved. Returns true if anything was
/// corrected.
pub fn enforce_player_bounds(world: &mut PhysicsWorld, body: BodyHandle, side: Side) -> bool {
    let (Some(p), Some(v)) = (world.position(body), world.velocity(body)) else {
        return false;
    };
    let (pos, vel) = match confine(p, v, side) {
        Some(corrected) => corrected,
        None => return false,
    };
    world.set_position(body, pos);
    world.set_velocity(body, vel);
    true
}

fn confine(p: Vec2, v: Vec2, side: Side) -> Option<(Vec2, Vec2)> {
    let mut pos = p;
    let mut vel = v;
    let mut corrected = false;
    let mid = FIELD_HEIGHT / 2.0;

    match side {
        Side::Player if p.y < mid => {
            pos.y = mid + PLAYER_RADIUS;
            vel = vec2(vel.x * BOUNCE_DAMPING, vel.y.abs() * BOUNCE_DAMPING);
            corrected = true;
        }
        Side::Opponent if p.y > mid => {
            pos.y = mid - PLAYER_RADIUS;
            vel = vec2(vel.x * BOUNCE_DAMPING, -vel.y.abs() * BOUNCE_DAMPING);
            corrected = true;
        }
        _ => {}
    }

    if p.x < HORIZONTAL_MARGIN {
        pos.x = HORIZONTAL_MARGIN;
        vel = vec2(vel.x.abs() * BOUNCE_DAMPING, vel.y * BOUNCE_DAMPING);
        corrected = true;
    } else if p.x > FIELD_WIDTH - HORIZONTAL_MARGIN {
        pos.x = FIELD_WIDTH - HORIZONTAL_MARGIN;
        vel = vec2(-vel.x.abs() * BOUNCE_DAMPING, vel.y * BOUNCE_DAMPING);
        corrected = true;
    }

    corrected.then_some((pos, vel))
}
