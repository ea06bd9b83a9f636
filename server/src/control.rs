use crate::physics::{BodyHandle, PhysicsWorld};
use soccer_shared::vec2::{add, clamp_length, scale, sub, Vec2};

/// Fraction of the pointer offset added to the player's velocity each tick
pub const DRAG_STIFFNESS: f32 = 0.05;
pub const DRAG_MAX_SPEED: f32 = 4.0;
pub const DRAG_DAMPING: f32 = 0.92;

/// Latest pointer state from the human client.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerInput {
    /// Where the pointer is, while the button is held
    pub target: Option<Vec2>,
}

impl PointerInput {
    pub fn update(&mut self, position: Vec2, down: bool) {
        self.target = down.then_some(position);
    }

    pub fn release(&mut self) {
        self.target = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.target.is_some()
    }
}

/// Pull the human player toward the pointer while dragging, capped at
/// `DRAG_MAX_SPEED` and then damped.
pub fn apply_drag(world: &mut PhysicsWorld, body: BodyHandle, input: &PointerInput) {
    let Some(target) = input.target else {
        return;
    };
    let (Some(pos), Some(vel)) = (world.position(body), world.velocity(body)) else {
        return;
    };
    let pulled = add(vel, scale(sub(target, pos), DRAG_STIFFNESS));
    let capped = clamp_length(pulled, DRAG_MAX_SPEED);
    world.set_velocity(body, scale(capped, DRAG_DAMPING));
}
