//! Pitch geometry: dimensions, start positions and the static colliders.
//!
//! Coordinates are in field units with the origin at the top-left corner and
//! y growing downward. The human player defends the bottom goal.

use crate::physics::{BodyDesc, BodyHandle, BodyRole, Layer, PhysicsWorld};
use soccer_shared::protocol::FieldWire;
use soccer_shared::vec2::{vec2, Vec2};

pub const FIELD_WIDTH: f32 = 320.0;
pub const FIELD_HEIGHT: f32 = 420.0;
pub const GOAL_WIDTH: f32 = 80.0;
pub const GOAL_HEIGHT: f32 = 10.0;
pub const WALL_THICKNESS: f32 = 3.0;
pub const POST_THICKNESS: f32 = 2.0;

pub const WALL_RESTITUTION: f32 = 0.7;
pub const WALL_FRICTION: f32 = 0.1;
pub const POST_RESTITUTION: f32 = 0.5;

pub const PLAYER_RADIUS: f32 = 25.0;
pub const PLAYER_MASS: f32 = 10.0;
pub const PLAYER_AIR_FRICTION: f32 = 0.35;
pub const PLAYER_RESTITUTION: f32 = 0.3;

pub const BALL_RADIUS: f32 = 15.0;
pub const BALL_MASS: f32 = 0.2;
pub const BALL_AIR_FRICTION: f32 = 0.005;
pub const BALL_RESTITUTION: f32 = 0.9;

/// Horizontal distance of each ball from center in two-ball mode
pub const TWO_BALL_OFFSET: f32 = 30.0;

pub const PLAYER_START: Vec2 = Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT - 100.0);
pub const OPPONENT_START: Vec2 = Vec2::new(FIELD_WIDTH / 2.0, 100.0);

pub fn center() -> Vec2 {
    vec2(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0)
}

/// Center of the goal the AI defends.
pub fn top_goal_center() -> Vec2 {
    vec2(FIELD_WIDTH / 2.0, GOAL_HEIGHT / 2.0)
}

/// Where balls start: center for one ball, symmetric about center for two.
pub fn ball_spawn_point(slot: usize, ball_count: usize) -> Vec2 {
    if ball_count < 2 {
        return center();
    }
    let dx = if slot == 0 {
        -TWO_BALL_OFFSET
    } else {
        TWO_BALL_OFFSET
    };
    vec2(FIELD_WIDTH / 2.0 + dx, FIELD_HEIGHT / 2.0)
}

/// True when `x` lies within the goal mouth.
pub fn in_goal_mouth(x: f32) -> bool {
    (x - FIELD_WIDTH / 2.0).abs() < GOAL_WIDTH / 2.0
}

pub fn wire() -> FieldWire {
    FieldWire {
        width: FIELD_WIDTH,
        height: FIELD_HEIGHT,
        goal_width: GOAL_WIDTH,
        player_radius: PLAYER_RADIUS,
        ball_radius: BALL_RADIUS,
    }
}

/// Static colliders for one match. Built at match start and torn down with it.
pub struct Field {
    handles: Vec<BodyHandle>,
}

impl Field {
    pub fn build(world: &mut PhysicsWorld) -> Self {
        let side_wall_len = FIELD_WIDTH / 2.0 - GOAL_WIDTH / 2.0;
        let mut descs = Vec::new();

        // End walls, split by the goal mouth
        for y in [WALL_THICKNESS / 2.0, FIELD_HEIGHT - WALL_THICKNESS / 2.0] {
            for x in [FIELD_WIDTH / 4.0, FIELD_WIDTH * 3.0 / 4.0] {
                descs.push(wall(vec2(x, y), side_wall_len, WALL_THICKNESS));
            }
        }
        // Side walls
        for x in [WALL_THICKNESS / 2.0, FIELD_WIDTH - WALL_THICKNESS / 2.0] {
            descs.push(wall(vec2(x, FIELD_HEIGHT / 2.0), WALL_THICKNESS, FIELD_HEIGHT));
        }

        descs.push(
            BodyDesc::fixed_rect(
                BodyRole::CenterLine,
                Layer::Decoration,
                center(),
                FIELD_WIDTH,
                2.0,
            )
            .sensor(),
        );
        descs.push(BodyDesc::fixed_rect(
            BodyRole::CenterBarrier,
            Layer::CenterBarrier,
            center(),
            FIELD_WIDTH,
            2.0,
        ));

        descs.push(
            BodyDesc::fixed_rect(
                BodyRole::TopGoal,
                Layer::GoalSensor,
                top_goal_center(),
                GOAL_WIDTH,
                GOAL_HEIGHT,
            )
            .sensor(),
        );
        descs.push(
            BodyDesc::fixed_rect(
                BodyRole::BottomGoal,
                Layer::GoalSensor,
                vec2(FIELD_WIDTH / 2.0, FIELD_HEIGHT - GOAL_HEIGHT / 2.0),
                GOAL_WIDTH,
                GOAL_HEIGHT,
            )
            .sensor(),
        );

        // Posts and crossbar per goal
        for y in [POST_THICKNESS, FIELD_HEIGHT - POST_THICKNESS] {
            for x in [
                FIELD_WIDTH / 2.0 - GOAL_WIDTH / 2.0,
                FIELD_WIDTH / 2.0 + GOAL_WIDTH / 2.0,
            ] {
                descs.push(post(vec2(x, y), POST_THICKNESS, GOAL_HEIGHT * 2.0));
            }
            descs.push(post(
                vec2(FIELD_WIDTH / 2.0, y),
                GOAL_WIDTH,
                POST_THICKNESS,
            ));
        }

        let handles = descs.into_iter().map(|d| world.spawn(d)).collect();
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn teardown(self, world: &mut PhysicsWorld) {
        for handle in self.handles {
            world.despawn(handle);
        }
    }
}

fn wall(center: Vec2, width: f32, height: f32) -> BodyDesc {
    BodyDesc::fixed_rect(BodyRole::Wall, Layer::Solid, center, width, height)
        .restitution(WALL_RESTITUTION)
        .friction(WALL_FRICTION)
}

fn post(center: Vec2, width: f32, height: f32) -> BodyDesc {
    BodyDesc::fixed_rect(BodyRole::GoalPost, Layer::Solid, center, width, height)
        .restitution(POST_RESTITUTION)
}
