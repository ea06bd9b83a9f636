//! Opponent controllers.
//!
//! Both models steer the AI body with forces, never with direct velocity
//! writes, and both finish every update with the same damping and speed cap.
//! The middle-line guard takes precedence over everything else: whenever the
//! AI drifts within `MIDDLE_LINE_BUFFER` of the center line it is pushed back
//! and nothing else steers it that update.

use crate::ball::direction_or_random;
use crate::boundary::HORIZONTAL_MARGIN;
use crate::field::{
    top_goal_center, BALL_RADIUS, FIELD_HEIGHT, FIELD_WIDTH, GOAL_HEIGHT, PLAYER_RADIUS,
};
use crate::match_state::MatchState;
use crate::physics::{BodyHandle, PhysicsWorld};
use rand::Rng;
use soccer_shared::config::AiModel;
use soccer_shared::vec2::{add, clamp_length, distance, scale, sub, try_normalize, vec2, Vec2};
use tracing::debug;

/// Force for one unit of steering. At player mass this is 0.9 units/tick of
/// velocity per update.
pub const AI_FORCE: f32 = 9.0;
pub const AI_MAX_SPEED: f32 = 5.0;
pub const MIDDLE_LINE_BUFFER: f32 = 40.0;
/// Deepest the AI body may go toward the center line
pub const AI_MAX_Y: f32 = FIELD_HEIGHT / 2.0 - MIDDLE_LINE_BUFFER;
/// Where the guard sends the AI back to
pub const AI_SAFE_Y: f32 = AI_MAX_Y - PLAYER_RADIUS;
const GUARD_FACTOR: f32 = 1.5;

// Behavior model
pub const BEHAVIOR_DAMPING: f32 = 0.95;
pub const BALL_IN_HALF_SECONDS: f32 = 2.0;
pub const BACKOFF_SECONDS: f32 = 2.0;
pub const ESCAPE_SECONDS: f32 = 2.0;
pub const HIT_DEBOUNCE_SECONDS: f32 = 0.3;
const BALL_TRACK_REFRESH_SECONDS: f32 = 1.0;
const CONTACT_DISTANCE: f32 = PLAYER_RADIUS + BALL_RADIUS + 5.0;
const STUCK_BALL_MOVEMENT: f32 = BALL_RADIUS * 2.0;
const STUCK_CORNER_THRESHOLD: f32 = BALL_RADIUS * 4.0;
const STUCK_BALL_SPEED: f32 = 1.0;
const ESCAPE_BALL_SPEED_FACTOR: f32 = 1.5;
const BACKOFF_FAR_DISTANCE: f32 = PLAYER_RADIUS * 6.0;
const CLOSE_BALL_DISTANCE: f32 = PLAYER_RADIUS * 3.0;

// Pursuit model
pub const PURSUIT_DAMPING: f32 = 0.94;
const PURSUIT_RANGE: f32 = 80.0;
const PURSUIT_MIN_SCALE: f32 = 0.3;
const PURSUIT_MAX_SCALE: f32 = 2.0;
const PATROL_FACTOR: f32 = 0.5;
const PATROL_MIN_SECONDS: f32 = 1.0;
const PATROL_MAX_SECONDS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiMode {
    Normal,
    BackingOff,
    Escaping,
}

/// The AI controller selected for a match.
#[derive(Debug, Clone)]
pub enum AiController {
    Behavior(BehaviorAi),
    Pursuit(PursuitAi),
}

impl AiController {
    pub fn new(model: AiModel) -> Self {
        match model {
            AiModel::Behavior => AiController::Behavior(BehaviorAi::new()),
            AiModel::Pursuit => AiController::Pursuit(PursuitAi::new()),
        }
    }

    pub fn update(&mut self, world: &mut PhysicsWorld, state: &mut MatchState) {
        match self {
            AiController::Behavior(ai) => ai.update(world, state),
            AiController::Pursuit(ai) => ai.update(world, state),
        }
    }

    /// Forget behavior history, e.g. after a goal re-centers everything.
    pub fn reset(&mut self, now: f32) {
        match self {
            AiController::Behavior(ai) => ai.reset(now),
            AiController::Pursuit(ai) => ai.reset(now),
        }
    }

    /// Current behavior mode, for the behavior model only.
    pub fn mode(&self) -> Option<AiMode> {
        match self {
            AiController::Behavior(ai) => Some(ai.mode),
            AiController::Pursuit(_) => None,
        }
    }
}

/// Snapshot of the ball the AI is reacting to.
#[derive(Debug, Clone, Copy)]
struct BallView {
    body: BodyHandle,
    position: Vec2,
    speed: f32,
    current_speed: f32,
}

/// Behavior-state machine: pursue, back off after the ball lingers in the AI
/// half, and escape when pinned against a barely moving ball.
#[derive(Debug, Clone)]
pub struct BehaviorAi {
    mode: AiMode,
    last_transition: f32,
    ball_in_half_since: Option<f32>,
    last_hit: Option<f32>,
    last_ball_position: Option<Vec2>,
}

impl Default for BehaviorAi {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorAi {
    pub fn new() -> Self {
        Self {
            mode: AiMode::Normal,
            last_transition: 0.0,
            ball_in_half_since: None,
            last_hit: None,
            last_ball_position: None,
        }
    }

    pub fn mode(&self) -> AiMode {
        self.mode
    }

    pub fn reset(&mut self, now: f32) {
        *self = Self::new();
        self.last_transition = now;
    }

    fn set_mode(&mut self, mode: AiMode, now: f32) {
        if self.mode != mode {
            debug!("AI mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        self.last_transition = now;
    }

    pub fn update(&mut self, world: &mut PhysicsWorld, state: &mut MatchState) {
        let body = state.opponent;
        let now = state.now;
        let Some(ai_pos) = world.position(body) else {
            return;
        };

        let Some(ball) = nearest_ball(world, state, ai_pos) else {
            if !middle_guard(world, body, ai_pos) {
                defend(world, body, ai_pos);
            }
            finish(world, body, BEHAVIOR_DAMPING);
            return;
        };

        self.track_ball_in_half(ball.position, now);
        if self.mode == AiMode::BackingOff && now - self.last_transition > BACKOFF_SECONDS {
            self.set_mode(AiMode::Normal, now);
            // Presence window restarts so pursuit actually resumes
            self.ball_in_half_since = self.ball_in_half_since.map(|_| now);
        }
        if self.mode == AiMode::Escaping && now - self.last_transition > ESCAPE_SECONDS {
            self.set_mode(AiMode::Normal, now);
        }

        let stuck = self.mode != AiMode::Escaping && ball_looks_stuck(&ball);
        if stuck {
            if self.mode == AiMode::BackingOff {
                self.set_mode(AiMode::Normal, now);
            }
            self.check_pinned_ball(world, &ball, ai_pos, now, &mut state.rng);
        }

        if !middle_guard(world, body, ai_pos) {
            match self.mode {
                AiMode::Escaping => {
                    let target = vec2(FIELD_WIDTH / 2.0, (FIELD_HEIGHT / 4.0).min(AI_SAFE_Y));
                    push_toward(world, body, ai_pos, target, 3.0);
                }
                _ if stuck => free_stuck_ball(world, body, ai_pos, ball.position),
                AiMode::BackingOff => back_off(world, body, ai_pos, ball.position),
                AiMode::Normal => pursue(world, body, ai_pos, ball.position),
            }
        }
        finish(world, body, BEHAVIOR_DAMPING);
    }

    fn track_ball_in_half(&mut self, ball_pos: Vec2, now: f32) {
        if ball_pos.y >= FIELD_HEIGHT / 2.0 {
            self.ball_in_half_since = None;
            return;
        }
        match self.ball_in_half_since {
            None => self.ball_in_half_since = Some(now),
            Some(since) => {
                if now - since > BALL_IN_HALF_SECONDS && self.mode == AiMode::Normal {
                    self.set_mode(AiMode::BackingOff, now);
                }
            }
        }
    }

    /// Repeated debounced contact with a ball that is not getting anywhere
    /// triggers an escape: the ball is shoved toward the human's goal and the
    /// AI retreats.
    fn check_pinned_ball(
        &mut self,
        world: &mut PhysicsWorld,
        ball: &BallView,
        ai_pos: Vec2,
        now: f32,
        rng: &mut impl Rng,
    ) {
        let since_hit = self.last_hit.map(|t| now - t);
        if distance(ball.position, ai_pos) < CONTACT_DISTANCE {
            if since_hit.map_or(true, |dt| dt > HIT_DEBOUNCE_SECONDS) {
                self.last_hit = Some(now);
                let barely_moved = self
                    .last_ball_position
                    .is_some_and(|p| distance(ball.position, p) < STUCK_BALL_MOVEMENT);
                if barely_moved {
                    self.set_mode(AiMode::Escaping, now);
                    let shove = vec2(rng.gen_range(-1.0..1.0) * 2.0, 1.0);
                    let dir = direction_or_random(shove, rng);
                    world.set_velocity(
                        ball.body,
                        scale(dir, ball.current_speed * ESCAPE_BALL_SPEED_FACTOR),
                    );
                }
                self.last_ball_position = Some(ball.position);
            }
        } else if since_hit.map_or(true, |dt| dt > BALL_TRACK_REFRESH_SECONDS) {
            self.last_ball_position = Some(ball.position);
        }
    }
}

/// Reactive pursuit: chase a random ball in the AI half, patrol otherwise.
#[derive(Debug, Clone)]
pub struct PursuitAi {
    patrol_target: Vec2,
    next_patrol_change: f32,
}

impl Default for PursuitAi {
    fn default() -> Self {
        Self::new()
    }
}

impl PursuitAi {
    pub fn new() -> Self {
        Self {
            patrol_target: vec2(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 4.0),
            next_patrol_change: 0.0,
        }
    }

    pub fn patrol_target(&self) -> Vec2 {
        self.patrol_target
    }

    pub fn reset(&mut self, now: f32) {
        self.next_patrol_change = now;
    }

    pub fn update(&mut self, world: &mut PhysicsWorld, state: &mut MatchState) {
        let body = state.opponent;
        let now = state.now;
        let Some(ai_pos) = world.position(body) else {
            return;
        };
        if middle_guard(world, body, ai_pos) {
            finish(world, body, PURSUIT_DAMPING);
            return;
        }

        let in_half: Vec<Vec2> = state
            .live_balls()
            .filter_map(|(_, b)| world.position(b.body))
            .filter(|p| p.y < FIELD_HEIGHT / 2.0)
            .collect();

        if in_half.is_empty() {
            if now >= self.next_patrol_change {
                self.patrol_target = random_patrol_point(&mut state.rng);
                self.next_patrol_change =
                    now + state.rng.gen_range(PATROL_MIN_SECONDS..PATROL_MAX_SECONDS);
            }
            let factor = distance_scale(ai_pos, self.patrol_target) * PATROL_FACTOR;
            push_toward(world, body, ai_pos, self.patrol_target, factor);
        } else {
            let pick = in_half[state.rng.gen_range(0..in_half.len())];
            let target = vec2(pick.x, pick.y.min(AI_SAFE_Y));
            push_toward(world, body, ai_pos, target, distance_scale(ai_pos, target));
        }
        finish(world, body, PURSUIT_DAMPING);
    }
}

fn random_patrol_point(rng: &mut impl Rng) -> Vec2 {
    let margin = HORIZONTAL_MARGIN + 20.0;
    vec2(
        rng.gen_range(margin..FIELD_WIDTH - margin),
        rng.gen_range(GOAL_HEIGHT + PLAYER_RADIUS + 20.0..AI_SAFE_Y),
    )
}

/// Proportional steering: stronger when far, capped.
fn distance_scale(from: Vec2, to: Vec2) -> f32 {
    (distance(from, to) / PURSUIT_RANGE).clamp(PURSUIT_MIN_SCALE, PURSUIT_MAX_SCALE)
}

fn nearest_ball(world: &PhysicsWorld, state: &MatchState, ai_pos: Vec2) -> Option<BallView> {
    state
        .live_balls()
        .filter_map(|(_, b)| {
            let position = world.position(b.body)?;
            let speed = world.velocity(b.body)?.length();
            Some(BallView {
                body: b.body,
                position,
                speed,
                current_speed: b.profile.current_speed,
            })
        })
        .min_by(|a, b| {
            distance(a.position, ai_pos).total_cmp(&distance(b.position, ai_pos))
        })
}

fn ball_looks_stuck(ball: &BallView) -> bool {
    let p = ball.position;
    let near_x = p.x < STUCK_CORNER_THRESHOLD || p.x > FIELD_WIDTH - STUCK_CORNER_THRESHOLD;
    let near_y = p.y < STUCK_CORNER_THRESHOLD || p.y > FIELD_HEIGHT - STUCK_CORNER_THRESHOLD;
    (near_x && near_y) || ball.speed < STUCK_BALL_SPEED
}

/// Push the AI back from the center line if it is too deep. Returns true if
/// the guard fired.
fn middle_guard(world: &mut PhysicsWorld, body: BodyHandle, ai_pos: Vec2) -> bool {
    if ai_pos.y <= AI_MAX_Y {
        return false;
    }
    push_toward(world, body, ai_pos, vec2(ai_pos.x, AI_SAFE_Y), GUARD_FACTOR);
    true
}

fn push_toward(world: &mut PhysicsWorld, body: BodyHandle, from: Vec2, to: Vec2, factor: f32) {
    if let Some(dir) = try_normalize(sub(to, from)) {
        world.apply_force(body, scale(dir, AI_FORCE * factor));
    }
}

fn defend(world: &mut PhysicsWorld, body: BodyHandle, ai_pos: Vec2) {
    let post = vec2(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 4.0);
    if distance(post, ai_pos) > PLAYER_RADIUS * 0.5 {
        push_toward(world, body, ai_pos, post, 0.5);
    }
}

fn pursue(world: &mut PhysicsWorld, body: BodyHandle, ai_pos: Vec2, ball_pos: Vec2) {
    if ball_pos.y >= FIELD_HEIGHT / 2.0 {
        defend(world, body, ai_pos);
        return;
    }
    let target = if ball_pos.y > AI_MAX_Y {
        vec2(ball_pos.x, AI_SAFE_Y)
    } else {
        ball_pos
    };
    push_toward(world, body, ai_pos, target, 1.0);
}

fn back_off(world: &mut PhysicsWorld, body: BodyHandle, ai_pos: Vec2, ball_pos: Vec2) {
    let from_ball = sub(ai_pos, ball_pos);
    if from_ball.length() > BACKOFF_FAR_DISTANCE {
        // Intercept point between the ball and the goal being defended
        let goal = top_goal_center();
        let mut anticipated = vec2((ball_pos.x + goal.x) / 2.0, (ball_pos.y + goal.y) / 2.0);
        if anticipated.y > AI_MAX_Y {
            anticipated.y = AI_SAFE_Y;
        }
        push_toward(world, body, ai_pos, anticipated, 0.7);
        return;
    }
    let Some(mut dir) = try_normalize(from_ball) else {
        return;
    };
    if ai_pos.y + dir.y > AI_MAX_Y {
        dir.y = -dir.y.abs();
    }
    push_toward(world, body, ai_pos, add(ai_pos, dir), 0.8);
}

/// Steer so the contact nudges a stuck ball back toward the middle.
fn free_stuck_ball(world: &mut PhysicsWorld, body: BodyHandle, ai_pos: Vec2, ball_pos: Vec2) {
    if distance(ball_pos, ai_pos) < CLOSE_BALL_DISTANCE {
        let target_y = if ball_pos.y < FIELD_HEIGHT / 2.0 {
            AI_MAX_Y.min(ball_pos.y)
        } else {
            FIELD_HEIGHT / 2.0
        };
        let to_center = vec2(FIELD_WIDTH / 2.0 - ball_pos.x, target_y - ball_pos.y);
        push_toward(world, body, ai_pos, add(ai_pos, to_center), 2.5);
    } else {
        let target = if ball_pos.y > AI_MAX_Y {
            vec2(ball_pos.x, AI_SAFE_Y)
        } else {
            ball_pos
        };
        push_toward(world, body, ai_pos, target, 1.5);
    }
}

/// Per-update damping and the hard speed cap.
fn finish(world: &mut PhysicsWorld, body: BodyHandle, damping: f32) {
    if let Some(v) = world.velocity(body) {
        world.set_velocity(body, clamp_length(scale(v, damping), AI_MAX_SPEED));
    }
}
