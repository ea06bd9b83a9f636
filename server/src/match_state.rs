//! Mutable state of one match: bodies by role, scores, per-ball bookkeeping.
//!
//! Component functions take the `PhysicsWorld` and a `&mut MatchState`
//! explicitly; nothing is reached through globals.

use crate::ball::{random_direction, KineticProfile};
use crate::effects::{Scheduler, TimedEffect};
use crate::field::{
    ball_spawn_point, BALL_AIR_FRICTION, BALL_MASS, BALL_RADIUS, BALL_RESTITUTION,
    OPPONENT_START, PLAYER_AIR_FRICTION, PLAYER_MASS, PLAYER_RADIUS, PLAYER_RESTITUTION,
    PLAYER_START,
};
use crate::physics::{BodyDesc, BodyHandle, BodyRole, Layer, PhysicsWorld};
use crate::recovery::StuckTimer;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use soccer_shared::config::MatchConfig;
use soccer_shared::team::{Side, Teams};
use soccer_shared::vec2::{scale, Vec2};

/// Discrete things that happened during a tick, for the visual layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    GoalScored { side: Side, score: (u32, u32) },
    Kick { ball: usize, by: Side, strength: f32 },
    PowerUp { ball: usize },
    PowerUpReset { ball: usize },
    /// 3, 2, 1, then 0 for GO
    Countdown { value: u8 },
    BallsRespawned,
    ClockTick { seconds_left: u32 },
    MatchEnd { score: (u32, u32), winner: Option<Side> },
}

/// A live ball and everything tracked for it.
#[derive(Debug, Clone, Copy)]
pub struct BallSlot {
    pub body: BodyHandle,
    pub profile: KineticProfile,
    pub stuck: StuckTimer,
    /// Bumped every time the slot's body is recreated
    pub generation: u32,
}

pub struct MatchState {
    pub config: MatchConfig,
    pub teams: Teams,
    pub player: BodyHandle,
    pub opponent: BodyHandle,
    /// `None` while a ball is out of play (two-ball mode after a goal)
    pub balls: Vec<Option<BallSlot>>,
    /// Goal debounce: set when a ball scores, cleared when it is reset
    pub scored: Vec<bool>,
    /// Balls scored since the last respawn (two-ball mode)
    pub scored_since_reset: usize,
    pub score: (u32, u32),
    pub time_remaining: u32,
    pub active: bool,
    pub rng: ChaCha8Rng,
    pub effects: Scheduler,
    pub events: Vec<MatchEvent>,
    /// Logical match time in seconds
    pub now: f32,
    next_generation: u32,
}

impl MatchState {
    /// Spawn both players and every ball for a new match.
    pub fn new(world: &mut PhysicsWorld, config: MatchConfig, teams: Teams, seed: u64) -> Self {
        let player = world.spawn(player_desc(BodyRole::Player, PLAYER_START));
        let opponent = world.spawn(player_desc(BodyRole::Opponent, OPPONENT_START));
        let ball_count = config.ball_count as usize;

        let mut state = Self {
            config,
            teams,
            player,
            opponent,
            balls: vec![None; ball_count],
            scored: vec![false; ball_count],
            scored_since_reset: 0,
            score: (0, 0),
            time_remaining: config.match_seconds,
            active: true,
            rng: ChaCha8Rng::seed_from_u64(seed),
            effects: Scheduler::new(),
            events: Vec::new(),
            now: 0.0,
            next_generation: 0,
        };
        for slot in 0..ball_count {
            state.spawn_ball(world, slot);
        }
        state
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn ball(&self, slot: usize) -> Option<&BallSlot> {
        self.balls.get(slot).and_then(|b| b.as_ref())
    }

    pub fn ball_mut(&mut self, slot: usize) -> Option<&mut BallSlot> {
        self.balls.get_mut(slot).and_then(|b| b.as_mut())
    }

    /// `(slot, ball)` for every ball currently in play.
    pub fn live_balls(&self) -> impl Iterator<Item = (usize, &BallSlot)> {
        self.balls
            .iter()
            .enumerate()
            .filter_map(|(slot, b)| b.as_ref().map(|b| (slot, b)))
    }

    pub fn player_body(&self, side: Side) -> BodyHandle {
        match side {
            Side::Player => self.player,
            Side::Opponent => self.opponent,
        }
    }

    pub fn player_positions(&self, world: &PhysicsWorld) -> Vec<Vec2> {
        [self.player, self.opponent]
            .iter()
            .filter_map(|h| world.position(*h))
            .collect()
    }

    /// Create (or recreate) the ball in `slot` at its spawn point, moving in a
    /// random direction at base speed.
    pub fn spawn_ball(&mut self, world: &mut PhysicsWorld, slot: usize) {
        if slot >= self.balls.len() {
            return;
        }
        self.remove_ball(world, slot);

        let position = ball_spawn_point(slot, self.balls.len());
        let profile = KineticProfile::new(self.config.base_ball_speed, self.config.power_up_touches);
        let velocity = scale(random_direction(&mut self.rng), profile.base_speed);
        let body = world.spawn(
            BodyDesc::circle(BodyRole::Ball(slot), Layer::Ball, position, BALL_RADIUS)
                .mass(BALL_MASS)
                .restitution(BALL_RESTITUTION)
                .air_friction(BALL_AIR_FRICTION)
                .velocity(velocity),
        );
        self.next_generation += 1;
        self.balls[slot] = Some(BallSlot {
            body,
            profile,
            stuck: StuckTimer::new(position, self.now),
            generation: self.next_generation,
        });
        self.scored[slot] = false;
    }

    /// Take a ball out of play. Pending effects for it are cancelled and a
    /// powered-up ball reports its reset.
    pub fn remove_ball(&mut self, world: &mut PhysicsWorld, slot: usize) -> bool {
        let Some(ball) = self.balls.get_mut(slot).and_then(|b| b.take()) else {
            return false;
        };
        world.despawn(ball.body);
        if ball.profile.powered_up {
            self.events.push(MatchEvent::PowerUpReset { ball: slot });
        }
        self.effects.cancel_where(
            |e| matches!(e, TimedEffect::RestoreRestitution { slot: s, .. } if *s == slot),
        );
        true
    }

    /// Put both players back on their start spots at rest.
    pub fn reset_players(&mut self, world: &mut PhysicsWorld) {
        for (body, start) in [(self.player, PLAYER_START), (self.opponent, OPPONENT_START)] {
            world.set_position(body, start);
            world.set_velocity(body, Vec2::ZERO);
            world.set_angular_velocity(body, 0.0);
        }
    }

    /// Remove every body this state owns and drop pending effects.
    pub fn teardown(&mut self, world: &mut PhysicsWorld) {
        for slot in 0..self.balls.len() {
            self.remove_ball(world, slot);
        }
        world.despawn(self.player);
        world.despawn(self.opponent);
        self.effects.clear();
        self.active = false;
    }
}

fn player_desc(role: BodyRole, position: Vec2) -> BodyDesc {
    BodyDesc::circle(role, Layer::Player, position, PLAYER_RADIUS)
        .mass(PLAYER_MASS)
        .restitution(PLAYER_RESTITUTION)
        .air_friction(PLAYER_AIR_FRICTION)
}
