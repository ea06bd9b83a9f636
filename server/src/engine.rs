//! One match from start to finish: lifecycle, fixed-step tick and the hooks
//! the game loop drives on its independent timers.
//!
//! Every tick runs in the same order:
//! 1. due timed effects
//! 2. human drag control
//! 3. physics step
//! 4. contact resolution (goals, kicks)
//! 5. stuck-ball recovery, per live ball
//! 6. speed governor, per live ball
//! 7. player boundaries, both sides
//! 8. ball containment, per live ball
//!
//! The AI and the match clock are separate entry points (`update_ai`,
//! `clock_second`) so the caller can run them on their own intervals.

use crate::ai::AiController;
use crate::ball::{contain_ball, govern_speed};
use crate::boundary::enforce_player_bounds;
use crate::clock::{ClockTick, MatchClock};
use crate::collision::resolve_contacts;
use crate::control::{apply_drag, PointerInput};
use crate::effects::TimedEffect;
use crate::field::{Field, BALL_RESTITUTION};
use crate::match_state::{MatchEvent, MatchState};
use crate::physics::PhysicsWorld;
use crate::protocol::{frame_msg, FrameMsg};
use crate::recovery::recover_ball;
use soccer_shared::config::MatchConfig;
use soccer_shared::team::{Side, Teams};
use soccer_shared::vec2::{vec2, Vec2};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Uninitialized,
    Active,
    Ended,
}

/// Terminal result of a match. `winner` is `None` for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub score: (u32, u32),
    pub winner: Option<Side>,
}

/// Strict score comparison; equal scores are a draw.
pub fn winner(score: (u32, u32)) -> Option<Side> {
    match score.0.cmp(&score.1) {
        std::cmp::Ordering::Greater => Some(Side::Player),
        std::cmp::Ordering::Less => Some(Side::Opponent),
        std::cmp::Ordering::Equal => None,
    }
}

pub struct Match {
    world: PhysicsWorld,
    field: Option<Field>,
    state: Option<MatchState>,
    ai: AiController,
    pointer: PointerInput,
    clock: MatchClock,
    phase: MatchPhase,
    tick_count: u64,
    seed: u64,
    matches_started: u64,
}

impl Match {
    pub fn new(tick_rate: f32, seed: u64) -> Self {
        let config = MatchConfig::default();
        Self {
            world: PhysicsWorld::new(tick_rate),
            field: None,
            state: None,
            ai: AiController::new(config.ai_model),
            pointer: PointerInput::default(),
            clock: MatchClock::new(config.match_seconds),
            phase: MatchPhase::Uninitialized,
            tick_count: 0,
            seed,
            matches_started: 0,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == MatchPhase::Active
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn state(&self) -> Option<&MatchState> {
        self.state.as_ref()
    }

    /// World and state together, for callers that drive components directly.
    pub fn parts_mut(&mut self) -> Option<(&mut PhysicsWorld, &mut MatchState)> {
        let state = self.state.as_mut()?;
        Some((&mut self.world, state))
    }

    pub fn ai(&self) -> &AiController {
        &self.ai
    }

    /// Start a new match, tearing down whatever was there before.
    pub fn start(&mut self, config: MatchConfig, teams: Teams) {
        self.stop();
        let seed = self.seed.wrapping_add(self.matches_started);
        self.matches_started += 1;

        self.field = Some(Field::build(&mut self.world));
        self.state = Some(MatchState::new(&mut self.world, config, teams.clone(), seed));
        self.ai = AiController::new(config.ai_model);
        self.pointer = PointerInput::default();
        self.clock = MatchClock::new(config.match_seconds);
        self.tick_count = 0;
        self.phase = MatchPhase::Active;
        info!(
            "Match started: {} vs {}, {} ball(s), {}s, {:?} AI",
            teams.player, teams.opponent, config.ball_count, config.match_seconds, config.ai_model
        );
    }

    /// Advance one fixed step. No-op unless the match is active.
    pub fn tick(&mut self) {
        if self.phase != MatchPhase::Active {
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let world = &mut self.world;

        self.tick_count += 1;
        state.now = self.tick_count as f32 / world.tick_rate();
        let now = state.now;

        for effect in state.effects.take_due(now) {
            apply_effect(world, state, &mut self.ai, effect);
        }

        apply_drag(world, state.player, &self.pointer);

        let contacts = world.step();
        if resolve_contacts(world, state, &contacts) > 0 {
            self.ai.reset(now);
        }

        let players = state.player_positions(world);
        let MatchState { balls, rng, .. } = &mut *state;
        for (slot, ball) in balls.iter_mut().enumerate() {
            let Some(ball) = ball.as_mut() else {
                continue;
            };
            if let Some(fix) =
                recover_ball(world, ball.body, &ball.profile, &mut ball.stuck, &players, now, rng)
            {
                debug!("Ball {} recovered: {:?}", slot, fix);
            }
            govern_speed(world, ball.body, &ball.profile, rng);
        }

        enforce_player_bounds(world, state.player, Side::Player);
        enforce_player_bounds(world, state.opponent, Side::Opponent);

        for (_, ball) in state.live_balls() {
            contain_ball(world, ball.body, &ball.profile);
        }
    }

    /// One AI controller update. No-op unless the match is active.
    pub fn update_ai(&mut self) {
        if self.phase != MatchPhase::Active {
            return;
        }
        if let Some(state) = self.state.as_mut() {
            self.ai.update(&mut self.world, state);
        }
    }

    /// One second of the match clock. Returns the result when this second
    /// ended the match.
    pub fn clock_second(&mut self) -> Option<MatchResult> {
        if self.phase != MatchPhase::Active {
            return None;
        }
        let state = self.state.as_mut()?;
        match self.clock.tick_second() {
            ClockTick::Idle => None,
            ClockTick::Running { seconds_left } => {
                state.time_remaining = seconds_left;
                state.events.push(MatchEvent::ClockTick { seconds_left });
                None
            }
            ClockTick::Expired => {
                state.time_remaining = 0;
                state
                    .events
                    .push(MatchEvent::ClockTick { seconds_left: 0 });
                self.end()
            }
        }
    }

    /// Stop the clock and AI, freeze every body in place and report the
    /// result. Returns `None` if no match is active.
    pub fn end(&mut self) -> Option<MatchResult> {
        if self.phase != MatchPhase::Active {
            return None;
        }
        let state = self.state.as_mut()?;
        self.clock.stop();
        self.pointer.release();
        self.phase = MatchPhase::Ended;
        state.active = false;
        state.effects.clear();

        let mut bodies = vec![state.player, state.opponent];
        bodies.extend(state.live_balls().map(|(_, b)| b.body));
        for body in bodies {
            self.world.set_velocity(body, Vec2::ZERO);
            self.world.set_angular_velocity(body, 0.0);
        }

        let result = MatchResult {
            score: state.score,
            winner: winner(state.score),
        };
        state.events.push(MatchEvent::MatchEnd {
            score: result.score,
            winner: result.winner,
        });
        info!(
            "Match ended {}-{}, winner: {:?}",
            result.score.0, result.score.1, result.winner
        );
        Some(result)
    }

    /// Tear the match down completely: pending effects dropped, every body
    /// removed. Returns true if there was anything to stop.
    pub fn stop(&mut self) -> bool {
        let had_match = self.state.is_some() || self.field.is_some();
        if let Some(mut state) = self.state.take() {
            state.teardown(&mut self.world);
        }
        if let Some(field) = self.field.take() {
            field.teardown(&mut self.world);
        }
        self.clock.stop();
        self.pointer.release();
        self.phase = MatchPhase::Uninitialized;
        if had_match {
            info!("Match stopped");
        }
        had_match
    }

    /// Human pointer input. Ignored outside an active match.
    pub fn set_pointer(&mut self, x: f32, y: f32, down: bool) {
        if self.phase == MatchPhase::Active {
            self.pointer.update(vec2(x, y), down);
        }
    }

    pub fn snapshot(&self) -> Option<FrameMsg> {
        let state = self.state.as_ref()?;
        Some(frame_msg(&self.world, state, self.tick_count))
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<MatchEvent> {
        self.state
            .as_mut()
            .map(|s| std::mem::take(&mut s.events))
            .unwrap_or_default()
    }
}

fn apply_effect(
    world: &mut PhysicsWorld,
    state: &mut MatchState,
    ai: &mut AiController,
    effect: TimedEffect,
) {
    match effect {
        TimedEffect::RestoreRestitution { slot, generation } => {
            if let Some(ball) = state.ball(slot).filter(|b| b.generation == generation) {
                world.set_restitution(ball.body, BALL_RESTITUTION);
            }
        }
        TimedEffect::Countdown { value } => {
            state.events.push(MatchEvent::Countdown { value });
        }
        TimedEffect::RespawnBalls => {
            for slot in 0..state.ball_count() {
                state.spawn_ball(world, slot);
            }
            state.scored_since_reset = 0;
            state.reset_players(world);
            ai.reset(state.now);
            state.events.push(MatchEvent::BallsRespawned);
            info!("Balls respawned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AI_MAX_SPEED, AI_MAX_Y};
    use crate::collision::POWERED_RESTITUTION_FACTOR;
    use crate::field::FIELD_HEIGHT;
    use crate::physics::{BodyRole, Contact};

    fn started(config: MatchConfig) -> Match {
        let mut m = Match::new(60.0, 42);
        m.start(config, Teams::default());
        m
    }

    fn run(m: &mut Match, ticks: usize, mut check: impl FnMut(&Match)) {
        for _ in 0..ticks {
            m.tick();
            check(m);
            m.update_ai();
        }
    }

    #[test]
    fn winner_by_strict_comparison() {
        assert_eq!(winner((2, 1)), Some(Side::Player));
        assert_eq!(winner((0, 3)), Some(Side::Opponent));
        assert_eq!(winner((1, 1)), None);
    }

    #[test]
    fn tick_before_start_does_nothing() {
        let mut m = Match::new(60.0, 1);
        m.tick();
        m.update_ai();
        assert_eq!(m.tick_count(), 0);
        assert!(m.snapshot().is_none());
        assert!(m.clock_second().is_none());
        assert_eq!(m.phase(), MatchPhase::Uninitialized);
    }

    #[test]
    fn start_builds_field_and_bodies() {
        let m = started(MatchConfig::default());
        assert_eq!(m.world().body_count(), 16 + 3);
        assert_eq!(m.phase(), MatchPhase::Active);

        let m = started(MatchConfig::two_ball());
        assert_eq!(m.world().body_count(), 16 + 4);
    }

    #[test]
    fn ball_speed_is_constant_every_tick() {
        for config in [MatchConfig::default(), MatchConfig::two_ball()] {
            let mut m = started(config);
            run(&mut m, 600, |m| {
                let state = m.state().unwrap();
                for (slot, ball) in state.live_balls() {
                    let speed = m.world().velocity(ball.body).unwrap().length();
                    assert!(
                        (speed - ball.profile.current_speed).abs() < 1e-3,
                        "ball {} speed {} at tick {}",
                        slot,
                        speed,
                        m.tick_count()
                    );
                }
            });
        }
    }

    #[test]
    fn players_stay_in_their_halves() {
        let mut m = started(MatchConfig::default());
        // Drag the human hard toward the AI goal
        m.set_pointer(160.0, 0.0, true);
        run(&mut m, 600, |m| {
            let state = m.state().unwrap();
            let player = m.world().position(state.player).unwrap();
            let opponent = m.world().position(state.opponent).unwrap();
            assert!(player.y >= FIELD_HEIGHT / 2.0, "player at {:?}", player);
            assert!(opponent.y <= AI_MAX_Y + AI_MAX_SPEED, "opponent at {:?}", opponent);
        });
    }

    #[test]
    fn restitution_restored_after_power_up_window() {
        let mut config = MatchConfig::default();
        config.power_up_seconds = 0.05;
        let mut m = started(config);
        let (world, state) = m.parts_mut().unwrap();
        let kick = Contact {
            a: BodyRole::Ball(0),
            b: BodyRole::Opponent,
        };
        for _ in 0..8 {
            resolve_contacts(world, state, &[kick]);
        }
        let body = state.ball(0).unwrap().body;
        let bumped = world.restitution(body).unwrap();
        assert!((bumped - BALL_RESTITUTION * POWERED_RESTITUTION_FACTOR).abs() < 1e-5);

        for _ in 0..5 {
            m.tick();
        }
        let restored = m.world().restitution(body).unwrap();
        assert!((restored - BALL_RESTITUTION).abs() < 1e-5);
    }

    #[test]
    fn two_ball_countdown_respawns_both_balls() {
        let mut m = started(MatchConfig::two_ball());
        let (world, state) = m.parts_mut().unwrap();
        let goals = [
            Contact {
                a: BodyRole::Ball(0),
                b: BodyRole::TopGoal,
            },
            Contact {
                a: BodyRole::BottomGoal,
                b: BodyRole::Ball(1),
            },
        ];
        resolve_contacts(world, state, &goals);
        assert_eq!(state.live_balls().count(), 0);
        m.take_events();

        // 3 s of countdown
        for _ in 0..181 {
            m.tick();
        }
        let events = m.take_events();
        let countdown: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                MatchEvent::Countdown { value } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(countdown, vec![2, 1, 0]);
        assert!(events.contains(&MatchEvent::BallsRespawned));

        let state = m.state().unwrap();
        assert_eq!(state.live_balls().count(), 2);
        assert_eq!(state.scored_since_reset, 0);
        assert_eq!(state.score, (1, 1));
    }

    #[test]
    fn clock_expiry_ends_and_freezes_match() {
        let mut config = MatchConfig::default();
        config.match_seconds = 2;
        let mut m = started(config);
        run(&mut m, 30, |_| {});

        assert!(m.clock_second().is_none());
        let result = m.clock_second().unwrap();
        assert_eq!(result, MatchResult { score: (0, 0), winner: None });
        assert_eq!(m.phase(), MatchPhase::Ended);

        let state = m.state().unwrap();
        assert!(!state.active);
        assert_eq!(state.time_remaining, 0);
        for (_, ball) in state.live_balls() {
            assert_eq!(m.world().velocity(ball.body).unwrap(), Vec2::ZERO);
        }
        let events = m.take_events();
        assert!(events.contains(&MatchEvent::MatchEnd {
            score: (0, 0),
            winner: None
        }));

        // Frozen: further ticks change nothing
        let before = m.snapshot().unwrap();
        m.tick();
        m.update_ai();
        assert_eq!(m.snapshot().unwrap().tick, before.tick);
        assert!(m.clock_second().is_none());
        assert!(m.end().is_none());
    }

    #[test]
    fn stop_removes_every_body() {
        let mut m = started(MatchConfig::two_ball());
        run(&mut m, 10, |_| {});
        assert!(m.stop());
        assert_eq!(m.world().body_count(), 0);
        assert!(m.state().is_none());
        assert!(!m.stop());

        // Restart reuses the world cleanly
        m.start(MatchConfig::default(), Teams::default());
        assert_eq!(m.world().body_count(), 16 + 3);
        assert_eq!(m.tick_count(), 0);
    }
}
