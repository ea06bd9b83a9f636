//! Turns the contact pairs from one physics step into goals and kicks.

use crate::ball::{direction_or_random, random_direction};
use crate::effects::TimedEffect;
use crate::field::{center, BALL_RESTITUTION};
use crate::match_state::{MatchEvent, MatchState};
use crate::physics::{BodyRole, Contact, PhysicsWorld};
use soccer_shared::team::Side;
use soccer_shared::vec2::{scale, sub, Vec2};
use tracing::{debug, info};

pub const KICK_BASE_STRENGTH: f32 = 5.0;
pub const KICK_MAX_STRENGTH: f32 = 25.0;
pub const KICK_SPEED_FACTOR: f32 = 1.5;
pub const POWERED_KICK_FACTOR: f32 = 1.5;
pub const POWERED_RESTITUTION_FACTOR: f32 = 1.3;
/// First value of the two-ball respawn countdown
pub const COUNTDOWN_FROM: u8 = 3;

/// Kick strength for audio volume. Never applied to the ball's velocity.
pub fn kick_strength(player_speed: f32, powered_up: bool) -> f32 {
    let strength = (KICK_BASE_STRENGTH + player_speed * KICK_SPEED_FACTOR).min(KICK_MAX_STRENGTH);
    if powered_up {
        strength * POWERED_KICK_FACTOR
    } else {
        strength
    }
}

/// Handle every contact that started this step. Returns the number of goals
/// scored.
pub fn resolve_contacts(
    world: &mut PhysicsWorld,
    state: &mut MatchState,
    contacts: &[Contact],
) -> usize {
    // A ball still in play has been reset since it last scored
    for slot in 0..state.balls.len() {
        if state.balls[slot].is_some() {
            state.scored[slot] = false;
        }
    }

    // Slots recentered or removed by a goal this step. Later pairs for them
    // describe the ball before the reset and are dropped.
    let mut reset_slots: Vec<usize> = Vec::new();
    for contact in contacts {
        let Some((ball, other)) = contact.split(|r| r.ball_slot().is_some()) else {
            continue;
        };
        let Some(slot) = ball.ball_slot() else {
            continue;
        };
        if reset_slots.contains(&slot) {
            continue;
        }
        let scored = match other {
            BodyRole::TopGoal => score_goal(world, state, slot, Side::Player),
            BodyRole::BottomGoal => score_goal(world, state, slot, Side::Opponent),
            BodyRole::Player => {
                kick(world, state, slot, Side::Player);
                false
            }
            BodyRole::Opponent => {
                kick(world, state, slot, Side::Opponent);
                false
            }
            _ => false,
        };
        if scored {
            reset_slots.push(slot);
        }
    }
    reset_slots.len()
}

fn score_goal(world: &mut PhysicsWorld, state: &mut MatchState, slot: usize, scorer: Side) -> bool {
    if state.ball(slot).is_none() || state.scored.get(slot).copied().unwrap_or(true) {
        return false;
    }
    state.scored[slot] = true;
    match scorer {
        Side::Player => state.score.0 += 1,
        Side::Opponent => state.score.1 += 1,
    }
    info!(
        "Goal for {:?} with ball {} ({}-{})",
        scorer, slot, state.score.0, state.score.1
    );
    state.events.push(MatchEvent::GoalScored {
        side: scorer,
        score: state.score,
    });

    if state.ball_count() == 1 {
        recenter_ball(world, state, slot);
        state.reset_players(world);
    } else {
        state.remove_ball(world, slot);
        state.scored_since_reset += 1;
        if state.scored_since_reset >= state.ball_count() {
            start_countdown(state);
        }
    }
    true
}

/// Single-ball reset: back to center at base speed with a clean profile.
fn recenter_ball(world: &mut PhysicsWorld, state: &mut MatchState, slot: usize) {
    let direction = random_direction(&mut state.rng);
    let now = state.now;
    let Some(ball) = state.ball_mut(slot) else {
        return;
    };
    let was_powered = ball.profile.reset();
    ball.stuck.reset(center(), now);
    let body = ball.body;
    let speed = ball.profile.base_speed;

    world.set_position(body, center());
    world.set_velocity(body, scale(direction, speed));
    world.set_angular_velocity(body, 0.0);
    world.set_restitution(body, BALL_RESTITUTION);
    state.effects.cancel_where(
        |e| matches!(e, TimedEffect::RestoreRestitution { slot: s, .. } if *s == slot),
    );
    if was_powered {
        state.events.push(MatchEvent::PowerUpReset { ball: slot });
    }
}

fn start_countdown(state: &mut MatchState) {
    info!("All balls scored, respawning after countdown");
    state.events.push(MatchEvent::Countdown {
        value: COUNTDOWN_FROM,
    });
    for step in 1..=COUNTDOWN_FROM {
        state.effects.schedule(
            state.now + f32::from(step),
            TimedEffect::Countdown {
                value: COUNTDOWN_FROM - step,
            },
        );
    }
    state
        .effects
        .schedule(state.now + f32::from(COUNTDOWN_FROM), TimedEffect::RespawnBalls);
}

fn kick(world: &mut PhysicsWorld, state: &mut MatchState, slot: usize, by: Side) {
    let Some(ball) = state.ball(slot).copied() else {
        return;
    };
    let player = state.player_body(by);
    let (Some(ball_pos), Some(player_pos)) = (world.position(ball.body), world.position(player))
    else {
        return;
    };
    let player_speed = world.velocity(player).map(Vec2::length).unwrap_or(0.0);
    let direction = direction_or_random(sub(ball_pos, player_pos), &mut state.rng);

    let Some(slot_state) = state.ball_mut(slot) else {
        return;
    };
    let powered_now = slot_state.profile.register_touch();
    let profile = slot_state.profile;
    let generation = slot_state.generation;

    if powered_now {
        info!("Ball {} powered up after {} touches", slot, profile.touch_count);
        state.events.push(MatchEvent::PowerUp { ball: slot });
    }

    if profile.powered_up {
        world.set_restitution(ball.body, BALL_RESTITUTION * POWERED_RESTITUTION_FACTOR);
        state.effects.cancel_where(
            |e| matches!(e, TimedEffect::RestoreRestitution { slot: s, .. } if *s == slot),
        );
        state.effects.schedule(
            state.now + state.config.power_up_seconds,
            TimedEffect::RestoreRestitution { slot, generation },
        );
    }

    world.set_velocity(ball.body, scale(direction, profile.current_speed));
    world.set_angular_velocity(ball.body, 0.0);

    let strength = kick_strength(player_speed, profile.powered_up);
    debug!("Kick by {:?} on ball {} (strength {:.1})", by, slot, strength);
    state.events.push(MatchEvent::Kick {
        ball: slot,
        by,
        strength,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::PLAYER_START;
    use soccer_shared::config::MatchConfig;
    use soccer_shared::team::Teams;
    use soccer_shared::vec2::vec2;

    fn new_state(config: MatchConfig) -> (PhysicsWorld, MatchState) {
        let mut world = PhysicsWorld::new(60.0);
        let state = MatchState::new(&mut world, config, Teams::default(), 7);
        (world, state)
    }

    fn goal(slot: usize, role: BodyRole) -> Contact {
        Contact {
            a: BodyRole::Ball(slot),
            b: role,
        }
    }

    #[test]
    fn kick_strength_is_capped_and_boosted() {
        assert_eq!(kick_strength(0.0, false), 5.0);
        assert_eq!(kick_strength(100.0, false), 25.0);
        assert_eq!(kick_strength(100.0, true), 37.5);
    }

    #[test]
    fn duplicate_goal_contact_scores_once() {
        let (mut world, mut state) = new_state(MatchConfig::default());
        let contacts = [
            goal(0, BodyRole::TopGoal),
            Contact {
                a: BodyRole::TopGoal,
                b: BodyRole::Ball(0),
            },
        ];
        let goals = resolve_contacts(&mut world, &mut state, &contacts);
        assert_eq!(goals, 1);
        assert_eq!(state.score, (1, 0));
    }

    #[test]
    fn bottom_goal_scores_for_opponent() {
        let (mut world, mut state) = new_state(MatchConfig::default());
        resolve_contacts(&mut world, &mut state, &[goal(0, BodyRole::BottomGoal)]);
        assert_eq!(state.score, (0, 1));
        assert!(matches!(
            state.events.last(),
            Some(MatchEvent::GoalScored {
                side: Side::Opponent,
                score: (0, 1)
            })
        ));
    }

    #[test]
    fn single_ball_goal_recenters_and_resets_power() {
        let (mut world, mut state) = new_state(MatchConfig::default());
        for _ in 0..8 {
            state.ball_mut(0).unwrap().profile.register_touch();
        }
        assert!(state.ball(0).unwrap().profile.powered_up);
        world.set_position(state.player, vec2(100.0, 400.0));

        resolve_contacts(&mut world, &mut state, &[goal(0, BodyRole::TopGoal)]);

        let ball = *state.ball(0).unwrap();
        assert!(!ball.profile.powered_up);
        assert_eq!(ball.profile.touch_count, 0);
        assert_eq!(ball.profile.current_speed, ball.profile.base_speed);
        assert_eq!(world.position(ball.body).unwrap(), center());
        let speed = world.velocity(ball.body).unwrap().length();
        assert!((speed - ball.profile.base_speed).abs() < 1e-3);
        assert_eq!(world.position(state.player).unwrap(), PLAYER_START);
        assert!(state
            .events
            .contains(&MatchEvent::PowerUpReset { ball: 0 }));
    }

    #[test]
    fn kick_sets_direction_away_from_player_at_constant_speed() {
        let (mut world, mut state) = new_state(MatchConfig::default());
        let body = state.ball(0).unwrap().body;
        world.set_position(state.player, vec2(160.0, 260.0));
        world.set_position(body, vec2(160.0, 220.0));

        resolve_contacts(
            &mut world,
            &mut state,
            &[Contact {
                a: BodyRole::Player,
                b: BodyRole::Ball(0),
            }],
        );

        let v = world.velocity(body).unwrap();
        assert!((v.length() - 5.0).abs() < 1e-3);
        assert!(v.y < -4.99, "ball should head straight up, v = {:?}", v);
        assert_eq!(state.ball(0).unwrap().profile.touch_count, 1);
    }

    #[test]
    fn eighth_kick_powers_up_and_schedules_restitution_restore() {
        let (mut world, mut state) = new_state(MatchConfig::default());
        let kick = Contact {
            a: BodyRole::Ball(0),
            b: BodyRole::Opponent,
        };
        for _ in 0..8 {
            resolve_contacts(&mut world, &mut state, &[kick]);
        }
        let ball = *state.ball(0).unwrap();
        assert!(ball.profile.powered_up);
        assert_eq!(ball.profile.current_speed, 10.0);
        assert!(state.events.contains(&MatchEvent::PowerUp { ball: 0 }));
        let restitution = world.restitution(ball.body).unwrap();
        assert!((restitution - BALL_RESTITUTION * POWERED_RESTITUTION_FACTOR).abs() < 1e-5);
        assert_eq!(state.effects.len(), 1);
    }

    #[test]
    fn two_ball_mode_removes_scored_ball_and_counts_down() {
        let (mut world, mut state) = new_state(MatchConfig::two_ball());
        resolve_contacts(&mut world, &mut state, &[goal(0, BodyRole::TopGoal)]);
        assert!(state.ball(0).is_none());
        assert!(state.ball(1).is_some());
        assert!(!state.events.contains(&MatchEvent::Countdown { value: 3 }));

        // Late contact for the removed ball is ignored
        resolve_contacts(&mut world, &mut state, &[goal(0, BodyRole::TopGoal)]);
        assert_eq!(state.score, (1, 0));

        resolve_contacts(&mut world, &mut state, &[goal(1, BodyRole::BottomGoal)]);
        assert_eq!(state.score, (1, 1));
        assert_eq!(state.live_balls().count(), 0);
        assert!(state.events.contains(&MatchEvent::Countdown { value: 3 }));
        // 2, 1, GO and the respawn
        assert_eq!(state.effects.len(), 4);
    }

    #[test]
    fn kick_in_the_same_step_as_a_goal_is_dropped() {
        let (mut world, mut state) = new_state(MatchConfig::default());
        for _ in 0..8 {
            state.ball_mut(0).unwrap().profile.register_touch();
        }
        let contacts = [
            goal(0, BodyRole::TopGoal),
            Contact {
                a: BodyRole::Opponent,
                b: BodyRole::Ball(0),
            },
        ];
        let goals = resolve_contacts(&mut world, &mut state, &contacts);
        assert_eq!(goals, 1);

        let ball = *state.ball(0).unwrap();
        assert_eq!(ball.profile.touch_count, 0);
        assert!(!ball.profile.powered_up);
        assert_eq!(world.position(ball.body).unwrap(), center());
        assert!(!state
            .events
            .iter()
            .any(|e| matches!(e, MatchEvent::Kick { .. })));
    }

    #[test]
    fn powered_ball_scoring_in_two_ball_mode_reports_reset() {
        let (mut world, mut state) = new_state(MatchConfig::two_ball());
        for _ in 0..8 {
            state.ball_mut(0).unwrap().profile.register_touch();
        }
        resolve_contacts(&mut world, &mut state, &[goal(0, BodyRole::TopGoal)]);
        assert!(state.ball(0).is_none());
        assert!(state
            .events
            .contains(&MatchEvent::PowerUpReset { ball: 0 }));
    }

    #[test]
    fn contacts_without_a_ball_are_ignored() {
        let (mut world, mut state) = new_state(MatchConfig::default());
        let goals = resolve_contacts(
            &mut world,
            &mut state,
            &[Contact {
                a: BodyRole::Player,
                b: BodyRole::Wall,
            }],
        );
        assert_eq!(goals, 0);
        assert!(state.events.is_empty());
    }
}
