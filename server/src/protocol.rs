//! Server-side half of the wire protocol: message types come from
//! `soccer_shared`, this module builds them from simulation state.

use crate::match_state::{BallSlot, MatchEvent, MatchState};
use crate::physics::{BodyHandle, PhysicsWorld};
pub use soccer_shared::protocol::*;

fn score_pair((player, opponent): (u32, u32)) -> [u32; 2] {
    [player, opponent]
}

/// Position/velocity/angle of one body. A missing body reads as all zeros.
pub fn body_wire(world: &PhysicsWorld, body: BodyHandle) -> BodyWire {
    let p = world.position(body).unwrap_or_default();
    let v = world.velocity(body).unwrap_or_default();
    BodyWire {
        x: round2(p.x),
        y: round2(p.y),
        vx: round2(v.x),
        vy: round2(v.y),
        angle: round2(world.angle(body).unwrap_or(0.0)),
    }
}

pub fn ball_wire(world: &PhysicsWorld, slot: usize, ball: &BallSlot) -> Option<BallWire> {
    let p = world.position(ball.body)?;
    let v = world.velocity(ball.body)?;
    Some(BallWire {
        slot: slot as u8,
        x: round2(p.x),
        y: round2(p.y),
        vx: round2(v.x),
        vy: round2(v.y),
        angle: round2(world.angle(ball.body).unwrap_or(0.0)),
        powered_up: ball.profile.powered_up,
        touches: ball.profile.touch_count,
    })
}

pub fn frame_msg(world: &PhysicsWorld, state: &MatchState, tick: u64) -> FrameMsg {
    FrameMsg {
        tick,
        time_remaining: state.time_remaining,
        score: score_pair(state.score),
        player: body_wire(world, state.player),
        opponent: body_wire(world, state.opponent),
        balls: state
            .live_balls()
            .filter_map(|(slot, ball)| ball_wire(world, slot, ball))
            .collect(),
    }
}

/// Wire message for a match event. Events the renderer can infer from frames
/// map to `None`.
pub fn event_msg(event: &MatchEvent) -> Option<ServerMsg> {
    let msg = match *event {
        MatchEvent::GoalScored { side, score } => ServerMsg::Goal(GoalMsg {
            side,
            score: score_pair(score),
        }),
        MatchEvent::Kick { ball, by, strength } => ServerMsg::Kick(KickMsg {
            ball: ball as u8,
            side: by,
            strength: round2(strength),
        }),
        MatchEvent::PowerUp { ball } => ServerMsg::PowerUp(BallRefMsg { ball: ball as u8 }),
        MatchEvent::PowerUpReset { ball } => {
            ServerMsg::PowerUpReset(BallRefMsg { ball: ball as u8 })
        }
        MatchEvent::Countdown { value } => ServerMsg::Countdown(CountdownMsg { value }),
        MatchEvent::ClockTick { seconds_left } => ServerMsg::Clock(ClockMsg { seconds_left }),
        MatchEvent::MatchEnd { score, winner } => ServerMsg::MatchEnd(MatchEndMsg {
            score: score_pair(score),
            winner,
        }),
        MatchEvent::BallsRespawned => return None,
    };
    Some(msg)
}
