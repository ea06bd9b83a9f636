use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::MatchConfig;
use crate::team::{Side, Teams};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "match_started")]
    MatchStarted(MatchStartedMsg),
    #[serde(rename = "frame")]
    Frame(FrameMsg),
    #[serde(rename = "goal")]
    Goal(GoalMsg),
    #[serde(rename = "kick")]
    Kick(KickMsg),
    #[serde(rename = "power_up")]
    PowerUp(BallRefMsg),
    #[serde(rename = "power_up_reset")]
    PowerUpReset(BallRefMsg),
    #[serde(rename = "countdown")]
    Countdown(CountdownMsg),
    #[serde(rename = "clock")]
    Clock(ClockMsg),
    #[serde(rename = "match_end")]
    MatchEnd(MatchEndMsg),
    #[serde(rename = "match_stopped")]
    MatchStopped,
}

/// Static pitch dimensions so the renderer can lay out the field.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct FieldWire {
    pub width: f32,
    pub height: f32,
    pub goal_width: f32,
    pub player_radius: f32,
    pub ball_radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: u32,
    pub config: MatchConfig,
    pub field: FieldWire,
    pub teams: Vec<String>,
    /// True when a match is already running (spectators join mid-match)
    pub match_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MatchStartedMsg {
    pub teams: Teams,
    pub config: MatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BodyWire {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BallWire {
    pub slot: u8,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub angle: f32,
    pub powered_up: bool,
    pub touches: u32,
}

/// Per-tick snapshot of every moving body.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct FrameMsg {
    #[ts(type = "number")]
    pub tick: u64,
    pub time_remaining: u32,
    /// [player, opponent]
    pub score: [u32; 2],
    pub player: BodyWire,
    pub opponent: BodyWire,
    pub balls: Vec<BallWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GoalMsg {
    pub side: Side,
    pub score: [u32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct KickMsg {
    pub ball: u8,
    pub side: Side,
    /// Kick strength (5..=37.5), for audio volume scaling only
    pub strength: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct BallRefMsg {
    pub ball: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct CountdownMsg {
    /// 3, 2, 1, then 0 for "GO"
    pub value: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ClockMsg {
    pub seconds_left: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MatchEndMsg {
    pub score: [u32; 2],
    /// None for a draw
    pub winner: Option<Side>,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "start_match")]
    StartMatch(StartMatchMsg),
    #[serde(rename = "pointer")]
    Pointer { x: f32, y: f32, down: bool },
    #[serde(rename = "stop_match")]
    StopMatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StartMatchMsg {
    #[serde(default)]
    pub player_team: Option<String>,
    #[serde(default)]
    pub opponent_team: Option<String>,
    #[serde(default)]
    pub ball_count: Option<u8>,
}

// === Conversion helpers ===

/// Round to 2 decimal places (sub-pixel precision is plenty for rendering)
#[inline]
pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}
