/// Which opponent controller drives the AI body for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum AiModel {
    /// Behavior-state machine: pursue, back off, escape stuck balls.
    Behavior,
    /// Reactive pursuit of a random ball in the AI half, patrol otherwise.
    Pursuit,
}

/// Per-match gameplay configuration
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    /// Number of balls on the pitch (1 or 2)
    pub ball_count: u8,
    /// Match length in clock seconds
    pub match_seconds: u32,
    /// Constant ball speed in field units per tick
    pub base_ball_speed: f32,
    /// Touches before a ball powers up
    pub power_up_touches: u32,
    /// How long the powered-up restitution bump lasts (seconds)
    pub power_up_seconds: f32,
    pub ai_model: AiModel,
    /// Renderer hint: broadcast frames at half rate
    #[serde(default)]
    pub performance_mode: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ball_count: 1,
            match_seconds: 60,
            base_ball_speed: 5.0,
            power_up_touches: 8,
            power_up_seconds: 2.0,
            ai_model: AiModel::Behavior,
            performance_mode: false,
        }
    }
}

impl MatchConfig {
    /// Two-ball variant with reactive pursuit AI.
    pub fn two_ball() -> Self {
        Self {
            ball_count: 2,
            ai_model: AiModel::Pursuit,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=2).contains(&self.ball_count) {
            return Err(format!("ball_count must be 1 or 2, got {}", self.ball_count));
        }
        if self.match_seconds == 0 {
            return Err("match_seconds must be > 0".to_string());
        }
        if !self.base_ball_speed.is_finite() || self.base_ball_speed <= 0.0 {
            return Err("base_ball_speed must be finite and > 0".to_string());
        }
        if self.power_up_touches == 0 {
            return Err("power_up_touches must be > 0".to_string());
        }
        if !self.power_up_seconds.is_finite() || self.power_up_seconds < 0.0 {
            return Err("power_up_seconds must be finite and >= 0".to_string());
        }
        Ok(())
    }
}
