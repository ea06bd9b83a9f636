//! Sides of the pitch and the team labels a match is played under.
//!
//! Team labels are opaque: they are chosen once at match start and echoed back
//! to the renderer, but never influence the simulation.

/// The two sides of a match. `Player` defends the bottom goal and scores in
/// the top goal; `Opponent` is the AI and defends the top goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Opponent,
}

/// Known flag labels the renderer ships artwork for.
pub const TEAM_LABELS: [&str; 16] = [
    "argentina",
    "belgium",
    "brazil",
    "egypt",
    "china",
    "france",
    "germany",
    "italy",
    "japan",
    "poland",
    "portugal",
    "england",
    "spain",
    "united-kingdom",
    "saudi-arabia",
    "qatar",
];

pub const DEFAULT_PLAYER_TEAM: &str = "argentina";
pub const DEFAULT_OPPONENT_TEAM: &str = "brazil";

/// Resolve a requested label, falling back to the side's default when the
/// label is unknown. Matching ignores case and surrounding whitespace.
pub fn resolve_team(requested: Option<&str>, side: Side) -> &'static str {
    let fallback = match side {
        Side::Player => DEFAULT_PLAYER_TEAM,
        Side::Opponent => DEFAULT_OPPONENT_TEAM,
    };
    let Some(requested) = requested else {
        return fallback;
    };
    let wanted = requested.trim().to_ascii_lowercase();
    TEAM_LABELS
        .iter()
        .copied()
        .find(|label| *label == wanted)
        .unwrap_or(fallback)
}

/// Team labels for both sides of a match.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct Teams {
    pub player: String,
    pub opponent: String,
}

impl Teams {
    pub fn resolve(player: Option<&str>, opponent: Option<&str>) -> Self {
        Self {
            player: resolve_team(player, Side::Player).to_string(),
            opponent: resolve_team(opponent, Side::Opponent).to_string(),
        }
    }
}

impl Default for Teams {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_label_is_kept() {
        assert_eq!(resolve_team(Some("Japan "), Side::Player), "japan");
    }

    #[test]
    fn unknown_label_falls_back_per_side() {
        assert_eq!(resolve_team(Some("atlantis"), Side::Player), "argentina");
        assert_eq!(resolve_team(Some(""), Side::Opponent), "brazil");
        assert_eq!(resolve_team(None, Side::Opponent), "brazil");
    }

    #[test]
    fn same_team_on_both_sides_is_allowed() {
        let teams = Teams::resolve(Some("qatar"), Some("qatar"));
        assert_eq!(teams.player, "qatar");
        assert_eq!(teams.opponent, "qatar");
    }
}
