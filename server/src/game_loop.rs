use crate::config::ServerConfig;
use crate::engine::Match;
use crate::field;
use crate::protocol::{
    event_msg, FrameMsg, MatchStartedMsg, ServerMsg, WelcomeMsg, PROTOCOL_VERSION,
};
use soccer_shared::team::{Teams, TEAM_LABELS};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

/// Commands from client connections to the game loop
pub enum GameCommand {
    Join {
        response: oneshot::Sender<(u32, WelcomeMsg)>,
    },
    Leave {
        id: u32,
    },
    StartMatch {
        player_team: Option<String>,
        opponent_team: Option<String>,
        ball_count: Option<u8>,
    },
    Pointer {
        x: f32,
        y: f32,
        down: bool,
    },
    StopMatch,
}

/// Broadcasts from game loop to all clients
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    MatchStarted(MatchStartedMsg),
    Frame(FrameMsg),
    /// Discrete match event, already in wire form
    Event(ServerMsg),
    MatchStopped,
}

impl GameBroadcast {
    pub fn into_server_msg(self) -> ServerMsg {
        match self {
            GameBroadcast::MatchStarted(msg) => ServerMsg::MatchStarted(msg),
            GameBroadcast::Frame(msg) => ServerMsg::Frame(msg),
            GameBroadcast::Event(msg) => msg,
            GameBroadcast::MatchStopped => ServerMsg::MatchStopped,
        }
    }
}

/// Run the main game loop. Owns the match and every body in it.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    server_config: ServerConfig,
) {
    let mut engine = Match::new(server_config.tick_rate_hz as f32, server_config.rng_seed);
    let mut match_config = server_config.match_config;
    let mut clients: HashSet<u32> = HashSet::new();
    let mut next_client_id: u32 = 1;

    let tick_duration = Duration::from_secs_f64(1.0 / server_config.tick_rate_hz as f64);
    let clock_period = Duration::from_secs(1);
    let broadcast_every_n = server_config.broadcast_every_n();

    let mut tick_interval = interval(tick_duration);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ai_interval = interval(Duration::from_millis(server_config.ai_interval_ms));
    ai_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut clock_interval = interval_at(Instant::now() + clock_period, clock_period);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                if !engine.is_active() {
                    continue;
                }
                engine.tick();
                flush_events(&mut engine, &broadcast_tx);

                if engine.tick_count() % broadcast_every_n == 0 {
                    if let Some(frame) = engine.snapshot() {
                        let _ = broadcast_tx.send(GameBroadcast::Frame(frame));
                    }
                }
            }

            _ = ai_interval.tick() => {
                engine.update_ai();
            }

            _ = clock_interval.tick() => {
                if let Some(result) = engine.clock_second() {
                    tracing::info!(
                        "Match over: {}-{} ({:?})",
                        result.score.0,
                        result.score.1,
                        result.winner
                    );
                    // Final resting positions
                    if let Some(frame) = engine.snapshot() {
                        let _ = broadcast_tx.send(GameBroadcast::Frame(frame));
                    }
                }
                flush_events(&mut engine, &broadcast_tx);
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    GameCommand::Join { response } => {
                        let id = next_client_id;
                        next_client_id += 1;
                        clients.insert(id);
                        let welcome = WelcomeMsg {
                            protocol_version: PROTOCOL_VERSION,
                            server_version: env!("CARGO_PKG_VERSION").to_string(),
                            self_id: id,
                            config: match_config,
                            field: field::wire(),
                            teams: TEAM_LABELS.iter().map(|t| t.to_string()).collect(),
                            match_active: engine.is_active(),
                        };
                        let _ = response.send((id, welcome));
                    }
                    GameCommand::Leave { id } => {
                        clients.remove(&id);
                        tracing::info!("Client {} left", id);
                        if clients.is_empty() && engine.stop() {
                            tracing::info!("Last client gone, match stopped");
                        }
                    }
                    GameCommand::StartMatch { player_team, opponent_team, ball_count } => {
                        let mut config = server_config.match_config;
                        if let Some(n) = ball_count {
                            config.ball_count = n;
                        }
                        if let Err(e) = config.validate() {
                            tracing::warn!("Rejected start_match: {}", e);
                            continue;
                        }
                        let teams = Teams::resolve(player_team.as_deref(), opponent_team.as_deref());
                        engine.start(config, teams.clone());
                        match_config = config;
                        clock_interval.reset();
                        let _ = broadcast_tx.send(GameBroadcast::MatchStarted(MatchStartedMsg {
                            teams,
                            config,
                        }));
                    }
                    GameCommand::Pointer { x, y, down } => {
                        if x.is_finite() && y.is_finite() {
                            engine.set_pointer(x, y, down);
                        }
                    }
                    GameCommand::StopMatch => {
                        if engine.stop() {
                            let _ = broadcast_tx.send(GameBroadcast::MatchStopped);
                        }
                    }
                }
            }

            else => break,
        }
    }

    engine.stop();
    tracing::info!("Game loop ended");
}

fn flush_events(engine: &mut Match, broadcast_tx: &broadcast::Sender<GameBroadcast>) {
    for event in engine.take_events() {
        if let Some(msg) = event_msg(&event) {
            let _ = broadcast_tx.send(GameBroadcast::Event(msg));
        }
    }
}
