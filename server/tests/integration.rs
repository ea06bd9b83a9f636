//! Integration tests for the soccer server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// Re-create minimal protocol types for testing
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[allow(dead_code)]
enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome {
        #[serde(rename = "protocolVersion")]
        protocol_version: u32,
        #[serde(rename = "selfId")]
        self_id: u32,
        #[serde(rename = "matchActive")]
        match_active: bool,
        teams: Vec<String>,
        field: serde_json::Value,
        config: serde_json::Value,
    },
    #[serde(rename = "match_started")]
    MatchStarted {
        teams: serde_json::Value,
        config: serde_json::Value,
    },
    #[serde(rename = "frame")]
    Frame {
        tick: u64,
        #[serde(rename = "timeRemaining")]
        time_remaining: u32,
        score: [u32; 2],
        player: serde_json::Value,
        opponent: serde_json::Value,
        balls: Vec<serde_json::Value>,
    },
    #[serde(rename = "goal")]
    Goal {
        side: String,
        score: [u32; 2],
    },
    #[serde(rename = "kick")]
    Kick {
        ball: u8,
        side: String,
        strength: f32,
    },
    #[serde(rename = "power_up")]
    PowerUp { ball: u8 },
    #[serde(rename = "power_up_reset")]
    PowerUpReset { ball: u8 },
    #[serde(rename = "countdown")]
    Countdown { value: u8 },
    #[serde(rename = "clock")]
    Clock {
        #[serde(rename = "secondsLeft")]
        seconds_left: u32,
    },
    #[serde(rename = "match_end")]
    MatchEnd {
        score: [u32; 2],
        winner: Option<String>,
    },
    #[serde(rename = "match_stopped")]
    MatchStopped,
}

type Ws = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Start a test server on a random available port and return the WebSocket URL.
async fn start_test_server(match_seconds: u32) -> String {
    use soccer_server::config::ServerConfig;
    use soccer_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
    use soccer_server::ws::AppState;

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener); // Release the port so the server can bind to it

    let mut config = ServerConfig {
        listen_addr: addr.to_string(),
        broadcast_rate_hz: 10,
        rng_seed: 12345,
        ..ServerConfig::default()
    };
    config.match_config.match_seconds = match_seconds;

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(256);

    let app_state = AppState {
        game_tx,
        broadcast_tx: broadcast_tx.clone(),
    };

    // Start game loop
    let game_config = config.clone();
    tokio::spawn(async move {
        run_game_loop(game_rx, broadcast_tx, game_config).await;
    });

    // Start HTTP/WebSocket server
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(soccer_server::ws::ws_handler))
        .with_state(app_state);

    tokio::spawn(async move {
        let listener = TcpListener::bind(&config.listen_addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("ws://{}/ws", addr)
}

/// Connect to the server and return the WebSocket stream.
async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

/// Read the next text message and parse as ServerMsg.
async fn recv_msg(ws: &mut Ws) -> ServerMsg {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

/// Read the next text message with a timeout.
async fn recv_msg_timeout(ws: &mut Ws, timeout: Duration) -> Option<ServerMsg> {
    tokio::time::timeout(timeout, recv_msg(ws)).await.ok()
}

/// Skip messages until one matches `pred`, giving up after `timeout`.
async fn recv_until(
    ws: &mut Ws,
    timeout: Duration,
    pred: impl Fn(&ServerMsg) -> bool,
) -> Option<ServerMsg> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(tokio::time::Instant::now());
        let msg = recv_msg_timeout(ws, left).await?;
        if pred(&msg) {
            return Some(msg);
        }
    }
}

async fn send_json(ws: &mut Ws, json: &str) {
    ws.send(Message::Text(json.to_string().into()))
        .await
        .expect("Failed to send");
}

/// Wait until the server closes the connection.
async fn expect_disconnect(ws: &mut Ws) -> bool {
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        match tokio::time::timeout(Duration::from_millis(100), ws.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => return true,
            Err(_) => {
                // Timeout - try sending to check if connection is dead
                if ws.send(Message::Ping(vec![].into())).await.is_err() {
                    return true;
                }
            }
            _ => continue,
        }
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connect_and_receive_welcome() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;

    match recv_msg(&mut ws).await {
        ServerMsg::Welcome {
            protocol_version,
            self_id,
            match_active,
            teams,
            field,
            ..
        } => {
            assert_eq!(protocol_version, 1);
            assert!(self_id > 0);
            assert!(!match_active);
            assert_eq!(teams.len(), 16);
            assert_eq!(field["width"], 320.0);
            assert_eq!(field["height"], 420.0);
        }
        other => panic!("Expected Welcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_multiple_clients_get_unique_ids() {
    let url = start_test_server(60).await;
    let mut ws1 = connect(&url).await;
    let mut ws2 = connect(&url).await;

    let id1 = match recv_msg(&mut ws1).await {
        ServerMsg::Welcome { self_id, .. } => self_id,
        other => panic!("Expected Welcome, got {:?}", other),
    };
    let id2 = match recv_msg(&mut ws2).await {
        ServerMsg::Welcome { self_id, .. } => self_id,
        other => panic!("Expected Welcome, got {:?}", other),
    };
    assert_ne!(id1, id2);
}

#[tokio::test]
async fn test_start_match_streams_frames() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    send_json(
        &mut ws,
        r#"{"type":"start_match","playerTeam":"japan","opponentTeam":"atlantis"}"#,
    )
    .await;

    match recv_msg_timeout(&mut ws, Duration::from_secs(2)).await {
        Some(ServerMsg::MatchStarted { teams, config }) => {
            assert_eq!(teams["player"], "japan");
            assert_eq!(teams["opponent"], "brazil");
            assert_eq!(config["ballCount"], 1);
        }
        other => panic!("Expected MatchStarted, got {:?}", other),
    }

    let frame = recv_until(&mut ws, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::Frame { .. })
    })
    .await;
    match frame {
        Some(ServerMsg::Frame {
            tick,
            time_remaining,
            balls,
            player,
            opponent,
            ..
        }) => {
            assert!(tick > 0);
            assert_eq!(time_remaining, 60);
            assert_eq!(balls.len(), 1);
            assert!(player["y"].as_f64().unwrap() >= 210.0);
            assert!(opponent["y"].as_f64().unwrap() <= 210.0);
        }
        other => panic!("Expected Frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_two_ball_match_sends_both_balls() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    send_json(&mut ws, r#"{"type":"start_match","ballCount":2}"#).await;
    let frame = recv_until(&mut ws, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::Frame { .. })
    })
    .await;
    match frame {
        Some(ServerMsg::Frame { balls, .. }) => assert_eq!(balls.len(), 2),
        other => panic!("Expected Frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_ball_count_is_rejected() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    send_json(&mut ws, r#"{"type":"start_match","ballCount":5}"#).await;
    let started = recv_until(&mut ws, Duration::from_millis(500), |m| {
        matches!(m, ServerMsg::MatchStarted { .. } | ServerMsg::Frame { .. })
    })
    .await;
    assert!(started.is_none(), "No match should start, got {:?}", started);
}

#[tokio::test]
async fn test_clock_runs_out_and_match_ends() {
    let url = start_test_server(2).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    send_json(&mut ws, r#"{"type":"start_match"}"#).await;

    let clock = recv_until(&mut ws, Duration::from_secs(3), |m| {
        matches!(m, ServerMsg::Clock { .. })
    })
    .await;
    assert!(
        matches!(clock, Some(ServerMsg::Clock { seconds_left: 1 })),
        "got {:?}",
        clock
    );

    let end = recv_until(&mut ws, Duration::from_secs(3), |m| {
        matches!(m, ServerMsg::MatchEnd { .. })
    })
    .await;
    match end {
        Some(ServerMsg::MatchEnd { score, winner }) => {
            let expected = match score[0].cmp(&score[1]) {
                std::cmp::Ordering::Greater => Some("player".to_string()),
                std::cmp::Ordering::Less => Some("opponent".to_string()),
                std::cmp::Ordering::Equal => None,
            };
            assert_eq!(winner, expected);
        }
        other => panic!("Expected MatchEnd, got {:?}", other),
    }

    // Frozen: no further frames
    let frame = recv_until(&mut ws, Duration::from_millis(300), |m| {
        matches!(m, ServerMsg::Frame { .. })
    })
    .await;
    assert!(frame.is_none(), "Frames after match end: {:?}", frame);
}

#[tokio::test]
async fn test_pointer_drag_moves_player() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    send_json(&mut ws, r#"{"type":"start_match"}"#).await;
    send_json(&mut ws, r#"{"type":"pointer","x":40.0,"y":380.0,"down":true}"#).await;
    tokio::time::sleep(Duration::from_millis(700)).await;

    let frame = recv_until(&mut ws, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::Frame { tick, .. } if *tick > 30)
    })
    .await;
    match frame {
        Some(ServerMsg::Frame { player, .. }) => {
            let x = player["x"].as_f64().unwrap();
            assert!(x < 160.0, "player should move toward the pointer, x = {}", x);
        }
        other => panic!("Expected Frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stop_match_is_broadcast() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;
    let mut spectator = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;
    let _welcome = recv_msg(&mut spectator).await;

    send_json(&mut ws, r#"{"type":"start_match"}"#).await;
    recv_until(&mut spectator, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::Frame { .. })
    })
    .await
    .expect("spectator should see frames");

    send_json(&mut ws, r#"{"type":"stop_match"}"#).await;
    let stopped = recv_until(&mut spectator, Duration::from_secs(2), |m| {
        matches!(m, ServerMsg::MatchStopped)
    })
    .await;
    assert!(stopped.is_some());

    // A late joiner sees no active match
    let mut late = connect(&url).await;
    match recv_msg(&mut late).await {
        ServerMsg::Welcome { match_active, .. } => assert!(!match_active),
        other => panic!("Expected Welcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_message_disconnects_client() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    let huge_payload = "x".repeat(2000);
    let msg = format!(
        r#"{{"type":"pointer","x":1.0,"y":1.0,"down":false,"extra":"{}"}}"#,
        huge_payload
    );
    let _ = ws.send(Message::Text(msg.into())).await;

    assert!(
        expect_disconnect(&mut ws).await,
        "Client should be disconnected after oversized message"
    );
}

#[tokio::test]
async fn test_parse_spam_disconnects_client() {
    let url = start_test_server(60).await;
    let mut ws = connect(&url).await;
    let _welcome = recv_msg(&mut ws).await;

    for _ in 0..10 {
        let _ = ws.send(Message::Text("not valid json".into())).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(
        expect_disconnect(&mut ws).await,
        "Client should be disconnected after too many parse errors"
    );
}
