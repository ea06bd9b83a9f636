//! Load test for the soccer server.
//!
//! Spawns multiple fake WebSocket clients. Client 0 is the driver: it starts
//! a match and drags the pointer around. Every client counts frames and
//! events, so the run measures broadcast fan-out under load.
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 100)
//!   --duration S     Test duration in seconds (default: 30)
//!   --pointer-rate R Pointer moves per second from the driver (default: 20)
//!   --balls N        Balls in the driven match (default: 1)
//!   --url URL        Server URL (default: ws://127.0.0.1:9002/ws)

use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Protocol types (minimal subset) ===

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome {},
    #[serde(rename = "frame")]
    Frame { balls: Vec<serde_json::Value> },
    #[serde(rename = "goal")]
    Goal {},
    #[serde(rename = "kick")]
    Kick {},
    #[serde(other)]
    Other,
}

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    frames_received: AtomicU64,
    goals_received: AtomicU64,
    kicks_received: AtomicU64,
    pointer_moves_sent: AtomicU64,
    errors: AtomicU64,
    total_balls_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

struct ClientPlan {
    client_id: u32,
    url: String,
    duration: Duration,
    /// Only the driver sends input
    pointer_rate: Option<f64>,
    balls: u8,
}

// === Client task ===

async fn run_client(plan: ClientPlan, metrics: Arc<Metrics>) {
    let connect_start = Instant::now();
    let (mut ws, _) = match connect_async(&plan.url).await {
        Ok(conn) => conn,
        Err(e) => {
            if plan.client_id < 5 {
                eprintln!("Client {} failed to connect: {}", plan.client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    // Wait for welcome message before doing anything else
    let got_welcome = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                if matches!(serde_json::from_str(&text), Ok(ServerMsg::Welcome {})) {
                    return true;
                }
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    if !got_welcome {
        if plan.client_id < 3 {
            eprintln!("Client {} got no welcome", plan.client_id);
        }
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    if plan.pointer_rate.is_some() {
        let start = format!(r#"{{"type":"start_match","ballCount":{}}}"#, plan.balls);
        if ws.send(Message::Text(start.into())).await.is_err() {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }

    let pointer_interval = match plan.pointer_rate {
        Some(rate) if rate > 0.0 => Duration::from_secs_f64(1.0 / rate),
        _ => Duration::from_secs(3600), // Effectively never
    };
    let mut pointer_timer = tokio::time::interval(pointer_interval);
    pointer_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rng = ChaCha8Rng::seed_from_u64(plan.client_id as u64 * 12345 + 67890);
    let test_end = Instant::now() + plan.duration;

    while Instant::now() < test_end {
        tokio::select! {
            _ = pointer_timer.tick(), if plan.pointer_rate.is_some() => {
                // Anywhere in the human half
                let x: f32 = rng.gen_range(30.0..290.0);
                let y: f32 = rng.gen_range(240.0..400.0);
                let msg = format!(r#"{{"type":"pointer","x":{:.1},"y":{:.1},"down":true}}"#, x, y);
                if ws.send(Message::Text(msg.into())).await.is_ok() {
                    metrics.pointer_moves_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::Frame { balls }) => {
                                metrics.frames_received.fetch_add(1, Ordering::Relaxed);
                                metrics.total_balls_seen.fetch_add(balls.len() as u64, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Goal {}) => {
                                metrics.goals_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Kick {}) => {
                                metrics.kicks_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(_) => {}
                            Err(_) => {
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if plan.client_id < 3 {
                            eprintln!("Client {} error: {}", plan.client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 100;
    let mut duration_secs: u64 = 30;
    let mut pointer_rate: f64 = 20.0;
    let mut balls: u8 = 1;
    let mut url = "ws://127.0.0.1:9002/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--pointer-rate" => {
                i += 1;
                pointer_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20.0);
            }
            "--balls" => {
                i += 1;
                balls = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(1);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Soccer Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Pointer rate: {}/s", pointer_rate);
    println!("Balls: {}", balls);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);
    let mut handles = Vec::with_capacity(num_clients as usize);

    for client_id in 0..num_clients {
        let plan = ClientPlan {
            client_id,
            url: url.clone(),
            duration,
            pointer_rate: (client_id == 0).then_some(pointer_rate),
            balls,
        };
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(run_client(plan, metrics)));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();
        loop {
            interval.tick().await;
            let m = &metrics_clone;
            println!(
                "[{:3}s] connected={}, msgs={}, frames={}, goals={}, kicks={}, errors={}",
                start.elapsed().as_secs(),
                m.connected.load(Ordering::Relaxed),
                m.messages_received.load(Ordering::Relaxed),
                m.frames_received.load(Ordering::Relaxed),
                m.goals_received.load(Ordering::Relaxed),
                m.kicks_received.load(Ordering::Relaxed),
                m.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let frames = metrics.frames_received.load(Ordering::Relaxed);
    let balls_seen = metrics.total_balls_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total frames: {}", frames);
    println!("Total goals seen: {}", metrics.goals_received.load(Ordering::Relaxed));
    println!("Total kicks seen: {}", metrics.kicks_received.load(Ordering::Relaxed));
    println!(
        "Pointer moves sent: {}",
        metrics.pointer_moves_sent.load(Ordering::Relaxed)
    );
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    if frames > 0 {
        println!("Average balls per frame: {:.2}", balls_seen as f64 / frames as f64);
    }
    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    // 30 Hz default broadcast
    let expected = duration_secs as f64 * 30.0;
    let per_client = frames as f64 / num_clients.max(1) as f64;
    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!("Frames per client: {:.1} (expected ~{:.0})", per_client, expected);
    println!("Delivery rate: {:.1}%", per_client / expected.max(1.0) * 100.0);
}
