//! Load test for the cosmic server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect to the server and pick a username
//! - Thrust, turn and fire at a fixed rate
//! - Count ships/ui broadcasts and per-client dust and particle events
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 100)
//!   --duration S     Test duration in seconds (default: 30)
//!   --input-rate R   Movement messages per second per client (default: 10)
//!   --url URL        Server URL (default: ws://127.0.0.1:3000/ws)

use cosmic_server::protocol::{ClientMsg, Movement, ServerMsg};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Ships broadcast period the server runs with by default
const EXPECTED_SHIPS_HZ: f64 = 20.0;

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    ships_received: AtomicU64,
    ui_received: AtomicU64,
    dust_syncs_received: AtomicU64,
    dust_removes_received: AtomicU64,
    particles_received: AtomicU64,
    inputs_sent: AtomicU64,
    errors: AtomicU64,
    total_ships_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn record(&self, msg: ServerMsg) {
        match msg {
            ServerMsg::Ships(ships) => {
                self.ships_received.fetch_add(1, Ordering::Relaxed);
                self.total_ships_seen
                    .fetch_add(ships.len() as u64, Ordering::Relaxed);
            }
            ServerMsg::Ui(_) => {
                self.ui_received.fetch_add(1, Ordering::Relaxed);
            }
            ServerMsg::CosmicDust(_) => {
                self.dust_syncs_received.fetch_add(1, Ordering::Relaxed);
            }
            ServerMsg::DustRemove(_) => {
                self.dust_removes_received.fetch_add(1, Ordering::Relaxed);
            }
            ServerMsg::AddParticle(_) => {
                self.particles_received.fetch_add(1, Ordering::Relaxed);
            }
            ServerMsg::Welcome(_) => {}
        }
    }
}

// === Client task ===

async fn send(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    msg: &ClientMsg,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => ws.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => false,
    }
}

async fn run_client(
    client_id: u32,
    url: String,
    input_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    // Wait for welcome message before doing anything else
    let welcome = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    if let Ok(ServerMsg::Welcome(_)) = serde_json::from_str(&text) {
                        return true;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return false,
                _ => {}
            }
        }
        false
    })
    .await;

    if !matches!(welcome, Ok(true)) {
        if client_id < 3 {
            eprintln!("Client {} failed to get welcome", client_id);
        }
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    if !send(&mut ws, &ClientMsg::Username(format!("bot-{}", client_id))).await {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let input_interval = if input_rate > 0.0 {
        Duration::from_secs_f64(1.0 / input_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };

    let mut input_timer = tokio::time::interval(input_interval);
    input_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    let mut rng_state: u64 = client_id as u64 * 12345 + 67890;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = input_timer.tick() => {
                // Simple LCG for random steering
                rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let bits = rng_state >> 33;
                let movement = Movement {
                    up: bits & 1 == 0,
                    down: false,
                    left: bits & 6 == 2,
                    right: bits & 6 == 4,
                    shoot: bits & 24 == 0,
                };
                if send(&mut ws, &ClientMsg::Movement(movement)).await {
                    metrics.inputs_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        if let Ok(server_msg) = serde_json::from_str::<ServerMsg>(&text) {
                            metrics.record(server_msg);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if client_id < 3 {
                            eprintln!("Client {} got Close: {:?}", client_id, frame);
                        }
                        break;
                    }
                    None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
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
    let mut input_rate: f64 = 10.0;
    let mut url = "ws://127.0.0.1:3000/ws".to_string();

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
            "--input-rate" => {
                i += 1;
                input_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(10.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Cosmic Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Input rate: {}/s per client", input_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, input_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, ships={}, dust_removes={}, particles={}, inputs={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.ships_received.load(Ordering::Relaxed),
                metrics_clone.dust_removes_received.load(Ordering::Relaxed),
                metrics_clone.particles_received.load(Ordering::Relaxed),
                metrics_clone.inputs_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    // Wait for all clients to finish
    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let ships = metrics.ships_received.load(Ordering::Relaxed);
    let ships_seen = metrics.total_ships_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total ships messages: {}", ships);
    println!(
        "Total ui messages: {}",
        metrics.ui_received.load(Ordering::Relaxed)
    );
    println!(
        "Total cosmicDust syncs: {}",
        metrics.dust_syncs_received.load(Ordering::Relaxed)
    );
    println!(
        "Total dustRemove events: {}",
        metrics.dust_removes_received.load(Ordering::Relaxed)
    );
    println!(
        "Total addParticle events: {}",
        metrics.particles_received.load(Ordering::Relaxed)
    );
    println!(
        "Total movement sent: {}",
        metrics.inputs_sent.load(Ordering::Relaxed)
    );
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    println!(
        "Average ships per roster: {}",
        if ships > 0 { ships_seen / ships } else { 0 }
    );

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    let ships_per_client = ships as f64 / num_clients.max(1) as f64;
    let expected = duration_secs as f64 * EXPECTED_SHIPS_HZ;

    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!("Ships messages per client: {:.1}", ships_per_client);
    println!("Expected ships messages per client: {:.1}", expected);
    if expected > 0.0 {
        println!("Delivery rate: {:.1}%", ships_per_client / expected * 100.0);
    }
}
