use axum::routing::get;
use axum::Router;
use cosmic_server::config::ServerConfig;
use cosmic_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
use cosmic_server::highscore::{HighscoreStore, HighscoreWriter, JsonHighscoreStore};
use cosmic_server::ws::{ws_handler, AppState};
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let mut store = JsonHighscoreStore::new(&config.highscore_path, config.highscore_limit);
    if let Err(e) = store.load() {
        tracing::error!(
            "Failed to load high scores from {}: {}",
            store.path().display(),
            e
        );
        std::process::exit(1);
    }
    let (highscores, _writer) = HighscoreWriter::spawn(store);

    let listen_addr = config.listen_addr.clone();
    let static_dir = config.static_dir.clone();

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(config.command_capacity);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(64);

    let app_state = AppState {
        game_tx,
        broadcast_tx: broadcast_tx.clone(),
        fanout_capacity: config.fanout_capacity,
        max_message_bytes: config.max_message_bytes,
    };

    // Spawn game loop
    tokio::spawn(async move {
        run_game_loop(game_rx, broadcast_tx, highscores, config).await;
    });

    // Axum app
    let mut router = Router::new().route("/ws", get(ws_handler));
    if let Some(dir) = static_dir {
        tracing::info!("Serving client files from {}", dir);
        router = router.fallback_service(ServeDir::new(dir));
    }
    let app = router
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Cosmic server listening on {}", listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
