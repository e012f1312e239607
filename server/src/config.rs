use std::time::Duration;

pub use cosmic_shared::config::GameConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Fixed simulation step (milliseconds)
    pub tick_ms: u64,
    /// UI snapshot broadcast period (milliseconds)
    pub ui_sync_ms: u64,
    /// Ship roster broadcast period (milliseconds)
    pub ships_sync_ms: u64,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    /// Per-client dust-removed / add-particle queue depth
    pub fanout_capacity: usize,
    pub command_capacity: usize,
    /// Inbound websocket frames above this size close the connection
    pub max_message_bytes: usize,
    pub rng_seed: u64,
    pub highscore_path: String,
    pub highscore_limit: usize,
    /// Serve client files from here when set
    pub static_dir: Option<String>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            tick_ms: 50,
            ui_sync_ms: 1000,
            ships_sync_ms: 50,
            velocity_iterations: 10,
            position_iterations: 10,
            fanout_capacity: 64,
            command_capacity: 256,
            max_message_bytes: 1024,
            rng_seed: 42,
            highscore_path: "highscores.json".to_string(),
            highscore_limit: 10,
            static_dir: None,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults with `COSMIC_LISTEN_ADDR`, `COSMIC_HIGHSCORES` and
    /// `COSMIC_STATIC_DIR` applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("COSMIC_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(path) = std::env::var("COSMIC_HIGHSCORES") {
            config.highscore_path = path;
        }
        if let Ok(dir) = std::env::var("COSMIC_STATIC_DIR") {
            config.static_dir = Some(dir);
        }
        config
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Physics step size (seconds)
    pub fn tick_secs(&self) -> f32 {
        self.tick_ms as f32 / 1000.0
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_ms == 0 {
            return Err("tick_ms must be > 0".to_string());
        }
        if self.ui_sync_ms == 0 || self.ships_sync_ms == 0 {
            return Err("broadcast intervals must be > 0".to_string());
        }
        if self.velocity_iterations == 0 || self.position_iterations == 0 {
            return Err("solver iterations must be > 0".to_string());
        }
        if self.fanout_capacity == 0 || self.command_capacity == 0 {
            return Err("channel capacities must be > 0".to_string());
        }
        if self.max_message_bytes == 0 {
            return Err("max_message_bytes must be > 0".to_string());
        }
        if self.highscore_path.is_empty() {
            return Err("highscore_path must not be empty".to_string());
        }
        self.game.validate()
    }
}
