use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::config::ServerConfig;
use crate::entity::ShipId;
use crate::fanout::{ClientChannels, DustView};
use crate::highscore::HighscoreWriter;
use crate::protocol::{Movement, ShipWire, UiMsg, WelcomeMsg};
use crate::state::GameState;

/// Commands from client connections to the game loop
pub enum GameCommand {
    PlayerJoin {
        channels: ClientChannels,
        response: oneshot::Sender<JoinAccepted>,
    },
    PlayerLeave {
        id: ShipId,
    },
    Movement {
        id: ShipId,
        movement: Movement,
    },
    Username {
        id: ShipId,
        name: String,
    },
    Skin {
        id: ShipId,
        skin: u32,
    },
}

/// Everything a new connection needs before the first broadcast arrives
pub struct JoinAccepted {
    pub ship_id: ShipId,
    pub welcome: WelcomeMsg,
    pub ui: UiMsg,
    pub ships: Vec<ShipWire>,
    pub dust: watch::Receiver<DustView>,
}

/// Broadcasts from game loop to all clients
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    Ui(UiMsg),
    Ships(Vec<ShipWire>),
}

/// Run the main game loop. Owns all game state.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    highscores: HighscoreWriter,
    server_config: ServerConfig,
) {
    let mut state = GameState::new(&server_config);

    let mut tick_interval = tokio::time::interval(server_config.tick_duration());
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ui_interval = tokio::time::interval(Duration::from_millis(server_config.ui_sync_ms));
    ui_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ships_interval =
        tokio::time::interval(Duration::from_millis(server_config.ships_sync_ms));
    ships_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                let report = state.tick(elapsed);
                if report.transition.is_some() {
                    // Phase flips reach clients without waiting for the UI period
                    let _ = broadcast_tx.send(GameBroadcast::Ui(state.ui_snapshot()));
                }
                if !report.round_results.is_empty() {
                    highscores.submit(report.round_results);
                }
            }

            _ = ui_interval.tick() => {
                let _ = broadcast_tx.send(GameBroadcast::Ui(state.ui_snapshot()));
            }

            _ = ships_interval.tick() => {
                let _ = broadcast_tx.send(GameBroadcast::Ships(state.ships_snapshot()));
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => handle_command(&mut state, cmd),
                    None => break,
                }
            }
        }
    }

    tracing::info!("Game loop ended");
}

fn handle_command(state: &mut GameState, cmd: GameCommand) {
    match cmd {
        GameCommand::PlayerJoin { channels, response } => {
            let ship_id = state.add_ship(channels);
            let accepted = JoinAccepted {
                ship_id,
                welcome: state.welcome(ship_id),
                ui: state.ui_snapshot(),
                ships: state.ships_snapshot(),
                dust: state.subscribe_dust(),
            };
            if response.send(accepted).is_err() {
                // Connection went away before it could be told its id
                if let Err(e) = state.remove_ship(ship_id) {
                    tracing::error!("{}", e);
                }
                return;
            }
            tracing::info!("Player {} joined", ship_id);
        }
        GameCommand::PlayerLeave { id } => match state.remove_ship(id) {
            Ok(()) => tracing::info!("Player {} left", id),
            Err(e) => tracing::error!("{}", e),
        },
        GameCommand::Movement { id, movement } => {
            state.set_movement(id, movement);
        }
        GameCommand::Username { id, name } => {
            if !state.set_username(id, &name) {
                tracing::debug!("Username for unknown ship {} ignored", id);
            }
        }
        GameCommand::Skin { id, skin } => {
            if !state.set_skin(id, skin) {
                tracing::debug!("Skin for unknown ship {} ignored", id);
            }
        }
    }
}
