use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::watch;

use crate::config::{GameConfig, ServerConfig};
use crate::entity::{Dust, DustId, Particle, ParticleKind, Registry, Ship, ShipId};
use crate::error::GameError;
use crate::fanout::{ClientChannels, DustView};
use crate::highscore::RoundResult;
use crate::physics::{BodyContact, BodyDef, BodyPose, PhysicsWorld};
use crate::protocol::{
    particle_wire, ship_wire, AlertWire, DustWire, Movement, ShipWire, UiMsg, WelcomeMsg,
    PROTOCOL_VERSION,
};
use crate::round::{Phase, PhaseClock, PhaseTransition};

/// Where new ships appear.
const SHIP_SPAWN: (f32, f32) = (2.0, 4.0);

const MAX_USERNAME_CHARS: usize = 24;

/// What happened during one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub transition: Option<PhaseTransition>,
    /// Final scores, non-empty only on the tick a round ended
    pub round_results: Vec<RoundResult>,
    pub dust_collected: usize,
}

/// A shot requested this tick, spawned after existing particles have aged.
struct Shot {
    owner: ShipId,
    pose: BodyPose,
}

/// Central game state owned by the game loop task.
pub struct GameState {
    pub registry: Registry,
    pub physics: PhysicsWorld,
    pub clock: PhaseClock,
    pub config: GameConfig,
    rng: ChaCha8Rng,
    /// Physics step size, independent of measured tick time
    fixed_dt: f32,
    velocity_iterations: usize,
    position_iterations: usize,
    dust_view: watch::Sender<DustView>,
}

impl GameState {
    pub fn new(server_config: &ServerConfig) -> Self {
        let config = server_config.game;
        let (dust_view, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            registry: Registry::new(),
            physics: PhysicsWorld::new(),
            clock: PhaseClock::new(config.lobby_time, config.round_time),
            config,
            rng: ChaCha8Rng::seed_from_u64(server_config.rng_seed),
            fixed_dt: server_config.tick_secs(),
            velocity_iterations: server_config.velocity_iterations,
            position_iterations: server_config.position_iterations,
            dust_view,
        }
    }

    /// Create a ship for a new connection, returns its id
    pub fn add_ship(&mut self, channels: ClientChannels) -> ShipId {
        let id = self.registry.allocate_ship_id();
        let body = self.physics.create_body(BodyDef::Ship {
            x: SHIP_SPAWN.0,
            y: SHIP_SPAWN.1,
            angle: 0.0,
            linear_damping: self.config.linear_damping,
            angular_damping: self.config.angular_damping,
        });
        self.registry.insert_ship(Ship {
            id,
            body,
            username: String::new(),
            health: self.config.starting_health,
            alive: true,
            score: 0,
            skin: 0,
            movement: Movement::default(),
            channels,
        });
        id
    }

    /// Remove a disconnected ship and its body. Dropping the ship closes its
    /// fanout channels.
    pub fn remove_ship(&mut self, id: ShipId) -> Result<(), GameError> {
        let index = self
            .registry
            .find_ship_by_connection(id)
            .ok_or(GameError::ShipMissing { ship_id: id })?;
        let ship = self.registry.remove_ship(index);
        self.physics.destroy_body(ship.body);
        Ok(())
    }

    pub fn set_movement(&mut self, id: ShipId, movement: Movement) -> bool {
        match self.registry.ship_mut(id) {
            Some(ship) => {
                ship.movement = movement;
                true
            }
            None => false,
        }
    }

    pub fn set_username(&mut self, id: ShipId, name: &str) -> bool {
        let name: String = name.trim().chars().take(MAX_USERNAME_CHARS).collect();
        match self.registry.ship_mut(id) {
            Some(ship) => {
                tracing::info!(
                    "Player {} changed username from {:?} to {:?}",
                    id,
                    ship.username,
                    name
                );
                ship.username = name;
                true
            }
            None => false,
        }
    }

    pub fn set_skin(&mut self, id: ShipId, skin: u32) -> bool {
        match self.registry.ship_mut(id) {
            Some(ship) => {
                ship.skin = skin;
                true
            }
            None => false,
        }
    }

    /// Advance the world. `elapsed` is measured wall-clock time since the last
    /// tick and drives ageing and the phase timer; physics always steps by the
    /// fixed tick.
    pub fn tick(&mut self, elapsed: f64) -> TickReport {
        let elapsed = elapsed.max(0.0);
        let mut report = TickReport::default();

        let shots = if self.clock.phase() == Phase::Round {
            self.apply_movement()
        } else {
            Vec::new()
        };

        self.age_particles(elapsed as f32);
        for shot in shots {
            self.spawn_particle(shot);
        }

        let contacts = self.physics.step(
            self.fixed_dt,
            self.velocity_iterations,
            self.position_iterations,
        );
        for contact in contacts {
            if self.handle_contact(contact).is_some() {
                report.dust_collected += 1;
            }
        }

        if let Some(transition) = self.clock.advance(elapsed) {
            report.transition = Some(transition);
            match transition {
                PhaseTransition::RoundStarted => {
                    self.setup_round();
                    tracing::info!("Round started with {} dust", self.registry.dust.len());
                }
                PhaseTransition::RoundEnded => {
                    report.round_results = self.teardown_round();
                    tracing::info!("Round ended");
                }
            }
        }

        report
    }

    /// Turn movement intents into velocities. Shoot is edge-triggered and
    /// cleared here.
    fn apply_movement(&mut self) -> Vec<Shot> {
        let mut shots = Vec::new();
        let thrust = self.config.thrust;
        let rotation = self.config.rotation_rate;

        for ship in &mut self.registry.ships {
            let movement = ship.movement;
            ship.movement.shoot = false;
            if !ship.alive {
                continue;
            }
            let Some(pose) = self.physics.pose(ship.body) else {
                continue;
            };

            if movement.up {
                let [hx, hy] = pose.heading();
                self.physics.set_linear_velocity(ship.body, [hx * thrust, hy * thrust]);
            }
            if movement.left {
                self.physics.set_angular_velocity(ship.body, -rotation);
            }
            if movement.right {
                self.physics.set_angular_velocity(ship.body, rotation);
            }
            if movement.shoot {
                shots.push(Shot {
                    owner: ship.id,
                    pose,
                });
            }
        }
        shots
    }

    /// Age particles and drop any whose lifetime ran out or whose body is gone.
    fn age_particles(&mut self, dt: f32) {
        let mut i = 0;
        while i < self.registry.particles.len() {
            let particle = &mut self.registry.particles[i];
            particle.lifetime -= dt;
            if particle.lifetime <= 0.0 || !self.physics.contains(particle.body) {
                // Slot i now holds the former last particle, not yet aged
                let particle = self.registry.remove_particle(i);
                self.physics.destroy_body(particle.body);
            } else {
                i += 1;
            }
        }
    }

    fn spawn_particle(&mut self, shot: Shot) {
        let [hx, hy] = shot.pose.heading();
        let speed = self.config.laser_speed;
        let body = self.physics.create_body(BodyDef::Particle {
            x: shot.pose.x,
            y: shot.pose.y,
            angle: shot.pose.angle,
            radius: self.config.laser_size,
            velocity: [hx * speed, hy * speed],
        });
        let particle = Particle {
            owner: shot.owner,
            body,
            lifetime: self.config.laser_lifetime,
            size: self.config.laser_size,
            kind: ParticleKind::Laser,
        };

        let owner = self.registry.ship(particle.owner).map(|s| s.id);
        let wire = particle_wire(&particle, shot.pose, owner);
        for ship in &self.registry.ships {
            ship.channels.add_particle(wire.clone());
        }
        self.registry.insert_particle(particle);
    }

    /// Score a ship-vs-dust contact. Either side may be the ship. Any other
    /// pairing is ignored. Returns the collected dust id.
    pub fn handle_contact(&mut self, contact: BodyContact) -> Option<DustId> {
        for (ship_body, dust_body) in contact.orderings() {
            let Some(ship_index) = self.registry.find_ship_by_body(ship_body) else {
                continue;
            };
            let Some(dust_index) = self.registry.find_dust_by_body(dust_body) else {
                continue;
            };

            let dust = self.registry.remove_dust(dust_index);
            self.physics.destroy_body(dust.body);

            let ship = &mut self.registry.ships[ship_index];
            ship.score += 1;
            tracing::debug!(
                "Dust {} collected by ship {} (score {})",
                dust.id,
                ship.id,
                ship.score
            );

            self.publish_dust();
            for ship in &self.registry.ships {
                ship.channels.dust_removed(dust.id);
            }
            return Some(dust.id);
        }
        None
    }

    /// Skip the remaining lobby time and start a round now.
    #[cfg(test)]
    pub fn start_round(&mut self) {
        self.clock.enter(Phase::Round);
        self.setup_round();
    }

    fn setup_round(&mut self) {
        let starting_health = self.config.starting_health;
        for ship in &mut self.registry.ships {
            ship.clean_turn(starting_health);
        }
        self.generate_dust();
    }

    /// Clear all dust and collect final scores.
    fn teardown_round(&mut self) -> Vec<RoundResult> {
        for dust in self.registry.take_dust() {
            self.physics.destroy_body(dust.body);
        }
        self.publish_dust();
        for ship in &self.registry.ships {
            ship.channels.request_dust_sync();
        }

        self.registry
            .ships
            .iter()
            .map(|s| RoundResult {
                username: s.username.clone(),
                score: s.score,
            })
            .collect()
    }

    fn generate_dust(&mut self) {
        let half = self.config.map_half_extent();
        for _ in 0..self.config.dust_count {
            let x = self.rng.gen_range(-half..half);
            let y = self.rng.gen_range(-half..half);
            self.spawn_dust(x, y);
        }
        self.publish_dust();
        for ship in &self.registry.ships {
            ship.channels.request_dust_sync();
        }
    }

    fn spawn_dust(&mut self, x: f32, y: f32) -> DustId {
        let id = self.registry.allocate_dust_id();
        let body = self.physics.create_body(BodyDef::Dust { x, y });
        self.registry.insert_dust(Dust {
            id,
            body,
            pos: [x, y],
        });
        id
    }

    fn publish_dust(&self) {
        let view: Vec<DustWire> = self.registry.dust.iter().map(DustWire::from).collect();
        self.dust_view.send_replace(Arc::new(view));
    }

    pub fn subscribe_dust(&self) -> watch::Receiver<DustView> {
        self.dust_view.subscribe()
    }

    pub fn ui_snapshot(&self) -> UiMsg {
        let lobby = self.clock.is_lobby();
        let remaining = self.clock.remaining();
        let alert = (!lobby && remaining <= self.config.alert_seconds).then(|| AlertWire {
            text: "Round ending".to_string(),
        });
        UiMsg {
            title: if lobby { "Cosmic - Lobby" } else { "Cosmic" }.to_string(),
            lobby,
            time: remaining.floor() as u32,
            alert,
        }
    }

    pub fn ships_snapshot(&self) -> Vec<ShipWire> {
        self.registry
            .ships
            .iter()
            .map(|s| ship_wire(s, self.physics.pose(s.body)))
            .collect()
    }

    pub fn welcome(&self, self_id: ShipId) -> WelcomeMsg {
        WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            self_id,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::{client_channels, ClientFeeds};
    use tokio::sync::mpsc::error::TryRecvError;

    fn test_config(game: GameConfig) -> ServerConfig {
        ServerConfig {
            tick_ms: 50,
            rng_seed: 12345,
            game,
            ..Default::default()
        }
    }

    fn test_state() -> GameState {
        GameState::new(&test_config(GameConfig {
            lobby_time: 10.0,
            round_time: 60.0,
            dust_count: 20,
            ..Default::default()
        }))
    }

    fn join(state: &mut GameState) -> (ShipId, ClientFeeds) {
        let (channels, feeds) = client_channels(16);
        (state.add_ship(channels), feeds)
    }

    fn ship_body(state: &GameState, id: ShipId) -> rapier2d::prelude::RigidBodyHandle {
        state.registry.ship(id).unwrap().body
    }

    #[test]
    fn lobby_expiry_spawns_configured_dust() {
        let mut state = GameState::new(&test_config(GameConfig {
            lobby_time: 0.01,
            round_time: 60.0,
            dust_count: 30,
            ..Default::default()
        }));
        let report = state.tick(0.02);

        assert_eq!(report.transition, Some(PhaseTransition::RoundStarted));
        assert_eq!(state.clock.phase(), Phase::Round);
        assert_eq!(state.registry.dust.len(), 30);
        assert_eq!(state.clock.remaining(), 60.0);
        assert_eq!(state.physics.body_count(), 30);
        assert_eq!(state.subscribe_dust().borrow().len(), 30);
    }

    #[test]
    fn dust_spawns_inside_map_bounds() {
        let mut state = test_state();
        state.start_round();
        let half = state.config.map_half_extent();
        for dust in &state.registry.dust {
            assert!(dust.pos[0] >= -half && dust.pos[0] < half);
            assert!(dust.pos[1] >= -half && dust.pos[1] < half);
        }
    }

    #[test]
    fn shoot_spawns_one_particle_and_clears_flag() {
        let mut state = test_state();
        state.start_round();
        let (id, mut feeds) = join(&mut state);
        state.set_movement(
            id,
            Movement {
                shoot: true,
                ..Default::default()
            },
        );

        state.tick(0.05);

        assert_eq!(state.registry.particles.len(), 1);
        assert!(!state.registry.ship(id).unwrap().movement.shoot);
        let particle = &state.registry.particles[0];
        assert_eq!(particle.lifetime, state.config.laser_lifetime);
        assert_eq!(particle.owner, id);

        let wire = feeds.add_particle.try_recv().unwrap();
        assert_eq!(wire.owner_id, Some(id));

        // Held flag was consumed: no second shot next tick
        state.tick(0.05);
        assert_eq!(state.registry.particles.len(), 1);
    }

    #[test]
    fn shoot_is_ignored_in_lobby() {
        let mut state = test_state();
        let (id, _feeds) = join(&mut state);
        state.set_movement(
            id,
            Movement {
                shoot: true,
                ..Default::default()
            },
        );
        state.tick(0.05);
        assert!(state.registry.particles.is_empty());
    }

    #[test]
    fn expired_particles_leave_registry_and_world_same_tick() {
        let mut state = GameState::new(&test_config(GameConfig {
            lobby_time: 10.0,
            round_time: 60.0,
            dust_count: 0,
            laser_lifetime: 0.25,
            ..Default::default()
        }));
        state.start_round();
        let (id, _feeds) = join(&mut state);
        let fire = Movement {
            shoot: true,
            ..Default::default()
        };

        state.set_movement(id, fire);
        state.tick(0.125);
        assert_eq!(state.registry.particles.len(), 1);
        let body = state.registry.particles[0].body;

        let mut last = state.registry.particles[0].lifetime;
        state.tick(0.125);
        let now = state.registry.particles[0].lifetime;
        assert!(now <= last);
        last = now;
        assert!(last > 0.0);

        state.tick(0.125);
        assert!(state.registry.particles.is_empty());
        assert!(!state.physics.contains(body));
        // Only the ship remains
        assert_eq!(state.physics.body_count(), 1);
    }

    #[test]
    fn ageing_visits_swapped_in_particle() {
        let mut state = GameState::new(&test_config(GameConfig {
            lobby_time: 10.0,
            round_time: 60.0,
            dust_count: 0,
            laser_lifetime: 1.0,
            ..Default::default()
        }));
        state.start_round();
        let (a, _fa) = join(&mut state);
        let (b, _fb) = join(&mut state);
        let fire = Movement {
            shoot: true,
            ..Default::default()
        };
        state.set_movement(a, fire);
        state.set_movement(b, fire);
        state.tick(0.0);
        assert_eq!(state.registry.particles.len(), 2);

        // First particle expires; the second is swapped into slot 0 and must
        // still age exactly once
        state.registry.particles[0].lifetime = 0.25;
        state.tick(0.5);
        assert_eq!(state.registry.particles.len(), 1);
        assert_eq!(state.registry.particles[0].lifetime, 0.5);
    }

    #[test]
    fn ship_dust_contact_scores_once_in_either_order() {
        let mut state = test_state();
        state.start_round();
        let (id, mut feeds) = join(&mut state);
        let ship = ship_body(&state, id);
        let dust = state.registry.dust[3].clone();
        let before = state.registry.dust.len();

        // Dust reported first
        let collected = state.handle_contact(BodyContact::new(dust.body, ship));
        assert_eq!(collected, Some(dust.id));
        assert_eq!(state.registry.dust.len(), before - 1);
        assert_eq!(state.registry.ship(id).unwrap().score, 1);
        assert!(!state.physics.contains(dust.body));
        assert!(state
            .subscribe_dust()
            .borrow()
            .iter()
            .all(|d| d.id != dust.id));

        assert_eq!(feeds.dust_removed.try_recv().unwrap(), dust.id);
        assert!(feeds.dust_removed.try_recv().is_err());

        // Same dust again: already gone
        assert_eq!(state.handle_contact(BodyContact::new(ship, dust.body)), None);
        assert_eq!(state.registry.ship(id).unwrap().score, 1);
        assert!(feeds.dust_removed.try_recv().is_err());
    }

    #[test]
    fn second_ship_cannot_claim_collected_dust() {
        let mut state = test_state();
        state.start_round();
        let (a, _fa) = join(&mut state);
        let (b, _fb) = join(&mut state);
        let dust = state.registry.dust[0].body;
        let (body_a, body_b) = (ship_body(&state, a), ship_body(&state, b));

        assert!(state.handle_contact(BodyContact::new(body_a, dust)).is_some());
        assert!(state.handle_contact(BodyContact::new(body_b, dust)).is_none());
        assert_eq!(state.registry.ship(a).unwrap().score, 1);
        assert_eq!(state.registry.ship(b).unwrap().score, 0);
    }

    #[test]
    fn ship_ship_contact_is_ignored() {
        let mut state = test_state();
        state.start_round();
        let (a, _fa) = join(&mut state);
        let (b, _fb) = join(&mut state);
        let dust_before = state.registry.dust.len();
        let contact = BodyContact::new(ship_body(&state, a), ship_body(&state, b));
        assert_eq!(state.handle_contact(contact), None);
        assert_eq!(state.registry.dust.len(), dust_before);
    }

    #[test]
    fn overlapping_ship_collects_dust_through_physics() {
        let mut state = GameState::new(&test_config(GameConfig {
            lobby_time: 10.0,
            round_time: 60.0,
            dust_count: 0,
            ..Default::default()
        }));
        state.start_round();
        let (id, mut feeds) = join(&mut state);
        let dust_id = state.spawn_dust(SHIP_SPAWN.0, SHIP_SPAWN.1);

        let mut collected = 0;
        for _ in 0..5 {
            collected += state.tick(0.05).dust_collected;
        }

        assert_eq!(collected, 1);
        assert!(state.registry.dust.is_empty());
        assert_eq!(state.registry.ship(id).unwrap().score, 1);
        assert_eq!(feeds.dust_removed.try_recv().unwrap(), dust_id);
    }

    #[test]
    fn disconnect_removes_ship_and_closes_channels() {
        let mut state = test_state();
        let (id, mut feeds) = join(&mut state);
        state.start_round();
        let body = ship_body(&state, id);

        state.remove_ship(id).unwrap();
        assert!(state.registry.ships.is_empty());
        assert!(state.ships_snapshot().is_empty());
        assert!(!state.physics.contains(body));

        // Round-start sync request still queued, then the channel reports closed
        assert!(feeds.dust_sync.try_recv().is_ok());
        assert!(matches!(
            feeds.dust_sync.try_recv(),
            Err(TryRecvError::Disconnected)
        ));
        assert!(matches!(
            feeds.dust_removed.try_recv(),
            Err(TryRecvError::Disconnected)
        ));
        assert!(matches!(
            feeds.add_particle.try_recv(),
            Err(TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn removing_unknown_ship_is_invariant_violation() {
        let mut state = test_state();
        assert_eq!(
            state.remove_ship(99),
            Err(GameError::ShipMissing { ship_id: 99 })
        );
    }

    #[test]
    fn particle_outlives_its_owner() {
        let mut state = test_state();
        state.start_round();
        let (id, _feeds) = join(&mut state);
        state.set_movement(
            id,
            Movement {
                shoot: true,
                ..Default::default()
            },
        );
        state.tick(0.05);
        state.remove_ship(id).unwrap();

        state.tick(0.05);
        assert_eq!(state.registry.particles.len(), 1);
        assert!(state.registry.ship(state.registry.particles[0].owner).is_none());
    }

    #[test]
    fn round_end_clears_dust_and_reports_scores() {
        let mut state = GameState::new(&test_config(GameConfig {
            lobby_time: 10.0,
            round_time: 60.0,
            dust_count: 0,
            ..Default::default()
        }));
        state.start_round();
        state.spawn_dust(500.0, 500.0);
        state.spawn_dust(-500.0, 500.0);
        let (id, mut feeds) = join(&mut state);
        state.set_username(id, "nova");
        let contact = BodyContact::new(ship_body(&state, id), state.registry.dust[0].body);
        state.handle_contact(contact);
        // Drain the round-start sync request
        let _ = feeds.dust_sync.try_recv();

        let report = state.tick(61.0);

        assert_eq!(report.transition, Some(PhaseTransition::RoundEnded));
        assert!(state.clock.is_lobby());
        assert_eq!(state.clock.remaining(), 10.0);
        assert!(state.registry.dust.is_empty());
        assert!(state.subscribe_dust().borrow().is_empty());
        assert_eq!(state.physics.body_count(), 1);
        assert_eq!(
            report.round_results,
            vec![RoundResult {
                username: "nova".to_string(),
                score: 1
            }]
        );
        assert!(feeds.dust_sync.try_recv().is_ok());
    }

    #[test]
    fn round_start_resets_scores() {
        let mut state = test_state();
        let (id, _feeds) = join(&mut state);
        {
            let ship = state.registry.ship_mut(id).unwrap();
            ship.score = 7;
            ship.alive = false;
            ship.health = 1;
        }
        state.tick(10.5);
        let ship = state.registry.ship(id).unwrap();
        assert_eq!(ship.score, 0);
        assert!(ship.alive);
        assert_eq!(ship.health, state.config.starting_health);
    }

    #[test]
    fn thrust_moves_ship_along_heading() {
        let mut state = GameState::new(&test_config(GameConfig {
            dust_count: 0,
            ..Default::default()
        }));
        state.start_round();
        let (id, _feeds) = join(&mut state);
        state.set_movement(
            id,
            Movement {
                up: true,
                ..Default::default()
            },
        );
        state.tick(0.05);
        let pose = state.physics.pose(ship_body(&state, id)).unwrap();
        assert!(pose.y > SHIP_SPAWN.1);
    }

    #[test]
    fn thrust_is_ignored_in_lobby() {
        let mut state = test_state();
        let (id, _feeds) = join(&mut state);
        state.set_movement(
            id,
            Movement {
                up: true,
                left: true,
                ..Default::default()
            },
        );
        state.tick(0.05);
        let pose = state.physics.pose(ship_body(&state, id)).unwrap();
        assert_eq!((pose.x, pose.y), SHIP_SPAWN);
        assert_eq!(pose.angle, 0.0);
    }

    #[test]
    fn turn_flags_set_rotation_direction() {
        for (movement, turns_positive) in [
            (
                Movement {
                    left: true,
                    ..Default::default()
                },
                false,
            ),
            (
                Movement {
                    right: true,
                    ..Default::default()
                },
                true,
            ),
        ] {
            let mut state = GameState::new(&test_config(GameConfig {
                dust_count: 0,
                ..Default::default()
            }));
            state.start_round();
            let (id, _feeds) = join(&mut state);
            state.set_movement(id, movement);
            state.tick(0.05);
            let angle = state.physics.pose(ship_body(&state, id)).unwrap().angle;
            assert_eq!(angle > 0.0, turns_positive, "angle {}", angle);
            assert!(angle != 0.0);
        }
    }

    #[test]
    fn updates_for_unknown_ship_are_skipped() {
        let mut state = test_state();
        assert!(!state.set_movement(5, Movement::default()));
        assert!(!state.set_username(5, "ghost"));
        assert!(!state.set_skin(5, 2));
    }

    #[test]
    fn username_is_trimmed_and_capped() {
        let mut state = test_state();
        let (id, _feeds) = join(&mut state);
        state.set_username(id, &format!("  {}  ", "x".repeat(40)));
        assert_eq!(state.registry.ship(id).unwrap().username.len(), MAX_USERNAME_CHARS);
    }

    #[test]
    fn ships_snapshot_reflects_profile() {
        let mut state = test_state();
        let (id, _feeds) = join(&mut state);
        state.set_username(id, "vega");
        state.set_skin(id, 3);
        let ships = state.ships_snapshot();
        assert_eq!(ships.len(), 1);
        assert_eq!(ships[0].id, id);
        assert_eq!(ships[0].username, "vega");
        assert_eq!(ships[0].skin, 3);
        assert_eq!(ships[0].pos, [SHIP_SPAWN.0, SHIP_SPAWN.1]);
        assert_eq!(ships[0].health, state.config.starting_health);
    }

    #[test]
    fn ui_snapshot_tracks_phase_and_alert() {
        let mut state = test_state();
        let ui = state.ui_snapshot();
        assert!(ui.lobby);
        assert_eq!(ui.title, "Cosmic - Lobby");
        assert_eq!(ui.time, 10);
        assert!(ui.alert.is_none());

        state.start_round();
        let ui = state.ui_snapshot();
        assert!(!ui.lobby);
        assert_eq!(ui.title, "Cosmic");
        assert!(ui.alert.is_none());

        state.tick(55.5);
        let ui = state.ui_snapshot();
        assert_eq!(ui.time, 4);
        assert!(ui.alert.is_some());
    }
}
