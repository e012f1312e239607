//! Ships, dust and particles, and the registry that owns them.
//!
//! Removal from any collection is a swap-remove: the last element moves into
//! the freed slot. Indices returned by the `find_*` lookups are only valid
//! until the next removal from the same collection.

use cosmic_shared::protocol::Movement;
use rapier2d::prelude::RigidBodyHandle;

use crate::fanout::ClientChannels;

pub type ShipId = u32;
pub type DustId = u32;

/// A connected player's ship.
pub struct Ship {
    /// Assigned at connect time, never reused.
    pub id: ShipId,
    pub body: RigidBodyHandle,
    pub username: String,
    pub health: i32,
    pub alive: bool,
    pub score: u32,
    pub skin: u32,
    pub movement: Movement,
    pub channels: ClientChannels,
}

impl Ship {
    /// Reset per-round fields.
    pub fn clean_turn(&mut self, starting_health: i32) {
        self.score = 0;
        self.alive = true;
        self.health = starting_health;
    }
}

/// A collectible with a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct Dust {
    pub id: DustId,
    pub body: RigidBodyHandle,
    pub pos: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Laser,
}

impl ParticleKind {
    pub fn wire_tag(self) -> u32 {
        match self {
            ParticleKind::Laser => 0,
        }
    }
}

/// A short-lived projectile.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Firing ship. May have disconnected; look it up before use.
    pub owner: ShipId,
    pub body: RigidBodyHandle,
    /// Seconds left
    pub lifetime: f32,
    pub size: f32,
    pub kind: ParticleKind,
}

/// Canonical entity collections.
#[derive(Default)]
pub struct Registry {
    pub ships: Vec<Ship>,
    pub dust: Vec<Dust>,
    pub particles: Vec<Particle>,
    next_ship_id: ShipId,
    next_dust_id: DustId,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_ship_id: 1,
            next_dust_id: 1,
            ..Default::default()
        }
    }

    pub fn allocate_ship_id(&mut self) -> ShipId {
        let id = self.next_ship_id;
        self.next_ship_id += 1;
        id
    }

    pub fn allocate_dust_id(&mut self) -> DustId {
        let id = self.next_dust_id;
        self.next_dust_id = self.next_dust_id.wrapping_add(1);
        id
    }

    pub fn find_ship_by_connection(&self, id: ShipId) -> Option<usize> {
        self.ships.iter().position(|s| s.id == id)
    }

    pub fn find_ship_by_body(&self, body: RigidBodyHandle) -> Option<usize> {
        self.ships.iter().position(|s| s.body == body)
    }

    pub fn find_dust_by_body(&self, body: RigidBodyHandle) -> Option<usize> {
        self.dust.iter().position(|d| d.body == body)
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.find_ship_by_connection(id).map(|i| &self.ships[i])
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.find_ship_by_connection(id).map(move |i| &mut self.ships[i])
    }

    pub fn insert_ship(&mut self, ship: Ship) {
        self.ships.push(ship);
    }

    pub fn insert_dust(&mut self, dust: Dust) {
        self.dust.push(dust);
    }

    pub fn insert_particle(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn remove_ship(&mut self, index: usize) -> Ship {
        self.ships.swap_remove(index)
    }

    pub fn remove_dust(&mut self, index: usize) -> Dust {
        self.dust.swap_remove(index)
    }

    pub fn remove_particle(&mut self, index: usize) -> Particle {
        self.particles.swap_remove(index)
    }

    /// Empty the dust collection, returning what was in it.
    pub fn take_dust(&mut self) -> Vec<Dust> {
        std::mem::take(&mut self.dust)
    }
}
