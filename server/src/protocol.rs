//! Client projections of server entities.

pub use cosmic_shared::protocol::*;

use crate::entity::{Dust, Particle, Ship, ShipId};
use crate::physics::BodyPose;

/// Project a ship. A ship whose body is gone reports the origin.
pub fn ship_wire(ship: &Ship, pose: Option<BodyPose>) -> ShipWire {
    let pose = pose.unwrap_or(BodyPose {
        x: 0.0,
        y: 0.0,
        angle: 0.0,
    });
    ShipWire {
        id: ship.id,
        pos: [round2(pose.x), round2(pose.y)],
        angle: round2(pose.angle),
        username: ship.username.clone(),
        health: ship.health,
        alive: ship.alive,
        score: ship.score,
        skin: ship.skin,
    }
}

impl From<&Dust> for DustWire {
    fn from(dust: &Dust) -> Self {
        Self {
            id: dust.id,
            pos: [round2(dust.pos[0]), round2(dust.pos[1])],
        }
    }
}

/// Project a particle. `owner` is the firing ship if it is still connected.
pub fn particle_wire(particle: &Particle, pose: BodyPose, owner: Option<ShipId>) -> ParticleWire {
    ParticleWire {
        pos: [round2(pose.x), round2(pose.y)],
        angle: round2(pose.angle),
        size: particle.size,
        kind: particle.kind.wire_tag(),
        owner_id: owner,
    }
}
