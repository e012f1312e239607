use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::GameConfig;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

/// Named server events. Serialized as `{"type": <event>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "data")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "ui")]
    Ui(UiMsg),
    #[serde(rename = "ships")]
    Ships(Vec<ShipWire>),
    /// Full dust snapshot
    #[serde(rename = "cosmicDust")]
    CosmicDust(Vec<DustWire>),
    /// Id of a single collected dust
    #[serde(rename = "dustRemove")]
    DustRemove(u32),
    #[serde(rename = "addParticle")]
    AddParticle(ParticleWire),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: u32,
    pub config: GameConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UiMsg {
    pub title: String,
    pub lobby: bool,
    /// Whole seconds left in the current phase
    pub time: u32,
    pub alert: Option<AlertWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AlertWire {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ShipWire {
    pub id: u32,
    pub pos: [f32; 2],
    pub angle: f32,
    pub username: String,
    pub health: i32,
    pub alive: bool,
    pub score: u32,
    pub skin: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DustWire {
    pub id: u32,
    pub pos: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct ParticleWire {
    pub pos: [f32; 2],
    pub angle: f32,
    pub size: f32,
    #[serde(rename = "type")]
    pub kind: u32,
    /// Firing ship, if still connected
    #[serde(default)]
    pub owner_id: Option<u32>,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "data")]
pub enum ClientMsg {
    #[serde(rename = "movement")]
    Movement(Movement),
    #[serde(rename = "username")]
    Username(String),
    #[serde(rename = "skin")]
    Skin(u32),
}

/// Movement intent flags, as last reported by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Movement {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub shoot: bool,
}

// === Conversion helpers ===

/// Round to 2 decimal places (sub-pixel precision is invisible to clients)
#[inline]
pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}
