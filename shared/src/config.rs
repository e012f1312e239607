/// Gameplay constants. Sent to clients in the welcome message.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Lobby countdown (seconds)
    pub lobby_time: f64,
    /// Round countdown (seconds)
    pub round_time: f64,
    /// Dust spawned at round start
    pub dust_count: u32,
    /// Dust spawns in a square of half-side `500 * map_size`
    pub map_size: f32,
    pub starting_health: i32,
    /// Linear speed set while thrusting
    pub thrust: f32,
    /// Angular speed set while turning (rad/s)
    pub rotation_rate: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Laser lifetime (seconds)
    pub laser_lifetime: f32,
    pub laser_size: f32,
    pub laser_speed: f32,
    /// Seconds before round end when the UI alert shows
    pub alert_seconds: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            lobby_time: 15.0,
            round_time: 120.0,
            dust_count: 200,
            map_size: 4.0,
            starting_health: 100,
            thrust: 300.0,
            rotation_rate: 3.0,
            linear_damping: 1.0,
            angular_damping: 4.0,
            laser_lifetime: 5.0,
            laser_size: 5.0,
            laser_speed: 600.0,
            alert_seconds: 10.0,
        }
    }
}

impl GameConfig {
    /// Half-side of the square dust spawn area.
    pub fn map_half_extent(&self) -> f32 {
        500.0 * self.map_size
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.lobby_time.is_finite() || self.lobby_time <= 0.0 {
            return Err("lobby_time must be finite and > 0".to_string());
        }
        if !self.round_time.is_finite() || self.round_time <= 0.0 {
            return Err("round_time must be finite and > 0".to_string());
        }
        if !self.map_size.is_finite() || self.map_size <= 0.0 {
            return Err("map_size must be finite and > 0".to_string());
        }
        if self.starting_health <= 0 {
            return Err("starting_health must be > 0".to_string());
        }
        if !self.thrust.is_finite() || self.thrust < 0.0 {
            return Err("thrust must be finite and >= 0".to_string());
        }
        if !self.rotation_rate.is_finite() || self.rotation_rate < 0.0 {
            return Err("rotation_rate must be finite and >= 0".to_string());
        }
        for damping in [self.linear_damping, self.angular_damping] {
            if !damping.is_finite() || damping < 0.0 {
                return Err("damping must be finite and >= 0".to_string());
            }
        }
        if !self.laser_lifetime.is_finite() || self.laser_lifetime <= 0.0 {
            return Err("laser_lifetime must be finite and > 0".to_string());
        }
        if !self.laser_size.is_finite() || self.laser_size <= 0.0 {
            return Err("laser_size must be finite and > 0".to_string());
        }
        if !self.laser_speed.is_finite() || self.laser_speed < 0.0 {
            return Err("laser_speed must be finite and >= 0".to_string());
        }
        if !self.alert_seconds.is_finite() || self.alert_seconds < 0.0 {
            return Err("alert_seconds must be finite and >= 0".to_string());
        }
        Ok(())
    }
}
