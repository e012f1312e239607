//! Lobby/round phase timer.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTransition {
    RoundStarted,
    RoundEnded,
}

/// Countdown for the current phase. Expiry flips the phase and reloads the
/// timer with the other phase's duration.
#[derive(Debug, Clone)]
pub struct PhaseClock {
    phase: Phase,
    remaining: f64,
    lobby_time: f64,
    round_time: f64,
}

impl PhaseClock {
    /// Starts in the lobby with a full lobby countdown.
    pub fn new(lobby_time: f64, round_time: f64) -> Self {
        Self {
            phase: Phase::Lobby,
            remaining: lobby_time,
            lobby_time,
            round_time,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_lobby(&self) -> bool {
        self.phase == Phase::Lobby
    }

    /// Seconds left, always >= 0.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Count down by `dt`. At most one transition per call.
    pub fn advance(&mut self, dt: f64) -> Option<PhaseTransition> {
        self.remaining -= dt;
        if self.remaining > 0.0 {
            return None;
        }
        let transition = match self.phase {
            Phase::Lobby => PhaseTransition::RoundStarted,
            Phase::Round => PhaseTransition::RoundEnded,
        };
        self.enter(match transition {
            PhaseTransition::RoundStarted => Phase::Round,
            PhaseTransition::RoundEnded => Phase::Lobby,
        });
        Some(transition)
    }

    /// Switch to `phase` with a full countdown.
    pub fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.remaining = match phase {
            Phase::Lobby => self.lobby_time,
            Phase::Round => self.round_time,
        };
    }
}
