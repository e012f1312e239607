use std::fmt;

/// Invariant violations inside the game state.
///
/// Ordinary not-found lookups are `Option`s and never reach this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameError {
    /// A connection left but its ship was not in the registry.
    ShipMissing { ship_id: u32 },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShipMissing { ship_id } => write!(
                f,
                "ship {} missing from registry at disconnect (registry corrupted)",
                ship_id
            ),
        }
    }
}

impl std::error::Error for GameError {}

/// High-score store failures.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Format(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "high-score file i/o failed: {}", e),
            Self::Format(e) => write!(f, "high-score file is malformed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ship_missing_names_the_ship() {
        let err = GameError::ShipMissing { ship_id: 9 };
        assert!(err.to_string().contains("ship 9"));
    }

    #[test]
    fn store_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::from(io);
        assert!(matches!(err, StoreError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
