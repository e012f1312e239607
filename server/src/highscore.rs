//! High-score leaderboard persisted as JSON.
//!
//! The game loop never touches the file. It submits round results to a
//! [`HighscoreWriter`], which hands them to a blocking worker that owns the
//! store.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StoreError;

/// Pending round-result batches the writer will buffer.
const WRITER_QUEUE: usize = 8;

/// A ship's final score for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub username: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighscoreEntry {
    pub username: String,
    pub score: u32,
    /// Unix seconds
    pub timestamp: u64,
}

/// Top scores, sorted descending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<HighscoreEntry>,
}

impl Leaderboard {
    pub fn qualifies(&self, score: u32, limit: usize) -> bool {
        if score == 0 || limit == 0 {
            return false;
        }
        if self.entries.len() < limit {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Insert if it qualifies. Returns the 1-based rank achieved.
    pub fn add(&mut self, entry: HighscoreEntry, limit: usize) -> Option<usize> {
        if !self.qualifies(entry.score, limit) {
            return None;
        }
        // Ties rank below existing entries
        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        self.entries.truncate(limit);
        Some(pos + 1)
    }

    #[cfg(test)]
    pub fn top_score(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }
}

/// Persistence collaborator: loaded once at startup, updated at round end.
pub trait HighscoreStore: Send + 'static {
    fn load(&mut self) -> Result<(), StoreError>;
    fn update(&mut self, results: &[RoundResult]) -> Result<(), StoreError>;
}

/// Leaderboard stored in a JSON file.
pub struct JsonHighscoreStore {
    path: PathBuf,
    limit: usize,
    board: Leaderboard,
}

impl JsonHighscoreStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
            board: Leaderboard::default(),
        }
    }

    #[cfg(test)]
    pub fn leaderboard(&self) -> &Leaderboard {
        &self.board
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.board)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl HighscoreStore for JsonHighscoreStore {
    /// A missing file is an empty leaderboard.
    fn load(&mut self) -> Result<(), StoreError> {
        self.board = match std::fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Leaderboard::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            "Loaded {} high scores from {}",
            self.board.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn update(&mut self, results: &[RoundResult]) -> Result<(), StoreError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut changed = false;
        for result in results {
            let entry = HighscoreEntry {
                username: result.username.clone(),
                score: result.score,
                timestamp,
            };
            if let Some(rank) = self.board.add(entry, self.limit) {
                tracing::info!(
                    "New high score #{}: {} ({})",
                    rank,
                    result.username,
                    result.score
                );
                changed = true;
            }
        }
        if changed {
            self.save()?;
        }
        Ok(())
    }
}

/// Fire-and-forget handle for submitting round results.
#[derive(Clone)]
pub struct HighscoreWriter {
    tx: mpsc::Sender<Vec<RoundResult>>,
}

impl HighscoreWriter {
    /// Move `store` onto a blocking worker. The worker exits once every writer
    /// handle is dropped.
    pub fn spawn(mut store: impl HighscoreStore) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Vec<RoundResult>>(WRITER_QUEUE);
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(results) = rx.blocking_recv() {
                if let Err(e) = store.update(&results) {
                    tracing::error!("Failed to update high scores: {}", e);
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Never waits. A full or closed queue drops the batch with a warning.
    pub fn submit(&self, results: Vec<RoundResult>) {
        if results.is_empty() {
            return;
        }
        if let Err(e) = self.tx.try_send(results) {
            tracing::warn!("High-score update dropped: {}", e);
        }
    }
}
