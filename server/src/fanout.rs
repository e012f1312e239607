//! Per-client delivery channels.
//!
//! The game loop holds a [`ClientChannels`] inside each ship and pushes with
//! `try_send` only, so a slow client can never stall a tick. The connection
//! task owns the matching [`ClientFeeds`] and runs one worker per channel that
//! forwards items to the socket as named events.

use std::sync::Arc;

use cosmic_shared::protocol::{DustWire, ParticleWire, ServerMsg};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::entity::DustId;

/// Current dust snapshot, published by the game loop.
pub type DustView = Arc<Vec<DustWire>>;

/// Sending halves, owned by the ship.
#[derive(Debug, Clone)]
pub struct ClientChannels {
    dust_removed: mpsc::Sender<DustId>,
    dust_sync: mpsc::Sender<()>,
    add_particle: mpsc::Sender<ParticleWire>,
}

/// Receiving halves, owned by the connection.
#[derive(Debug)]
pub struct ClientFeeds {
    pub dust_removed: mpsc::Receiver<DustId>,
    pub dust_sync: mpsc::Receiver<()>,
    pub add_particle: mpsc::Receiver<ParticleWire>,
}

/// Create the three channels for one client. The sync channel holds a single
/// pending request so repeated requests coalesce.
pub fn client_channels(capacity: usize) -> (ClientChannels, ClientFeeds) {
    let capacity = capacity.max(1);
    let (dust_removed_tx, dust_removed_rx) = mpsc::channel(capacity);
    let (dust_sync_tx, dust_sync_rx) = mpsc::channel(1);
    let (add_particle_tx, add_particle_rx) = mpsc::channel(capacity);
    (
        ClientChannels {
            dust_removed: dust_removed_tx,
            dust_sync: dust_sync_tx,
            add_particle: add_particle_tx,
        },
        ClientFeeds {
            dust_removed: dust_removed_rx,
            dust_sync: dust_sync_rx,
            add_particle: add_particle_rx,
        },
    )
}

impl ClientChannels {
    /// Queue a dust removal. A full queue falls back to a full resync so the
    /// client view cannot drift.
    pub fn dust_removed(&self, id: DustId) {
        match self.dust_removed.try_send(id) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => self.request_dust_sync(),
        }
    }

    pub fn request_dust_sync(&self) {
        // Full means a sync is already pending
        let _ = self.dust_sync.try_send(());
    }

    pub fn add_particle(&self, particle: ParticleWire) {
        if let Err(TrySendError::Full(_)) = self.add_particle.try_send(particle) {
            tracing::debug!("Particle notification dropped for slow client");
        }
    }
}

/// Handles to one client's worker tasks.
pub struct FanoutWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl FanoutWorkers {
    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }

    /// Wait for every worker to finish.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Spawn the dust-removed, dust-sync and add-particle workers. Each ends when
/// its channel closes (ship removed) or `out` closes (socket gone).
pub fn spawn_workers(
    feeds: ClientFeeds,
    dust: watch::Receiver<DustView>,
    out: mpsc::Sender<ServerMsg>,
) -> FanoutWorkers {
    let ClientFeeds {
        mut dust_removed,
        mut dust_sync,
        mut add_particle,
    } = feeds;

    let removed_out = out.clone();
    let initial_dust = dust.clone();
    let dust_removed_worker = tokio::spawn(async move {
        // Full sync first so removals apply to a known snapshot
        let snapshot = initial_dust.borrow().to_vec();
        if removed_out
            .send(ServerMsg::CosmicDust(snapshot))
            .await
            .is_err()
        {
            return;
        }
        while let Some(id) = dust_removed.recv().await {
            if removed_out.send(ServerMsg::DustRemove(id)).await.is_err() {
                break;
            }
        }
    });

    let sync_out = out.clone();
    let dust_sync_worker = tokio::spawn(async move {
        while dust_sync.recv().await.is_some() {
            let snapshot = dust.borrow().to_vec();
            if sync_out.send(ServerMsg::CosmicDust(snapshot)).await.is_err() {
                break;
            }
            tracing::debug!("Full dust sync performed");
        }
    });

    let add_particle_worker = tokio::spawn(async move {
        while let Some(particle) = add_particle.recv().await {
            if out.send(ServerMsg::AddParticle(particle)).await.is_err() {
                break;
            }
        }
    });

    FanoutWorkers {
        handles: vec![dust_removed_worker, dust_sync_worker, add_particle_worker],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn laser() -> ParticleWire {
        ParticleWire {
            pos: [0.0, 0.0],
            angle: 0.0,
            size: 5.0,
            kind: 0,
            owner_id: Some(1),
        }
    }

    fn dust_view(ids: &[u32]) -> DustView {
        Arc::new(
            ids.iter()
                .map(|&id| DustWire {
                    id,
                    pos: [id as f32, 0.0],
                })
                .collect(),
        )
    }

    #[test]
    fn full_removal_queue_requests_sync() {
        let (channels, mut feeds) = client_channels(2);
        channels.dust_removed(1);
        channels.dust_removed(2);
        assert!(feeds.dust_sync.try_recv().is_err());

        // Third removal overflows
        channels.dust_removed(3);
        assert!(feeds.dust_sync.try_recv().is_ok());
        assert_eq!(feeds.dust_removed.try_recv().unwrap(), 1);
        assert_eq!(feeds.dust_removed.try_recv().unwrap(), 2);
        assert!(feeds.dust_removed.try_recv().is_err());
    }

    #[test]
    fn sync_requests_coalesce() {
        let (channels, mut feeds) = client_channels(4);
        channels.request_dust_sync();
        channels.request_dust_sync();
        channels.request_dust_sync();
        assert!(feeds.dust_sync.try_recv().is_ok());
        assert!(feeds.dust_sync.try_recv().is_err());
    }

    #[test]
    fn full_particle_queue_drops_without_blocking() {
        let (channels, mut feeds) = client_channels(1);
        channels.add_particle(laser());
        channels.add_particle(laser());
        assert!(feeds.add_particle.try_recv().is_ok());
        assert!(feeds.add_particle.try_recv().is_err());
    }

    #[test]
    fn sends_after_receiver_dropped_are_ignored() {
        let (channels, feeds) = client_channels(1);
        drop(feeds);
        channels.dust_removed(1);
        channels.request_dust_sync();
        channels.add_particle(laser());
    }

    #[tokio::test]
    async fn workers_forward_named_events() {
        let (channels, feeds) = client_channels(8);
        let (_dust_tx, dust_rx) = watch::channel(dust_view(&[1, 2, 3]));
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let _workers = spawn_workers(feeds, dust_rx, out_tx);

        // Initial full sync from the removal worker
        match out_rx.recv().await.unwrap() {
            ServerMsg::CosmicDust(d) => assert_eq!(d.len(), 3),
            other => panic!("Expected CosmicDust, got {:?}", other),
        }

        channels.dust_removed(2);
        match out_rx.recv().await.unwrap() {
            ServerMsg::DustRemove(id) => assert_eq!(id, 2),
            other => panic!("Expected DustRemove, got {:?}", other),
        }

        channels.add_particle(laser());
        match out_rx.recv().await.unwrap() {
            ServerMsg::AddParticle(p) => assert_eq!(p.owner_id, Some(1)),
            other => panic!("Expected AddParticle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sync_worker_reads_latest_snapshot() {
        let (channels, feeds) = client_channels(8);
        let (dust_tx, dust_rx) = watch::channel(dust_view(&[1, 2, 3]));
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let _workers = spawn_workers(feeds, dust_rx, out_tx);
        let _initial = out_rx.recv().await.unwrap();

        dust_tx.send_replace(dust_view(&[]));
        channels.request_dust_sync();
        match out_rx.recv().await.unwrap() {
            ServerMsg::CosmicDust(d) => assert!(d.is_empty()),
            other => panic!("Expected CosmicDust, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn workers_stop_when_channels_drop() {
        let (channels, feeds) = client_channels(8);
        let (_dust_tx, dust_rx) = watch::channel(dust_view(&[]));
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let workers = spawn_workers(feeds, dust_rx, out_tx);
        let _initial = out_rx.recv().await.unwrap();

        drop(channels);
        tokio::time::timeout(Duration::from_secs(1), workers.join())
            .await
            .expect("workers should exit once the ship's senders are gone");

        // All senders of `out` are gone with the workers
        assert!(out_rx.recv().await.is_none());
    }
}
