//! World task: the single owner of the authoritative state

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::util::time::unix_millis;
use crate::ws::dispatch::{Dispatcher, OutboundTx};
use crate::ws::protocol::MovementPayload;

use super::session::SessionManager;
use super::{SessionEvent, SessionEventKind};

/// Inbound event queue depth
const EVENT_BUFFER: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("World task is no longer running")]
    Closed,
}

/// Counters published by the world task for the health endpoint
#[derive(Debug, Default)]
pub struct WorldStats {
    players: AtomicUsize,
    collectibles: AtomicUsize,
}

impl WorldStats {
    pub fn players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    pub fn collectibles(&self) -> usize {
        self.collectibles.load(Ordering::Relaxed)
    }
}

/// Cloneable handle used by connection tasks to talk to the world task
#[derive(Clone)]
pub struct WorldHandle {
    events_tx: mpsc::Sender<SessionEvent>,
    stats: Arc<WorldStats>,
}

impl WorldHandle {
    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }

    async fn send(&self, session_id: Uuid, kind: SessionEventKind) -> Result<(), WorldError> {
        self.events_tx
            .send(SessionEvent {
                session_id,
                kind,
                received_at: unix_millis(),
            })
            .await
            .map_err(|_| WorldError::Closed)
    }

    /// Register a session; its messages will be written into `outbound`
    pub async fn connect(&self, session_id: Uuid, outbound: OutboundTx) -> Result<(), WorldError> {
        self.send(session_id, SessionEventKind::Connect { outbound })
            .await
    }

    pub async fn movement(
        &self,
        session_id: Uuid,
        payload: MovementPayload,
    ) -> Result<(), WorldError> {
        self.send(session_id, SessionEventKind::Movement(payload))
            .await
    }

    pub async fn disconnect(&self, session_id: Uuid) -> Result<(), WorldError> {
        self.send(session_id, SessionEventKind::Disconnect).await
    }
}

/// The authoritative world. Events are handled one at a time, each to completion.
pub struct GameWorld {
    sessions: SessionManager,
    dispatcher: Dispatcher,
    events_rx: mpsc::Receiver<SessionEvent>,
    stats: Arc<WorldStats>,
}

impl GameWorld {
    pub fn new(collectible_count: usize, seed: u64) -> (Self, WorldHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let stats = Arc::new(WorldStats::default());

        let handle = WorldHandle {
            events_tx,
            stats: stats.clone(),
        };

        let world = Self {
            sessions: SessionManager::new(collectible_count, seed),
            dispatcher: Dispatcher::new(),
            events_rx,
            stats,
        };
        world.publish_stats();

        (world, handle)
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!(
            collectibles = self.sessions.world().collectible_count(),
            "World started"
        );

        while let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }

        info!("World stopped");
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let SessionEvent {
            session_id,
            kind,
            received_at,
        } = event;

        let dispatches = match kind {
            SessionEventKind::Connect { outbound } => {
                self.dispatcher.register(session_id, outbound);
                self.sessions.connect(session_id)
            }
            SessionEventKind::Movement(payload) => self.sessions.movement(session_id, &payload),
            SessionEventKind::Disconnect => {
                self.dispatcher.unregister(&session_id);
                self.sessions.disconnect(session_id)
            }
        };

        debug!(
            session_id = %session_id,
            queued_ms = unix_millis().saturating_sub(received_at),
            outbound = dispatches.len(),
            "Event handled"
        );

        self.dispatcher.dispatch_all(dispatches);
        self.retire_evicted();
        self.publish_stats();
    }

    /// Remove players whose outbound queue overflowed. Their own disconnect event,
    /// sent once the socket closes, then finds nothing to remove.
    fn retire_evicted(&mut self) {
        loop {
            let evicted = self.dispatcher.take_evicted();
            if evicted.is_empty() {
                break;
            }

            for session_id in evicted {
                info!(session_id = %session_id, "Retiring session that fell behind");
                let dispatches = self.sessions.disconnect(session_id);
                self.dispatcher.dispatch_all(dispatches);
            }
        }
    }

    fn publish_stats(&self) {
        let world = self.sessions.world();
        self.stats
            .players
            .store(world.player_count(), Ordering::Relaxed);
        self.stats
            .collectibles
            .store(world.collectible_count(), Ordering::Relaxed);
    }
}
