//! Outbound fan-out to connected sessions

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use super::protocol::ServerMsg;

/// Per-connection outbound queue depth
pub const OUTBOUND_BUFFER: usize = 256;

pub type OutboundTx = mpsc::Sender<Arc<ServerMsg>>;
pub type OutboundRx = mpsc::Receiver<Arc<ServerMsg>>;

/// Create the queue a connection's writer task drains
pub fn outbound_channel() -> (OutboundTx, OutboundRx) {
    mpsc::channel(OUTBOUND_BUFFER)
}

/// Who receives a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    /// Only this session
    Only(Uuid),
    /// Every session but this one
    AllExcept(Uuid),
    /// Every registered session
    All,
}

impl Recipients {
    pub fn includes(&self, session_id: &Uuid) -> bool {
        match self {
            Recipients::Only(id) => id == session_id,
            Recipients::AllExcept(id) => id != session_id,
            Recipients::All => true,
        }
    }
}

/// An addressed outbound message
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub to: Recipients,
    pub msg: ServerMsg,
}

impl Dispatch {
    pub fn only(session_id: Uuid, msg: ServerMsg) -> Self {
        Self {
            to: Recipients::Only(session_id),
            msg,
        }
    }

    pub fn all_except(session_id: Uuid, msg: ServerMsg) -> Self {
        Self {
            to: Recipients::AllExcept(session_id),
            msg,
        }
    }

    pub fn all(msg: ServerMsg) -> Self {
        Self {
            to: Recipients::All,
            msg,
        }
    }
}

/// Routes dispatches into per-session queues.
///
/// Sends never block. A session whose queue overflows has already missed a message and
/// can no longer mirror the world, so it is evicted: its sender is dropped, which ends
/// its writer task and closes the socket. Evicted ids are kept until [`take_evicted`]
/// so the owner can retire the player.
///
/// [`take_evicted`]: Dispatcher::take_evicted
#[derive(Debug, Default)]
pub struct Dispatcher {
    sessions: HashMap<Uuid, OutboundTx>,
    evicted: Vec<Uuid>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, session_id: Uuid, outbound: OutboundTx) {
        self.sessions.insert(session_id, outbound);
    }

    pub fn unregister(&mut self, session_id: &Uuid) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Deliver one dispatch, returning how many sessions accepted it
    pub fn dispatch(&mut self, dispatch: Dispatch) -> usize {
        let event = dispatch.msg.event_name();
        let msg = Arc::new(dispatch.msg);
        let mut delivered = 0;
        let mut overflowed = Vec::new();

        for (session_id, tx) in &self.sessions {
            if !dispatch.to.includes(session_id) {
                continue;
            }

            match tx.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(session_id = %session_id, event, "Outbound queue full, evicting session");
                    overflowed.push(*session_id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(session_id = %session_id, event, "Outbound queue closed");
                }
            }
        }

        for session_id in overflowed {
            self.sessions.remove(&session_id);
            self.evicted.push(session_id);
        }

        delivered
    }

    pub fn dispatch_all(&mut self, dispatches: impl IntoIterator<Item = Dispatch>) {
        for dispatch in dispatches {
            self.dispatch(dispatch);
        }
    }

    /// Sessions evicted for overflow since the last call
    pub fn take_evicted(&mut self) -> Vec<Uuid> {
        std::mem::take(&mut self.evicted)
    }
}
