//! Game simulation modules

pub mod collectible;
pub mod collision;
pub mod session;
pub mod state;
pub mod world;

pub use collectible::CollectibleGenerator;
pub use session::SessionManager;
pub use state::{Collectible, Player, WorldState};
pub use world::{GameWorld, WorldError, WorldHandle};

use uuid::Uuid;

use crate::ws::dispatch::OutboundTx;
use crate::ws::protocol::MovementPayload;

/// Canvas width in world units
pub const WORLD_WIDTH: f64 = 640.0;
/// Canvas height in world units
pub const WORLD_HEIGHT: f64 = 480.0;
/// Distance kept between a player's centre and the canvas edge
pub const EDGE_MARGIN: f64 = 20.0;

pub const MIN_X: f64 = EDGE_MARGIN;
pub const MAX_X: f64 = WORLD_WIDTH - EDGE_MARGIN;
pub const MIN_Y: f64 = EDGE_MARGIN;
pub const MAX_Y: f64 = WORLD_HEIGHT - EDGE_MARGIN;

/// Pickup happens when the distance is strictly below this
pub const PICKUP_RADIUS: f64 = 20.0;

/// A point in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp into the playable area
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(MIN_X, MAX_X),
            y: self.y.clamp(MIN_Y, MAX_Y),
        }
    }

    pub fn distance_to(&self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Event received from a connection task, handled by the world task in arrival order
#[derive(Debug)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub kind: SessionEventKind,
    pub received_at: u64,
}

#[derive(Debug)]
pub enum SessionEventKind {
    /// Socket accepted; carries the queue the dispatcher writes this session's messages into
    Connect { outbound: OutboundTx },
    Movement(MovementPayload),
    Disconnect,
}
