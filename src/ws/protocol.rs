//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::game::state::{Collectible, Player};

/// Direction for the legacy relative movement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMsg {
    /// Position intent
    Movement(MovementPayload),
}

/// Raw movement payload as sent by clients.
///
/// Current clients send an absolute target (`x`, `y`, plus advisory deltas); older
/// ones send `direction` and `speed`. Use [`MovementPayload::intent`] to resolve it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// A resolved movement intent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementIntent {
    /// Move to this target (clamped by the server)
    Absolute { x: f64, y: f64 },
    /// Step `speed` units along one axis
    Relative { direction: Direction, speed: f64 },
}

impl MovementPayload {
    pub fn absolute(x: f64, y: f64, delta_x: f64, delta_y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            delta_x: Some(delta_x),
            delta_y: Some(delta_y),
            ..Self::default()
        }
    }

    pub fn relative(direction: Direction, speed: f64) -> Self {
        Self {
            direction: Some(direction),
            speed: Some(speed),
            ..Self::default()
        }
    }

    /// Absolute mode wins when both coordinates are present; relative is the fallback.
    /// Returns `None` for malformed payloads, including non-finite numbers.
    pub fn intent(&self) -> Option<MovementIntent> {
        if let (Some(x), Some(y)) = (self.x, self.y) {
            if x.is_finite() && y.is_finite() {
                return Some(MovementIntent::Absolute { x, y });
            }
            return None;
        }

        match (self.direction, self.speed) {
            (Some(direction), Some(speed)) if speed.is_finite() => {
                Some(MovementIntent::Relative { direction, speed })
            }
            _ => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMsg {
    /// Full snapshot, sent once to a new connection
    Init {
        /// The receiving connection's own player id
        id: Uuid,
        players: HashMap<Uuid, Player>,
        collectibles: Vec<Collectible>,
    },

    /// A player joined
    NewPlayer(Player),

    /// Another player's authoritative position and score
    PlayerUpdate {
        id: Uuid,
        x: f64,
        y: f64,
        score: u32,
    },

    /// A player left; payload is the player id
    PlayerDisconnect(Uuid),

    /// A collectible was picked up and replaced
    CollectibleUpdate {
        collected: u64,
        #[serde(rename = "new")]
        replacement: Collectible,
        player: ScoreUpdate,
    },
}

/// Collector's new score inside a `collectible-update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub id: Uuid,
    pub score: u32,
}

impl ServerMsg {
    pub fn player_update(player: &Player) -> Self {
        Self::PlayerUpdate {
            id: player.id,
            x: player.x,
            y: player.y,
            score: player.score,
        }
    }

    /// Wire name of the event
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::NewPlayer(_) => "new-player",
            Self::PlayerUpdate { .. } => "player-update",
            Self::PlayerDisconnect(_) => "player-disconnect",
            Self::CollectibleUpdate { .. } => "collectible-update",
        }
    }
}
