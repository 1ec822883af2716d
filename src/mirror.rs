//! Client-side mirror of the world.
//!
//! Holds an advisory copy of every player and collectible, rebuilt from server events.
//! The local player is moved optimistically from sampled input; everyone else is eased
//! toward their last server-reported position. Server data always wins.

use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::game::state::Collectible;
use crate::game::Position;
use crate::ws::protocol::{MovementPayload, ServerMsg};

/// Fraction of the remaining distance covered per rendered frame
pub const SMOOTHING_FACTOR: f64 = 0.15;
/// How often held keys are turned into a movement intent
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(1000 / 30);
/// Units moved per sample while a key is held
pub const MOVE_SPEED: f64 = 5.0;

/// A player as seen by this client
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredPlayer {
    /// Rendered position
    pub x: f64,
    pub y: f64,
    /// Last position reported by the server
    pub target_x: f64,
    pub target_y: f64,
    pub score: u32,
}

impl MirroredPlayer {
    fn at(x: f64, y: f64, score: u32) -> Self {
        Self {
            x,
            y,
            target_x: x,
            target_y: y,
            score,
        }
    }
}

/// Movement keys currently held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldKeys {
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    fn delta(&self) -> (f64, f64) {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -MOVE_SPEED,
            (false, true) => MOVE_SPEED,
            _ => 0.0,
        };
        (axis(self.left, self.right), axis(self.up, self.down))
    }
}

#[derive(Debug, Default)]
pub struct ClientMirror {
    self_id: Option<Uuid>,
    players: HashMap<Uuid, MirroredPlayer>,
    collectibles: Vec<Collectible>,
}

impl ClientMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn self_id(&self) -> Option<Uuid> {
        self.self_id
    }

    pub fn player(&self, id: &Uuid) -> Option<&MirroredPlayer> {
        self.players.get(id)
    }

    pub fn players(&self) -> &HashMap<Uuid, MirroredPlayer> {
        &self.players
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    /// Reconcile with one server event
    pub fn apply(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Init {
                id,
                players,
                collectibles,
            } => {
                self.self_id = Some(*id);
                self.players = players
                    .values()
                    .map(|p| (p.id, MirroredPlayer::at(p.x, p.y, p.score)))
                    .collect();
                self.collectibles = collectibles.clone();
            }
            ServerMsg::NewPlayer(player) => {
                self.players
                    .insert(player.id, MirroredPlayer::at(player.x, player.y, player.score));
            }
            ServerMsg::PlayerUpdate { id, x, y, score } => {
                let is_self = Some(*id) == self.self_id;
                let entry = self
                    .players
                    .entry(*id)
                    .or_insert_with(|| MirroredPlayer::at(*x, *y, *score));
                entry.score = *score;
                entry.target_x = *x;
                entry.target_y = *y;
                // Our own position from the server replaces the prediction outright
                if is_self {
                    entry.x = *x;
                    entry.y = *y;
                }
            }
            ServerMsg::PlayerDisconnect(id) => {
                self.players.remove(id);
            }
            ServerMsg::CollectibleUpdate {
                collected,
                replacement,
                player,
            } => {
                self.collectibles.retain(|c| c.id != *collected);
                if !self.collectibles.iter().any(|c| c.id == replacement.id) {
                    self.collectibles.push(replacement.clone());
                }
                if let Some(p) = self.players.get_mut(&player.id) {
                    p.score = player.score;
                }
            }
        }
    }

    /// Turn held keys into a movement intent, moving our own player optimistically.
    ///
    /// Call once per [`SAMPLE_INTERVAL`]. Returns `None` when nothing is held or the
    /// snapshot has not arrived yet.
    pub fn sample_input(&mut self, keys: HeldKeys) -> Option<MovementPayload> {
        if !keys.any() {
            return None;
        }

        let me = self.players.get_mut(&self.self_id?)?;
        let (dx, dy) = keys.delta();
        let predicted = Position::new(me.x + dx, me.y + dy).clamped();
        *me = MirroredPlayer::at(predicted.x, predicted.y, me.score);

        Some(MovementPayload::absolute(predicted.x, predicted.y, dx, dy))
    }

    /// Ease every other player toward their server position. Call once per frame.
    pub fn interpolate(&mut self) {
        let self_id = self.self_id;
        for (id, p) in self.players.iter_mut() {
            if Some(*id) == self_id {
                continue;
            }
            p.x += (p.target_x - p.x) * SMOOTHING_FACTOR;
            p.y += (p.target_y - p.y) * SMOOTHING_FACTOR;
        }
    }
}
