//! Authoritative world store: players and active collectibles

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::Position;

/// Player record (authoritative copy lives only in [`WorldState`])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub x: f64,
    pub y: f64,
    pub score: u32,
}

impl Player {
    pub fn new(id: Uuid, spawn: Position) -> Self {
        let spawn = spawn.clamped();
        Self {
            id,
            x: spawn.x,
            y: spawn.y,
            score: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Position) {
        self.x = position.x;
        self.y = position.y;
    }
}

/// A pickup worth `value` points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub value: u32,
}

impl Collectible {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// In-memory world. Performs no validation; the session manager keeps the invariants.
#[derive(Debug, Default)]
pub struct WorldState {
    players: HashMap<Uuid, Player>,
    collectibles: Vec<Collectible>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &Uuid) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Insert or replace a player record
    pub fn set_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn remove_player(&mut self, id: &Uuid) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn contains_player(&self, id: &Uuid) -> bool {
        self.players.contains_key(id)
    }

    pub fn players(&self) -> &HashMap<Uuid, Player> {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn collectible_count(&self) -> usize {
        self.collectibles.len()
    }

    pub fn add_collectible(&mut self, collectible: Collectible) {
        self.collectibles.push(collectible);
    }

    pub fn remove_collectible(&mut self, id: u64) -> Option<Collectible> {
        let pos = self.collectibles.iter().position(|c| c.id == id)?;
        Some(self.collectibles.remove(pos))
    }
}
