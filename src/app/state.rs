//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameWorld, WorldHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: WorldHandle,
}

impl AppState {
    /// Build state plus the world task the caller must spawn
    pub fn new(config: Config) -> (Self, GameWorld) {
        let config = Arc::new(config);

        let (world_task, world) = GameWorld::new(config.collectible_count, config.world_seed);

        (Self { config, world }, world_task)
    }
}
