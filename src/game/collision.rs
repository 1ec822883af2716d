//! Pickup detection

use super::state::Collectible;
use super::{Position, PICKUP_RADIUS};

/// Whether a player at `position` overlaps `collectible`
pub fn is_pickup(position: Position, collectible: &Collectible) -> bool {
    position.distance_to(collectible.position()) < PICKUP_RADIUS
}

/// Collectibles within pickup range of `position`.
///
/// Callers pass the already-clamped position. Linear scan; the collectible list is small
/// and fixed in size.
pub fn check_pickups(position: Position, collectibles: &[Collectible]) -> Vec<Collectible> {
    collectibles
        .iter()
        .filter(|c| is_pickup(position, c))
        .cloned()
        .collect()
}
