//! Collectible Arena - authoritative real-time multiplayer game server
//!
//! Players move around a bounded arena over WebSocket and race to pick up collectibles.
//! The server owns every position and score:
//! - `game`: world store, collectible spawning, pickup detection, session lifecycle
//! - `ws`: wire protocol, addressed fan-out, socket handling
//! - `http`: health, static client and routing
//! - `mirror`: the client-side reconciliation model consuming the protocol

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod mirror;
pub mod util;
pub mod ws;
