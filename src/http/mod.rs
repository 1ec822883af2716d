//! HTTP surface: health, static client files and the WebSocket endpoint

pub mod middleware;
pub mod routes;

pub use routes::build_router;
