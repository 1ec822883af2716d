//! WebSocket transport: wire protocol, fan-out and connection handling

pub mod dispatch;
pub mod handler;
pub mod protocol;
