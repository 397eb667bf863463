//! WebSocket infrastructure: connection management, heartbeat, the upgrade
//! handler, and per-connection form dialog sessions.

mod dialogs;
mod handler;
mod heartbeat;
pub mod manager;
pub mod messages;

pub use dialogs::DialogRegistry;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
