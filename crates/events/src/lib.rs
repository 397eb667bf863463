//! Change-event bus for draft form writes.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ChangeEvent`]: one committed insert, update or delete on a form table.
//! - [`EventPersistence`]: background service appending every event to
//!   `draft_form_events`.

pub mod bus;
pub mod persistence;

pub use bus::{ChangeEvent, ChangeOp, EventBus};
pub use persistence::EventPersistence;
