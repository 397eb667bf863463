//! Chairside domain core.
//!
//! Zero internal dependencies: the form catalog, draft lifecycle rules,
//! the auto-save controller, capability checks and configuration
//! snapshots shared by the database, event and API crates.

pub mod autosave;
pub mod capabilities;
pub mod eastern_time;
pub mod error;
pub mod feature_flags;
pub mod form_status;
pub mod forms;
pub mod pagination;
pub mod types;
