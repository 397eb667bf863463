//! Immutable feature-flag and page-visibility snapshots.
//!
//! A [`FeatureFlags`] value is never mutated after it is built. Reloading
//! produces a new snapshot that replaces the old one as a whole; readers
//! holding the previous `Arc` keep a consistent view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Gates the auto-save path (REST endpoint and WebSocket dialogs).
pub const FLAG_AUTOSAVE: &str = "autosave";

/// Gates realtime change notifications over WebSocket.
pub const FLAG_REALTIME: &str = "realtime";

/// Flags that are on unless a snapshot says otherwise.
pub const DEFAULT_ENABLED_FLAGS: &[&str] = &[FLAG_AUTOSAVE, FLAG_REALTIME];

/// On-disk shape of the flags file.
#[derive(Debug, Default, Deserialize)]
struct FlagsFile {
    #[serde(default)]
    flags: BTreeMap<String, bool>,
    #[serde(default)]
    pages: BTreeMap<String, bool>,
}

/// One loaded configuration snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureFlags {
    flags: BTreeMap<String, bool>,
    pages: BTreeMap<String, bool>,
    loaded_at: Timestamp,
}

impl FeatureFlags {
    /// Parse a snapshot from the JSON flags file format:
    ///
    /// ```json
    /// { "flags": { "autosave": true }, "pages": { "lab": false } }
    /// ```
    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        let file: FlagsFile = serde_json::from_str(raw)
            .map_err(|e| CoreError::Validation(format!("Invalid feature flags file: {e}")))?;
        Ok(Self::build(file.flags, file.pages))
    }

    fn build(mut flags: BTreeMap<String, bool>, pages: BTreeMap<String, bool>) -> Self {
        for name in DEFAULT_ENABLED_FLAGS {
            flags.entry((*name).to_string()).or_insert(true);
        }
        Self {
            flags,
            pages,
            loaded_at: chrono::Utc::now(),
        }
    }

    /// Whether a flag is on. Unknown flags are off.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    /// Whether a page is visible. Pages are visible unless hidden explicitly.
    pub fn is_page_visible(&self, page: &str) -> bool {
        self.pages.get(page).copied().unwrap_or(true)
    }

    pub fn loaded_at(&self) -> Timestamp {
        self.loaded_at
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::build(BTreeMap::new(), BTreeMap::new())
    }
}
