//! Process-wide holder for the current [`FeatureFlags`] snapshot.
//!
//! Readers take an `Arc` to the snapshot that was current when they asked;
//! a reload builds a fresh snapshot and swaps it in as a whole.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chairside_core::error::CoreError;
use chairside_core::feature_flags::FeatureFlags;

pub struct FeatureFlagStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<FeatureFlags>>,
}

impl FeatureFlagStore {
    /// A store serving `flags` with no backing file. Reloads keep defaults.
    pub fn fixed(flags: FeatureFlags) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(flags)),
        }
    }

    /// Load the initial snapshot from `path`, or defaults when `None`.
    pub async fn load(path: Option<PathBuf>) -> Result<Self, CoreError> {
        let flags = match &path {
            Some(p) => read_flags_file(p).await?,
            None => FeatureFlags::default(),
        };
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(flags)),
        })
    }

    /// The snapshot in effect right now.
    pub fn current(&self) -> Arc<FeatureFlags> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_enabled(&self, flag: &str) -> bool {
        self.current().is_enabled(flag)
    }

    /// Re-read the flags file and swap in the new snapshot.
    ///
    /// On a read or parse failure the previous snapshot stays in effect.
    pub async fn reload(&self) -> Result<Arc<FeatureFlags>, CoreError> {
        let flags = match &self.path {
            Some(p) => read_flags_file(p).await?,
            None => FeatureFlags::default(),
        };
        let flags = Arc::new(flags);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&flags);
        tracing::info!(path = ?self.path, "Feature flags reloaded");
        Ok(flags)
    }
}

async fn read_flags_file(path: &Path) -> Result<FeatureFlags, CoreError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        CoreError::Internal(format!(
            "Failed to read feature flags file {}: {e}",
            path.display()
        ))
    })?;
    FeatureFlags::from_json_str(&raw)
}

#[cfg(test)]
mod tests {
    use chairside_core::feature_flags::FLAG_AUTOSAVE;

    use super::*;

    fn write_flags(file: &tempfile::NamedTempFile, body: &str) {
        std::fs::write(file.path(), body).unwrap();
    }

    #[tokio::test]
    async fn missing_path_serves_defaults() {
        let store = FeatureFlagStore::load(None).await.unwrap();
        assert!(store.is_enabled(FLAG_AUTOSAVE));
    }

    #[tokio::test]
    async fn reload_swaps_snapshot_and_keeps_old_readers_consistent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_flags(&file, r#"{"flags": {"autosave": true}}"#);

        let store = FeatureFlagStore::load(Some(file.path().to_path_buf()))
            .await
            .unwrap();
        let before = store.current();

        write_flags(&file, r#"{"flags": {"autosave": false}}"#);
        store.reload().await.unwrap();

        assert!(before.is_enabled(FLAG_AUTOSAVE));
        assert!(!store.is_enabled(FLAG_AUTOSAVE));
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_flags(&file, r#"{"flags": {"autosave": false}}"#);
        let store = FeatureFlagStore::load(Some(file.path().to_path_buf()))
            .await
            .unwrap();

        write_flags(&file, "not json");
        assert!(store.reload().await.is_err());
        assert!(!store.is_enabled(FLAG_AUTOSAVE));
    }

    #[tokio::test]
    async fn unreadable_file_fails_initial_load() {
        let err = FeatureFlagStore::load(Some(PathBuf::from("/nonexistent/flags.json")))
            .await
            .err()
            .expect("load should fail");
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
