//! Active model reference with atomic replacement
//!
//! Readers take a lock-free snapshot (`get`) and keep scoring against it even
//! if a swap happens mid-call. Writers build the new artifact completely,
//! then publish it in one store. A single-writer mutex serializes reloads so
//! two retrain notifications cannot interleave their load-and-publish steps.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::info;

use super::{ModelArtifact, ModelInfo};
use crate::error::Result;

/// Injectable "current model" handle
pub struct ModelHandle {
    active: ArcSwapOption<ModelArtifact>,
    writer: Mutex<()>,
}

impl ModelHandle {
    /// Handle with no model loaded (heuristic scoring only)
    pub fn empty() -> Self {
        Self {
            active: ArcSwapOption::from(None),
            writer: Mutex::new(()),
        }
    }

    pub fn with_model(model: ModelArtifact) -> Self {
        Self {
            active: ArcSwapOption::from(Some(Arc::new(model))),
            writer: Mutex::new(()),
        }
    }

    /// Snapshot of the active model (non-blocking)
    pub fn get(&self) -> Option<Arc<ModelArtifact>> {
        self.active.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.active.load().is_some()
    }

    pub fn info(&self) -> Option<ModelInfo> {
        self.get().map(|m| m.info())
    }

    /// Version string of the active model
    pub fn version(&self) -> Option<String> {
        self.get().map(|m| m.version.clone())
    }

    /// Publish a fully built model, returning the one it replaced
    pub fn replace(&self, model: ModelArtifact) -> Option<Arc<ModelArtifact>> {
        let _guard = self.writer.lock();
        self.publish(model)
    }

    /// Load from disk and publish. On failure the active model is untouched.
    pub fn load_from(&self, path: &Path) -> Result<ModelInfo> {
        let _guard = self.writer.lock();
        let model = ModelArtifact::load(path)?;
        let info = model.info();
        self.publish(model);
        Ok(info)
    }

    /// Drop the active model
    pub fn clear(&self) -> Option<Arc<ModelArtifact>> {
        let _guard = self.writer.lock();
        let previous = self.active.swap(None);
        if let Some(prev) = &previous {
            info!(version = %prev.version, "Model cleared");
        }
        previous
    }

    fn publish(&self, model: ModelArtifact) -> Option<Arc<ModelArtifact>> {
        let version = model.version.clone();
        let previous = self.active.swap(Some(Arc::new(model)));
        info!(
            version = %version,
            previous = previous.as_ref().map(|m| m.version.as_str()).unwrap_or("none"),
            "Model swapped in"
        );
        previous
    }
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::tests::sample_artifact;

    #[test]
    fn test_empty_handle() {
        let handle = ModelHandle::empty();
        assert!(!handle.is_loaded());
        assert!(handle.get().is_none());
        assert!(handle.info().is_none());
        assert!(handle.version().is_none());
    }

    #[test]
    fn test_replace_returns_previous() {
        let handle = ModelHandle::with_model(sample_artifact());
        let mut next = sample_artifact();
        next.version = "test-2".to_string();

        let previous = handle.replace(next).unwrap();
        assert_eq!(previous.version, "test-1");
        assert_eq!(handle.version().as_deref(), Some("test-2"));
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let handle = ModelHandle::with_model(sample_artifact());
        let snapshot = handle.get().unwrap();
        let mut next = sample_artifact();
        next.version = "test-2".to_string();
        handle.replace(next);

        assert_eq!(snapshot.version, "test-1");
        assert_eq!(handle.get().unwrap().version, "test-2");
    }

    #[test]
    fn test_failed_load_keeps_active_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"version\": \"x\"}").unwrap();

        let handle = ModelHandle::with_model(sample_artifact());
        assert!(matches!(
            handle.load_from(&path),
            Err(Error::MalformedArtifact(_))
        ));
        assert_eq!(handle.get().unwrap().version, "test-1");
    }

    #[test]
    fn test_clear() {
        let handle = ModelHandle::with_model(sample_artifact());
        assert!(handle.clear().is_some());
        assert!(!handle.is_loaded());
        assert!(handle.clear().is_none());
    }
}
