//! On-disk artifact layout: one `<id>.pdf` or `<id>.txt` per paper.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::acquisition::AcquireError;
use crate::identity;

/// Kind of file written for a paper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Pdf,
    Abstract,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Abstract => "txt",
        }
    }
}

/// Writes artifacts under a download directory
///
/// Writes for the same identifier are serialized and land through a
/// temporary file plus rename, so a reader never sees a half-written file and
/// a later acquisition replaces the earlier one.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the artifact of `kind` for `id` lives
    pub fn path_for(&self, id: &str, kind: ArtifactKind) -> Result<PathBuf, AcquireError> {
        if !identity::is_filename_safe(id) {
            return Err(AcquireError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", id, kind.extension())))
    }

    /// An existing artifact for `id`, preferring the PDF
    pub fn find_existing(&self, id: &str) -> Option<PathBuf> {
        [ArtifactKind::Pdf, ArtifactKind::Abstract]
            .into_iter()
            .filter_map(|kind| self.path_for(id, kind).ok())
            .find(|path| path.is_file())
    }

    /// Persist `bytes` as the artifact of `kind` for `id`
    pub async fn write(
        &self,
        id: &str,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<PathBuf, AcquireError> {
        let path = self.path_for(id, kind)?;
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.write_locked(path, kind, bytes).await
        };
        self.release(id, lock);
        result
    }

    async fn write_locked(
        &self,
        path: PathBuf,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<PathBuf, AcquireError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let partial = path.with_extension(format!("{}.part", kind.extension()));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    fn lock_for(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    /// Forget the lock for `id` once no other writer holds or awaits it
    fn release(&self, id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let idle = locks
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(entry) == 2);
        if idle {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("downloads"));

        assert!(store.find_existing("10.1000abc").is_none());
        let path = store
            .write("10.1000abc", ArtifactKind::Abstract, b"An abstract.")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("downloads").join("10.1000abc.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "An abstract.");
        assert_eq!(store.find_existing("10.1000abc"), Some(path));
    }

    #[tokio::test]
    async fn test_later_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        store.write("p1", ArtifactKind::Pdf, b"%PDF-1 old").await.unwrap();
        let path = store.write("p1", ArtifactKind::Pdf, b"%PDF-1 new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1 new");
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writes_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let writers = (0..8).map(|n| {
            let store = store.clone();
            tokio::spawn(async move {
                let body = format!("version {}", n);
                store
                    .write("shared", ArtifactKind::Abstract, body.as_bytes())
                    .await
                    .unwrap()
            })
        });
        for handle in writers.collect::<Vec<_>>() {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join("shared.txt")).unwrap();
        assert!(content.starts_with("version "));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(store.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_locks_released_after_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        for n in 0..50 {
            store
                .write(&format!("paper{}", n), ArtifactKind::Abstract, b"text")
                .await
                .unwrap();
        }
        assert_eq!(store.tracked_locks(), 0);

        // A failing write releases its lock too
        let blocked = ArtifactStore::new(dir.path().join("paper0.txt").join("nested"));
        assert!(blocked.write("p2", ArtifactKind::Pdf, b"%PDF").await.is_err());
        assert_eq!(blocked.tracked_locks(), 0);
    }

    #[test]
    fn test_rejects_unsafe_id() {
        let store = ArtifactStore::new("/tmp");
        assert!(matches!(
            store.path_for("../etc/passwd", ArtifactKind::Pdf),
            Err(AcquireError::InvalidId(_))
        ));
    }
}
