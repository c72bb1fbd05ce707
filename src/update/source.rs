//! # Update sources: where artifacts come from.
//!
//! [`UpdateSource`] abstracts the fetch capability of the update agent. The
//! crate ships [`FileSource`] for local artifacts; a deployment with real
//! transport substitutes its own implementation (HTTP, object store, …) and
//! the rest of the state machine is unchanged.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::UpdateError;

/// A fetched artifact inside the staging directory.
#[derive(Clone, Debug)]
pub struct Fetched {
    /// Path of the staged artifact file.
    pub path: PathBuf,
    /// Size in bytes, as reported by the transfer.
    pub bytes: u64,
}

/// Obtains an update artifact into a staging directory.
#[async_trait]
pub trait UpdateSource: Send + Sync + 'static {
    /// Fetches the artifact identified by `source` into `staging_dir`.
    ///
    /// `source` is an opaque reference whose meaning belongs to the
    /// implementation (a path for [`FileSource`], a URL elsewhere). Failures
    /// map to [`UpdateError::Fetch`].
    async fn fetch(&self, source: &str, staging_dir: &Path) -> Result<Fetched, UpdateError>;
}

/// Source reading artifacts from the local filesystem.
///
/// `source` is interpreted as a file path; the file is copied into the
/// staging directory under its own name.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSource;

impl FileSource {
    /// Creates a new file source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UpdateSource for FileSource {
    async fn fetch(&self, source: &str, staging_dir: &Path) -> Result<Fetched, UpdateError> {
        let src = Path::new(source);
        let name = src.file_name().ok_or_else(|| UpdateError::Fetch {
            detail: format!("source has no file name: {source}"),
        })?;

        let dest = staging_dir.join(name);
        let bytes = fs::copy(src, &dest).await.map_err(|e| UpdateError::Fetch {
            detail: format!("failed to copy {source}: {e}"),
        })?;

        Ok(Fetched { path: dest, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_the_artifact_into_staging() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tool");
        tokio::fs::write(&source, b"tool version 1.2.3").await.unwrap();
        let staging = dir.path().join("staging");
        tokio::fs::create_dir_all(&staging).await.unwrap();

        let fetched = FileSource::new()
            .fetch(source.to_str().unwrap(), &staging)
            .await
            .unwrap();

        assert_eq!(fetched.bytes, 18);
        assert_eq!(fetched.path, staging.join("tool"));
        let copied = tokio::fs::read(&fetched.path).await.unwrap();
        assert_eq!(copied, b"tool version 1.2.3");
    }

    #[tokio::test]
    async fn missing_source_is_fetch_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::new()
            .fetch(dir.path().join("absent").to_str().unwrap(), dir.path())
            .await
            .err()
            .unwrap();
        assert_eq!(err.as_label(), "fetch_failed");
    }
}
