//! # Artifact verification.
//!
//! [`Verifier`] abstracts the integrity/authenticity check between fetch and
//! extraction. [`Sha256Verifier`] computes (and optionally enforces) a
//! SHA-256 digest; [`NoopVerifier`] is the minimal/local-source
//! configuration — the verify phase event is still emitted by the agent for
//! observability parity, it just carries no checksum.

use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::error::UpdateError;

/// Validates a fetched artifact before it may be staged further.
#[async_trait]
pub trait Verifier: Send + Sync + 'static {
    /// Checks `artifact`, returning its checksum when one was computed.
    ///
    /// Failures map to [`UpdateError::Verify`].
    async fn verify(&self, artifact: &Path) -> Result<Option<String>, UpdateError>;
}

/// Verifier that accepts everything and computes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopVerifier;

#[async_trait]
impl Verifier for NoopVerifier {
    async fn verify(&self, _artifact: &Path) -> Result<Option<String>, UpdateError> {
        Ok(None)
    }
}

/// SHA-256 verifier.
///
/// Always computes the digest (hex, lowercase) so it can be recorded in the
/// completion event. With an expected digest configured, a mismatch fails
/// verification.
#[derive(Clone, Debug, Default)]
pub struct Sha256Verifier {
    expected: Option<String>,
}

impl Sha256Verifier {
    /// Computes digests without enforcing an expectation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enforces `digest` (hex, case-insensitive) on every artifact.
    pub fn expecting(digest: impl Into<String>) -> Self {
        Self {
            expected: Some(digest.into()),
        }
    }
}

#[async_trait]
impl Verifier for Sha256Verifier {
    async fn verify(&self, artifact: &Path) -> Result<Option<String>, UpdateError> {
        let data = fs::read(artifact).await.map_err(|e| UpdateError::Verify {
            detail: format!("failed to read {}: {e}", artifact.display()),
        })?;
        let digest = hex::encode(Sha256::digest(&data));

        if let Some(expected) = &self.expected {
            if !expected.eq_ignore_ascii_case(&digest) {
                return Err(UpdateError::Verify {
                    detail: format!("checksum mismatch: expected {expected}, got {digest}"),
                });
            }
        }
        Ok(Some(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn artifact(content: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact");
        tokio::fs::write(&path, content).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn noop_reports_no_checksum() {
        let (_dir, path) = artifact(b"anything").await;
        assert_eq!(NoopVerifier.verify(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sha256_computes_a_stable_digest() {
        let (_dir, path) = artifact(b"tool version 9.9.9").await;
        let digest = Sha256Verifier::new().verify(&path).await.unwrap().unwrap();

        let expected = hex::encode(Sha256::digest(b"tool version 9.9.9"));
        assert_eq!(digest, expected);
    }

    #[tokio::test]
    async fn matching_expectation_passes() {
        let (_dir, path) = artifact(b"payload").await;
        let digest = hex::encode(Sha256::digest(b"payload"));

        let checked = Sha256Verifier::expecting(digest.to_uppercase())
            .verify(&path)
            .await
            .unwrap();
        assert_eq!(checked, Some(digest));
    }

    #[tokio::test]
    async fn mismatch_is_verify_failed() {
        let (_dir, path) = artifact(b"payload").await;
        let err = Sha256Verifier::expecting("deadbeef")
            .verify(&path)
            .await
            .err()
            .unwrap();
        assert_eq!(err.as_label(), "verify_failed");
    }
}
