use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::{fs, io::ErrorKind, path::Path};

use crate::report::model::{ArtifactHash, ArtifactInfo};

/// A loaded submission file.
///
/// Holds the exact text analyzed and a cryptographic fingerprint that
/// uniquely identifies the submitted bytes.
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    /// Source path (informational only).
    pub path: String,

    /// Text decoded from the file bytes.
    pub text: String,

    /// Size of the file in bytes.
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of the raw bytes.
    pub hash_hex: String,
}

impl SourceArtifact {
    /// Report-facing artifact metadata.
    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            path: self.path.clone(),
            size_bytes: self.size_bytes,
            hash: ArtifactHash {
                algorithm: "sha256".to_string(),
                value: self.hash_hex.clone(),
            },
        }
    }
}

/// Load a submission file and compute a stable identity for it.
///
/// A missing file is `Ok(None)` — submissions arrive incrementally and
/// absence degrades to a skip upstream, never a hard error. The identity
/// depends only on the file bytes; filesystem metadata is ignored.
/// Non-UTF-8 bytes are replaced rather than rejected so an odd encoding
/// still gets graded.
pub fn load_source(path: &Path) -> Result<Option<SourceArtifact>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read submission: {}", path.display()));
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();

    Ok(Some(SourceArtifact {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
        text: String::from_utf8_lossy(&bytes).into_owned(),
        hash_hex: hex::encode(digest),
    }))
}
