//! Attestation marker store.
//!
//! A directory of proof-of-execution records, one per verified capability.
//! Records are written only by the trusted local run and read (presence
//! and listing only, never content) by the hardware-less verifier. This
//! is the single channel by which "the hardware genuinely worked" crosses
//! the trust boundary.
//!
//! Record layout: `<root>/<capability>.txt`, first line
//! `Verified: <RFC 3339 timestamp>`, second line a free-text payload.
//! The payload is an audit trail only; it carries no authority.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;

const RECORD_EXT: &str = "txt";

#[derive(Debug, Clone)]
pub struct MarkerStore {
    root: PathBuf,
}

/// A parsed marker record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    pub verified_at: String,
    pub payload: String,
}

impl MarkerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write (or refresh) the record for a capability.
    ///
    /// Creates the store directory if absent; a repeated write for the
    /// same capability overwrites in place, so re-running local
    /// validation just refreshes the timestamp.
    pub fn write(&self, capability: &str, payload: &str) -> Result<()> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!("failed to create marker store: {}", self.root.display())
        })?;

        let path = self.record_path(capability);
        let stamp = Utc::now().to_rfc3339();
        fs::write(&path, format!("Verified: {stamp}\n{payload}\n"))
            .with_context(|| format!("failed to write marker: {}", path.display()))?;

        debug!(capability, "marker written");
        Ok(())
    }

    pub fn exists(&self, capability: &str) -> bool {
        self.record_path(capability).is_file()
    }

    /// Names of all capabilities with a record, sorted for deterministic
    /// output. Empty (not an error) when the store directory is absent.
    pub fn list_capabilities(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == RECORD_EXT))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }

    pub fn is_populated(&self) -> bool {
        !self.list_capabilities().is_empty()
    }

    /// Read a record back, for audit display and tests.
    pub fn read(&self, capability: &str) -> Result<MarkerRecord> {
        let path = self.record_path(capability);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read marker: {}", path.display()))?;

        let mut lines = content.lines();
        let verified_at = lines
            .next()
            .and_then(|l| l.strip_prefix("Verified: "))
            .unwrap_or_default()
            .to_string();
        let payload = lines.next().unwrap_or_default().to_string();

        Ok(MarkerRecord {
            verified_at,
            payload,
        })
    }

    fn record_path(&self, capability: &str) -> PathBuf {
        self.root.join(format!("{capability}.{RECORD_EXT}"))
    }
}
