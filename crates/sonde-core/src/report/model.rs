use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;
use crate::engine::milestone::MilestoneReport;

/// Top-level grade report.
///
/// This struct is the stable JSON contract consumed by the CI caller.
/// It must remain deterministic for identical submission trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub catalog: CatalogInfo,
    pub milestones: Vec<MilestoneReport>,
    pub summary: SummaryInfo,
}

impl GradeReport {
    pub fn new(
        tool: ToolInfo,
        catalog: CatalogInfo,
        milestones: Vec<MilestoneReport>,
        summary: SummaryInfo,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            catalog,
            milestones,
            summary,
        }
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    pub commit: Option<String>,
}

/// Submission file metadata bound to a milestone report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: String,
    pub size_bytes: u64,
    pub hash: ArtifactHash,
}

/// Cryptographic artifact fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHash {
    pub algorithm: String,
    pub value: String,
}

/// Check catalogue metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogInfo {
    pub catalog_version: String,
    pub ruleset: String,
}

/// Aggregate verdict across all milestones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Passed,
    Failed,
    /// Nothing failed, but at least one milestone was never attempted.
    /// Kept distinct from `Failed` so CI can tell "absent" from "wrong".
    Incomplete,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string(self).unwrap().trim_matches('"')
        )
    }
}

/// Final summary block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryInfo {
    pub status: OverallStatus,
    pub total_score: u32,
    pub max_score: u32,
    pub milestones_passed: usize,
    pub milestone_count: usize,
    pub exit_code: i32,
}
