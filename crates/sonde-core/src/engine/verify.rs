//! Hardware-less verification entry point.
//!
//! Runs the grading engine over every milestone and derives the aggregate
//! verdict. Hardware-proof requirements are satisfied only by marker
//! presence; nothing in this path touches a bus or imports a driver.
//!
//! Exit code mapping:
//! - 0 → every milestone passed
//! - 1 → at least one milestone failed
//! - 2 → nothing failed, but at least one milestone was not attempted
//!
//! The 1/2 split keeps "file absent" distinguishable from "wrong answer"
//! for the CI caller.

use std::path::Path;

use anyhow::Result;
use tracing::warn;

use crate::CHECK_CATALOG_VERSION;
use crate::engine::milestone::{self, MilestoneReport, MilestoneStatus};
use crate::markers::store::MarkerStore;
use crate::report::model::{CatalogInfo, GradeReport, OverallStatus, SummaryInfo, ToolInfo};
use crate::rules::catalog::Catalog;

/// Run every milestone and assemble the grade report.
pub fn run_all(
    root: &Path,
    catalog: &Catalog,
    store: &MarkerStore,
    tool: ToolInfo,
) -> Result<GradeReport> {
    for drift in catalog.weight_warnings() {
        warn!("{drift}");
    }

    let mut milestones = Vec::with_capacity(catalog.milestones.len());
    for m in &catalog.milestones {
        milestones.push(milestone::run_milestone(m, root, store)?);
    }

    let summary = summarize(&milestones);

    Ok(GradeReport::new(
        tool,
        CatalogInfo {
            catalog_version: CHECK_CATALOG_VERSION.to_string(),
            ruleset: "standard".to_string(),
        },
        milestones,
        summary,
    ))
}

/// Derive the aggregate verdict from per-milestone reports.
///
/// Deterministic: same reports, same summary, independent of evaluation
/// order.
pub fn summarize(milestones: &[MilestoneReport]) -> SummaryInfo {
    let any_failed = milestones
        .iter()
        .any(|m| m.status == MilestoneStatus::Failed);
    let any_not_attempted = milestones
        .iter()
        .any(|m| m.status == MilestoneStatus::NotAttempted);

    let status = if any_failed {
        OverallStatus::Failed
    } else if any_not_attempted {
        OverallStatus::Incomplete
    } else {
        OverallStatus::Passed
    };

    let exit_code = match status {
        OverallStatus::Passed => 0,
        OverallStatus::Failed => 1,
        OverallStatus::Incomplete => 2,
    };

    SummaryInfo {
        status,
        total_score: milestones.iter().map(|m| m.score).sum(),
        max_score: milestones.iter().map(|m| m.max_points).sum(),
        milestones_passed: milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Passed)
            .count(),
        milestone_count: milestones.len(),
        exit_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::catalog::MilestoneId;

    fn mr(id: MilestoneId, status: MilestoneStatus, score: u32, max: u32) -> MilestoneReport {
        MilestoneReport {
            milestone_id: id,
            title: "t".to_string(),
            status,
            score,
            max_points: max,
            pass_threshold: max,
            artifact: None,
            syntax_error: None,
            checks: vec![],
        }
    }

    #[test]
    fn all_passed_exits_zero() {
        let s = summarize(&[
            mr(MilestoneId::Environment, MilestoneStatus::Passed, 25, 25),
            mr(MilestoneId::SensorReading, MilestoneStatus::Passed, 35, 35),
        ]);

        assert_eq!(s.status, OverallStatus::Passed);
        assert_eq!(s.exit_code, 0);
        assert_eq!(s.total_score, 60);
        assert_eq!(s.milestones_passed, 2);
    }

    #[test]
    fn any_failure_exits_one() {
        let s = summarize(&[
            mr(MilestoneId::Environment, MilestoneStatus::Passed, 25, 25),
            mr(MilestoneId::RetryQuality, MilestoneStatus::Failed, 20, 40),
            mr(
                MilestoneId::MultiSensor,
                MilestoneStatus::NotAttempted,
                0,
                25,
            ),
        ]);

        assert_eq!(s.status, OverallStatus::Failed);
        assert_eq!(s.exit_code, 1);
    }

    #[test]
    fn absence_without_failure_is_incomplete_not_failed() {
        let s = summarize(&[
            mr(
                MilestoneId::Environment,
                MilestoneStatus::NotAttempted,
                0,
                25,
            ),
            mr(
                MilestoneId::SensorReading,
                MilestoneStatus::NotAttempted,
                0,
                35,
            ),
        ]);

        assert_eq!(s.status, OverallStatus::Incomplete);
        assert_eq!(s.exit_code, 2);
        assert_eq!(s.total_score, 0);
    }

    #[test]
    fn summary_is_deterministic_for_same_input() {
        let reports = vec![
            mr(MilestoneId::Environment, MilestoneStatus::Passed, 25, 25),
            mr(MilestoneId::RetryQuality, MilestoneStatus::Failed, 10, 40),
        ];

        assert_eq!(summarize(&reports), summarize(&reports));
    }
}
