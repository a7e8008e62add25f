//! Milestone evaluation.
//!
//! Runs every check of one milestone against the submission tree and
//! aggregates the outcomes into a report:
//!
//! - missing artifact → every check skipped, status `NotAttempted`
//! - malformed source → one diagnostic, source-pattern checks skipped
//! - failed required check → status `Failed` regardless of points
//! - otherwise pass iff the score meets the milestone threshold
//!
//! Per-check failures are collected, never propagated: partial credit
//! requires complete information, so a failing check must not hide the
//! results of the others.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::artifact;
use crate::engine::syntax::{self, SyntaxDiagnostic};
use crate::markers::store::MarkerStore;
use crate::report::model::ArtifactInfo;
use crate::rules::catalog::{CheckPolicy, Milestone, MilestoneId};
use crate::rules::eval::{self, CheckOutcome, EvalContext, EvaluationResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    Passed,
    Failed,
    /// The submission file does not exist. Not a failure: the grading
    /// population submits incrementally.
    NotAttempted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneReport {
    pub milestone_id: MilestoneId,
    pub title: String,
    pub status: MilestoneStatus,
    pub score: u32,
    pub max_points: u32,
    pub pass_threshold: u32,
    pub artifact: Option<ArtifactInfo>,
    pub syntax_error: Option<SyntaxDiagnostic>,
    pub checks: Vec<EvaluationResult>,
}

impl MilestoneReport {
    pub fn check(&self, id: &str) -> Option<&EvaluationResult> {
        self.checks.iter().find(|r| r.check_id.as_str() == id)
    }
}

/// Evaluate one milestone against the submission tree.
pub fn run_milestone(
    milestone: &Milestone,
    root: &Path,
    store: &MarkerStore,
) -> Result<MilestoneReport> {
    let path = root.join(&milestone.artifact);
    let source = artifact::load_source(&path)?;
    let store_populated = store.is_populated();

    let Some(src) = source else {
        debug!(
            milestone = %milestone.id,
            artifact = %milestone.artifact,
            "submission file missing; milestone not attempted"
        );
        let checks = milestone
            .checks
            .iter()
            .map(|c| EvaluationResult::skipped(c, format!("{} not found", milestone.artifact)))
            .collect();
        return Ok(MilestoneReport {
            milestone_id: milestone.id,
            title: milestone.title.clone(),
            status: MilestoneStatus::NotAttempted,
            score: 0,
            max_points: milestone.max_points,
            pass_threshold: milestone.pass_threshold,
            artifact: None,
            syntax_error: None,
            checks,
        });
    };

    let syntax_error = syntax::scan_source(&src.text).err();
    let ctx = EvalContext {
        source: Some(&src.text),
        syntax: syntax_error.as_ref(),
        store_populated,
    };

    let checks: Vec<EvaluationResult> = milestone
        .checks
        .iter()
        .map(|c| eval::evaluate_check(c, &ctx))
        .collect();

    let score: u32 = checks.iter().map(|r| r.points_awarded).sum();
    let required_failed = milestone
        .checks
        .iter()
        .zip(&checks)
        .any(|(c, r)| c.policy == CheckPolicy::Required && r.outcome == CheckOutcome::Failed);

    let status = if syntax_error.is_some() || required_failed || score < milestone.pass_threshold {
        MilestoneStatus::Failed
    } else {
        MilestoneStatus::Passed
    };

    debug!(milestone = %milestone.id, score, ?status, "milestone evaluated");

    Ok(MilestoneReport {
        milestone_id: milestone.id,
        title: milestone.title.clone(),
        status,
        score,
        max_points: milestone.max_points,
        pass_threshold: milestone.pass_threshold,
        artifact: Some(src.info()),
        syntax_error,
        checks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::catalog::Catalog;
    use std::fs;
    use tempfile::TempDir;

    const COMPLETE_SCRIPT: &str = r#"# /// script
# requires-python = ">=3.9"
# dependencies = ["adafruit-circuitpython-ahtx0", "adafruit-blinka"]
# ///
"""Read temperature and humidity from the AHT20."""
import time

import board
import adafruit_ahtx0

MAX_RETRIES = 3


def main():
    i2c = board.I2C()
    sensor = adafruit_ahtx0.AHTx0(i2c)

    for attempt in range(MAX_RETRIES):
        try:
            temperature = round(sensor.temperature, 1)
            humidity = round(sensor.relative_humidity, 1)
            print(f"Temperature: {temperature:.1f} C")
            print(f"Humidity: {humidity:.1f} %RH")
            break
        except RuntimeError as e:
            print(f"Retry {attempt + 1}/{MAX_RETRIES}: {e}")
            time.sleep(1)


if __name__ == "__main__":
    main()
"#;

    fn setup() -> (TempDir, Catalog, MarkerStore) {
        let dir = TempDir::new().unwrap();
        let store = MarkerStore::new(dir.path().join(".test_markers"));
        (dir, Catalog::standard().unwrap(), store)
    }

    #[test]
    fn missing_artifact_is_not_attempted_with_all_checks_skipped() {
        let (dir, catalog, store) = setup();

        for milestone in &catalog.milestones {
            let report = run_milestone(milestone, dir.path(), &store).unwrap();

            assert_eq!(report.status, MilestoneStatus::NotAttempted);
            assert_eq!(report.score, 0);
            assert!(report.artifact.is_none());
            assert!(
                report
                    .checks
                    .iter()
                    .all(|r| r.outcome == CheckOutcome::Skipped)
            );
        }
    }

    #[test]
    fn complete_script_passes_the_sensor_milestone() {
        let (dir, catalog, store) = setup();
        fs::write(dir.path().join("aht20_sensor.py"), COMPLETE_SCRIPT).unwrap();

        let m2 = catalog.milestones[1].clone();
        let report = run_milestone(&m2, dir.path(), &store).unwrap();

        assert_eq!(report.status, MilestoneStatus::Passed);
        assert_eq!(report.score, 35);
        assert!(report.artifact.is_some());
    }

    #[test]
    fn marker_gate_fails_the_environment_milestone_without_markers() {
        let (dir, catalog, store) = setup();
        fs::write(dir.path().join("aht20_sensor.py"), COMPLETE_SCRIPT).unwrap();

        let m1 = catalog.milestones[0].clone();
        let report = run_milestone(&m1, dir.path(), &store).unwrap();

        assert_eq!(report.status, MilestoneStatus::Failed);
        assert_eq!(
            report.check("C-ENV-05").unwrap().outcome,
            CheckOutcome::Failed
        );
        // Static checks still earn their points.
        assert_eq!(report.score, 20);
    }

    #[test]
    fn marker_gate_passes_once_the_store_is_populated() {
        let (dir, catalog, store) = setup();
        fs::write(dir.path().join("aht20_sensor.py"), COMPLETE_SCRIPT).unwrap();
        store.write("aht20_verified", "T=21.4C H=38.2%RH").unwrap();

        let m1 = catalog.milestones[0].clone();
        let report = run_milestone(&m1, dir.path(), &store).unwrap();

        assert_eq!(report.status, MilestoneStatus::Passed);
        assert_eq!(report.score, 25);
    }

    #[test]
    fn syntax_error_yields_one_diagnostic_and_no_false_passes() {
        let (dir, catalog, store) = setup();
        // Token-complete for M2, but structurally broken.
        fs::write(
            dir.path().join("aht20_sensor.py"),
            "import board\nimport adafruit_ahtx0\ni2c = board.I2C(\nsensor = adafruit_ahtx0.AHTx0(i2c)\nprint(sensor.temperature, sensor.relative_humidity)\n",
        )
        .unwrap();

        let m2 = catalog.milestones[1].clone();
        let report = run_milestone(&m2, dir.path(), &store).unwrap();

        assert_eq!(report.status, MilestoneStatus::Failed);
        let diag = report.syntax_error.as_ref().expect("one diagnostic");
        assert_eq!(diag.line, 3);
        assert!(
            report
                .checks
                .iter()
                .all(|r| r.outcome != CheckOutcome::Passed),
            "no structural check may pass on a malformed source"
        );
    }

    #[test]
    fn optional_documentation_failure_only_lowers_the_score() {
        let (dir, catalog, store) = setup();
        // Retry logic and handlers present, but no docstring and fewer
        // than three comment marks.
        let script = "import time\nimport board\nimport adafruit_ahtx0\n\nMAX_RETRIES = 3\n\nfor attempt in range(MAX_RETRIES):\n    try:\n        t = 1\n        break\n    except RuntimeError as e:\n        time.sleep(1)\n\nif __name__ == \"__main__\":\n    pass\n";
        fs::write(dir.path().join("aht20_sensor.py"), script).unwrap();

        let m3 = catalog.milestones[2].clone();
        let report = run_milestone(&m3, dir.path(), &store).unwrap();

        assert_eq!(
            report.check("C-QUAL-06").unwrap().outcome,
            CheckOutcome::Failed
        );
        assert_eq!(report.score, 35);
        assert_eq!(report.status, MilestoneStatus::Passed);
    }
}
