use crate::TOOL_NAME;
use crate::report::model::GradeReport;
use crate::rules::eval::CheckOutcome;

pub fn render_text(report: &GradeReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, report.tool.version));
    out.push_str(&format!(
        "Overall: {} ({}/{} points, {}/{} milestones)\n",
        report.summary.status,
        report.summary.total_score,
        report.summary.max_score,
        report.summary.milestones_passed,
        report.summary.milestone_count,
    ));

    for m in &report.milestones {
        out.push_str(&format!(
            "\n{} {} [{:?}] {}/{}\n",
            m.milestone_id, m.title, m.status, m.score, m.max_points
        ));
        if let Some(diag) = &m.syntax_error {
            out.push_str(&format!("  malformed source: {diag}\n"));
        }
        for r in &m.checks {
            let mark = match r.outcome {
                CheckOutcome::Passed => "pass",
                CheckOutcome::Failed => "FAIL",
                CheckOutcome::Skipped => "skip",
            };
            out.push_str(&format!(
                "  [{mark}] {} {} ({}/{})\n",
                r.check_id, r.title, r.points_awarded, r.weight
            ));
            if let Some(remediation) = &r.remediation {
                out.push_str(&format!("         {remediation}\n"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::milestone::{MilestoneReport, MilestoneStatus};
    use crate::report::model::{CatalogInfo, OverallStatus, SummaryInfo, ToolInfo};
    use crate::rules::catalog::{CheckId, MilestoneId};
    use crate::rules::eval::EvaluationResult;

    #[test]
    fn text_rendering_lists_checks_with_scores() {
        let report = GradeReport::new(
            ToolInfo {
                name: "sonde".into(),
                version: "0.1.0".into(),
                commit: None,
            },
            CatalogInfo::default(),
            vec![MilestoneReport {
                milestone_id: MilestoneId::Environment,
                title: "Environment setup".into(),
                status: MilestoneStatus::Failed,
                score: 20,
                max_points: 25,
                pass_threshold: 25,
                artifact: None,
                syntax_error: None,
                checks: vec![EvaluationResult {
                    check_id: CheckId("C-ENV-05".into()),
                    title: "local validation executed".into(),
                    outcome: CheckOutcome::Failed,
                    weight: 5,
                    points_awarded: 0,
                    detail: None,
                    remediation: Some("run sonde validate".into()),
                }],
            }],
            SummaryInfo {
                status: OverallStatus::Failed,
                total_score: 20,
                max_score: 125,
                milestones_passed: 0,
                milestone_count: 4,
                exit_code: 1,
            },
        );

        let text = render_text(&report);

        assert!(text.contains("Overall: FAILED (20/125 points"));
        assert!(text.contains("M1 Environment setup"));
        assert!(text.contains("[FAIL] C-ENV-05"));
        assert!(text.contains("run sonde validate"));
    }
}
