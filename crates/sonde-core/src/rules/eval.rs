use serde::{Deserialize, Serialize};

use crate::engine::syntax::SyntaxDiagnostic;
use crate::rules::catalog::{Check, CheckId, CheckPolicy, Predicate};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckOutcome {
    Passed,
    Failed,
    /// The prerequisite artifact was missing or the check was not
    /// applicable. Distinct from `Failed`: it never counts against a pass.
    Skipped,
}

/// Per-check evaluation result. Transient; rebuilt on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub check_id: CheckId,
    pub title: String,
    pub outcome: CheckOutcome,
    pub weight: u32,
    pub points_awarded: u32,
    pub detail: Option<String>,
    pub remediation: Option<String>,
}

impl EvaluationResult {
    pub fn skipped(check: &Check, detail: impl Into<String>) -> Self {
        Self {
            check_id: check.id.clone(),
            title: check.title.clone(),
            outcome: CheckOutcome::Skipped,
            weight: check.weight,
            points_awarded: 0,
            detail: Some(detail.into()),
            remediation: None,
        }
    }
}

/// Everything a predicate may consult. The marker-store flag is resolved
/// by the caller so evaluation itself stays free of I/O.
pub struct EvalContext<'a> {
    pub source: Option<&'a str>,
    pub syntax: Option<&'a SyntaxDiagnostic>,
    pub store_populated: bool,
}

impl<'a> EvalContext<'a> {
    fn syntax_ok(&self) -> bool {
        self.syntax.is_none()
    }
}

/// Evaluate a single check against the context.
///
/// Source-pattern checks are skipped (not failed) when the source is
/// missing or not well-formed; the well-formedness check itself carries
/// the one syntax diagnostic. Advisory checks degrade a non-match to a
/// skip with the suggestion attached.
pub fn evaluate_check(check: &Check, ctx: &EvalContext<'_>) -> EvaluationResult {
    match &check.predicate {
        Predicate::ArtifactExists => outcome(check, ctx.source.is_some(), None),
        Predicate::SyntaxValid => match (ctx.source, ctx.syntax) {
            (None, _) => EvaluationResult::skipped(check, "no artifact to scan"),
            (Some(_), Some(diag)) => failed(check, Some(diag.to_string())),
            (Some(_), None) => passed(check, None),
        },
        Predicate::Source(pattern) => {
            let Some(text) = ctx.source else {
                return EvaluationResult::skipped(check, "no artifact to scan");
            };
            if !ctx.syntax_ok() {
                return EvaluationResult::skipped(check, "source not well-formed");
            }
            let detail = pattern
                .matched_token(text)
                .map(|t| format!("matched {t:?}"));
            outcome(check, pattern.is_match(text), detail)
        }
        Predicate::MarkerStorePopulated => {
            if ctx.source.is_none() {
                return EvaluationResult::skipped(check, "no artifact to scan");
            }
            outcome(check, ctx.store_populated, None)
        }
    }
}

fn outcome(check: &Check, matched: bool, detail: Option<String>) -> EvaluationResult {
    if matched {
        passed(check, detail)
    } else if check.policy == CheckPolicy::Advisory {
        EvaluationResult {
            check_id: check.id.clone(),
            title: check.title.clone(),
            outcome: CheckOutcome::Skipped,
            weight: check.weight,
            points_awarded: 0,
            detail: Some("not detected".to_string()),
            remediation: Some(check.remediation.clone()),
        }
    } else {
        failed(check, None)
    }
}

fn passed(check: &Check, detail: Option<String>) -> EvaluationResult {
    EvaluationResult {
        check_id: check.id.clone(),
        title: check.title.clone(),
        outcome: CheckOutcome::Passed,
        weight: check.weight,
        points_awarded: check.weight,
        detail,
        remediation: None,
    }
}

fn failed(check: &Check, detail: Option<String>) -> EvaluationResult {
    EvaluationResult {
        check_id: check.id.clone(),
        title: check.title.clone(),
        outcome: CheckOutcome::Failed,
        weight: check.weight,
        points_awarded: 0,
        detail,
        remediation: Some(check.remediation.clone()),
    }
}
