//! Detection rules over submission text.
//!
//! A `Pattern` is a composable predicate evaluated against raw source text.
//! Detection is syntax-tolerant on purpose: the grading population writes
//! idiomatically varied but equivalent code (alternate constant names,
//! aliased imports, French identifiers), so every rule is a disjunction of
//! acceptable surface forms rather than one exact spelling.
//!
//! Responsibilities:
//! - Substring presence/conjunction, optionally case-folded
//! - Regular-expression matching (compiled once, at catalogue build)
//! - Occurrence counting
//! - Boolean composition, including negation for anti-pattern checks
//!
//! Non-responsibilities:
//! - Scoring, policy, or remediation (handled in `rules::catalog` / `eval`)
//! - Reading files or any other I/O
//!
//! Everything here is a pure function of the text, which keeps the rest of
//! the engine agnostic to the detection strategy.

use regex::Regex;

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Text contains any of the tokens.
    AnyOf { tokens: Vec<String>, fold_case: bool },
    /// Text contains all of the tokens.
    AllOf { tokens: Vec<String>, fold_case: bool },
    /// Text matches a compiled regular expression.
    Matches(Regex),
    /// Token occurs at least `min` times.
    CountAtLeast { token: String, min: usize },
    /// Every child pattern matches.
    All(Vec<Pattern>),
    /// At least one child pattern matches.
    Any(Vec<Pattern>),
    /// The inner pattern does not match. Used by forbidden-construct checks.
    Absent(Box<Pattern>),
}

impl Pattern {
    pub fn any_of(tokens: &[&str]) -> Self {
        Pattern::AnyOf {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            fold_case: false,
        }
    }

    /// Case-folded variant; tokens are stored lowercased.
    pub fn any_of_fold(tokens: &[&str]) -> Self {
        Pattern::AnyOf {
            tokens: tokens.iter().map(|t| t.to_lowercase()).collect(),
            fold_case: true,
        }
    }

    pub fn all_of(tokens: &[&str]) -> Self {
        Pattern::AllOf {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            fold_case: false,
        }
    }

    pub fn all_of_fold(tokens: &[&str]) -> Self {
        Pattern::AllOf {
            tokens: tokens.iter().map(|t| t.to_lowercase()).collect(),
            fold_case: true,
        }
    }

    /// Compile a regular-expression rule.
    ///
    /// Compilation happens at catalogue-build time; a malformed pattern is
    /// a catalogue-authoring defect and must abort startup, never surface
    /// while grading a submission.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Pattern::Matches(Regex::new(pattern)?))
    }

    pub fn count_at_least(token: &str, min: usize) -> Self {
        Pattern::CountAtLeast {
            token: token.to_string(),
            min,
        }
    }

    pub fn all(children: Vec<Pattern>) -> Self {
        Pattern::All(children)
    }

    pub fn any(children: Vec<Pattern>) -> Self {
        Pattern::Any(children)
    }

    pub fn absent(inner: Pattern) -> Self {
        Pattern::Absent(Box::new(inner))
    }

    /// Evaluate the pattern against submission text.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Pattern::AnyOf { tokens, fold_case } => {
                let folded;
                let haystack = if *fold_case {
                    folded = text.to_lowercase();
                    folded.as_str()
                } else {
                    text
                };
                tokens.iter().any(|t| haystack.contains(t.as_str()))
            }
            Pattern::AllOf { tokens, fold_case } => {
                let folded;
                let haystack = if *fold_case {
                    folded = text.to_lowercase();
                    folded.as_str()
                } else {
                    text
                };
                tokens.iter().all(|t| haystack.contains(t.as_str()))
            }
            Pattern::Matches(re) => re.is_match(text),
            Pattern::CountAtLeast { token, min } => text.matches(token.as_str()).count() >= *min,
            Pattern::All(children) => children.iter().all(|c| c.is_match(text)),
            Pattern::Any(children) => children.iter().any(|c| c.is_match(text)),
            Pattern::Absent(inner) => !inner.is_match(text),
        }
    }

    /// Best-effort description of which surface form matched, for
    /// diagnostic detail in evaluation results.
    pub fn matched_token(&self, text: &str) -> Option<String> {
        match self {
            Pattern::AnyOf { tokens, fold_case } => {
                let folded;
                let haystack = if *fold_case {
                    folded = text.to_lowercase();
                    folded.as_str()
                } else {
                    text
                };
                tokens
                    .iter()
                    .find(|t| haystack.contains(t.as_str()))
                    .cloned()
            }
            Pattern::Matches(re) => re.find(text).map(|m| m.as_str().to_string()),
            Pattern::Any(children) => children
                .iter()
                .find(|c| c.is_match(text))
                .and_then(|c| c.matched_token(text)),
            _ => None,
        }
    }
}
