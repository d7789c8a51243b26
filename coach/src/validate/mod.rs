//! Output validation: literal substring rules over generated text.
//!
//! Matching is case-insensitive (both sides lower-cased) and counts non-overlapping
//! occurrences. Rules run in a fixed order and the first failure is reported:
//!
//! 1. every `exactly_once` literal must occur exactly one time;
//! 2. every `at_least_once` literal must occur one or more times;
//! 3. after removing all `exactly_once` occurrences, no `forbidden` literal may remain.
//!
//! Only `exactly_once` literals are removed before the forbidden scan; `at_least_once`
//! literals stay in the residual text.

mod email;

pub use email::{
    EmailRules, BUTTON_STYLE_DECLARATIONS, DEFAULT_PAYMENT_LINK, HTML_CLOSE, HTML_OPEN,
    RAW_LINK_PREFIXES,
};

use thiserror::Error;

/// Delimiters the model sometimes wraps its output in.
const DELIMITERS: [&str; 3] = ["```", "'''", "\"\"\""];

/// Why a candidate text failed validation. Carries the offending literal as given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("required string must appear exactly once: {0:?}")]
    DuplicateOrMissingRequiredString(String),
    #[error("required string is missing: {0:?}")]
    MissingRequiredString(String),
    #[error("forbidden string present: {0:?}")]
    ForbiddenStringPresent(String),
}

/// Declarative rules for one request. Built fresh per request; insertion order is the
/// evaluation order within each group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRuleSet {
    exactly_once: Vec<String>,
    at_least_once: Vec<String>,
    forbidden: Vec<String>,
}

impl ValidationRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds literals that must appear exactly once. Empty literals are ignored.
    pub fn exactly_once<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_non_empty(&mut self.exactly_once, literals);
        self
    }

    /// Adds literals that must appear at least once. Empty literals are ignored.
    pub fn at_least_once<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_non_empty(&mut self.at_least_once, literals);
        self
    }

    /// Adds literals that must not survive in the residual text. Empty literals are ignored.
    pub fn forbid<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_non_empty(&mut self.forbidden, literals);
        self
    }

    pub fn exactly_once_literals(&self) -> &[String] {
        &self.exactly_once
    }

    pub fn at_least_once_literals(&self) -> &[String] {
        &self.at_least_once
    }

    pub fn forbidden_literals(&self) -> &[String] {
        &self.forbidden
    }

    /// Checks `candidate` against the rules and returns the first violation.
    pub fn validate(&self, candidate: &str) -> Result<(), Violation> {
        validate(candidate, self)
    }
}

fn push_non_empty<I, S>(target: &mut Vec<String>, literals: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    target.extend(
        literals
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty()),
    );
}

/// Checks `candidate` against `rules`; see the module docs for rule order.
pub fn validate(candidate: &str, rules: &ValidationRuleSet) -> Result<(), Violation> {
    let lower = candidate.to_lowercase();

    for literal in &rules.exactly_once {
        if lower.matches(literal.to_lowercase().as_str()).count() != 1 {
            return Err(Violation::DuplicateOrMissingRequiredString(literal.clone()));
        }
    }

    for literal in &rules.at_least_once {
        if !lower.contains(literal.to_lowercase().as_str()) {
            return Err(Violation::MissingRequiredString(literal.clone()));
        }
    }

    let mut residual = lower;
    for literal in &rules.exactly_once {
        residual = residual.replace(literal.to_lowercase().as_str(), "");
    }
    for literal in &rules.forbidden {
        if residual.contains(literal.to_lowercase().as_str()) {
            return Err(Violation::ForbiddenStringPresent(literal.clone()));
        }
    }

    Ok(())
}

/// Drops a language tag (`html`, `json`, ...) on the line of a leading code fence.
fn drop_fence_tag(text: &str) -> Option<String> {
    let rest = text.trim_start().strip_prefix("```")?;
    let newline = rest.find('\n')?;
    let tag = &rest[..newline];
    let is_tag = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-+_".contains(c));
    is_tag.then(|| format!("```{}", &rest[newline..]))
}

/// Removes triple-backtick and triple-quote delimiters and trims surrounding whitespace.
/// A language tag right after an opening fence goes with it.
///
/// Removal repeats until no delimiter remains, so the result is stable when applied again.
pub fn strip_delimiters(text: &str) -> String {
    let mut out = text.to_string();
    loop {
        let before = out.len();
        if let Some(untagged) = drop_fence_tag(&out) {
            out = untagged;
        }
        for d in DELIMITERS {
            out = out.replace(d, "");
        }
        if out.len() == before {
            break;
        }
    }
    out.trim().to_string()
}
