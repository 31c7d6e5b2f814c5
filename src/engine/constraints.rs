//! Blueprint constraint rules.
//!
//! Rules are short text expressions stored with each blueprint version:
//!
//! ```text
//! forbid lighting=hard + mood=dreamy
//! require subject
//! require filter:color
//! max_words 60
//! max_chars 400
//! ```
//!
//! They are advisory: a violated rule becomes a warning and lowers the score,
//! it never rejects the compile.

use std::fmt;

use crate::error::AppError;

use super::types::CompileInput;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredField {
    Subject,
    Context,
    Items,
    Environment,
    Filter(String),
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => f.write_str("subject"),
            Self::Context => f.write_str("context"),
            Self::Items => f.write_str("items"),
            Self::Environment => f.write_str("environment"),
            Self::Filter(key) => write!(f, "filter:{key}"),
        }
    }
}

/// A `filter=value` selection referenced by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub filter: String,
    pub value: String,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.filter, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The two selections must not be active together.
    Forbid(Selection, Selection),
    Require(RequiredField),
    MaxWords(usize),
    MaxChars(usize),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbid(a, b) => write!(f, "forbid {a} + {b}"),
            Self::Require(field) => write!(f, "require {field}"),
            Self::MaxWords(n) => write!(f, "max_words {n}"),
            Self::MaxChars(n) => write!(f, "max_chars {n}"),
        }
    }
}

/// What a rule is checked against: the request and the assembled prompt
/// (before augmentation transforms).
pub struct ConstraintSubject<'a> {
    pub input: &'a CompileInput,
    pub prompt: &'a str,
}

impl Constraint {
    /// Returns a violation message, or `None` when the rule holds.
    pub fn check(&self, subject: &ConstraintSubject) -> Option<String> {
        let input = subject.input;
        match self {
            Self::Forbid(a, b) => {
                let selected =
                    |s: &Selection| input.filters.get(&s.filter).is_some_and(|v| v == &s.value);
                (selected(a) && selected(b))
                    .then(|| format!("Constraint violated: {a} cannot be combined with {b}"))
            }
            Self::Require(field) => {
                let present = match field {
                    RequiredField::Subject => !input.subject.trim().is_empty(),
                    RequiredField::Context => !input.context.trim().is_empty(),
                    RequiredField::Items => input.items.iter().any(|i| !i.trim().is_empty()),
                    RequiredField::Environment => !input.environment.trim().is_empty(),
                    RequiredField::Filter(key) => {
                        input.filters.get(key).is_some_and(|v| !v.trim().is_empty())
                    }
                };
                (!present).then(|| format!("Constraint violated: {field} is required"))
            }
            Self::MaxWords(max) => {
                let words = subject.prompt.split_whitespace().count();
                (words > *max).then(|| {
                    format!("Constraint violated: prompt has {words} words (max {max})")
                })
            }
            Self::MaxChars(max) => {
                let chars = subject.prompt.chars().count();
                (chars > *max).then(|| {
                    format!("Constraint violated: prompt has {chars} characters (max {max})")
                })
            }
        }
    }
}

pub fn parse_constraint(raw: &str) -> Result<Constraint, AppError> {
    let trimmed = raw.trim();
    let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (trimmed, ""),
    };
    let invalid = |why: &str| AppError::Validation(format!("Invalid constraint '{trimmed}': {why}"));

    match keyword.to_ascii_lowercase().as_str() {
        "forbid" => {
            let parts: Vec<&str> = rest.split('+').map(str::trim).collect();
            if parts.len() != 2 {
                return Err(invalid("expected 'forbid <filter>=<value> + <filter>=<value>'"));
            }
            let a = parse_selection(parts[0]).ok_or_else(|| invalid("bad left selection"))?;
            let b = parse_selection(parts[1]).ok_or_else(|| invalid("bad right selection"))?;
            Ok(Constraint::Forbid(a, b))
        }
        "require" => {
            // Catalog keys are lowercase, so the whole field can be folded.
            let field = match rest.to_ascii_lowercase().as_str() {
                "subject" => RequiredField::Subject,
                "context" => RequiredField::Context,
                "items" => RequiredField::Items,
                "environment" => RequiredField::Environment,
                other => match other.strip_prefix("filter:") {
                    Some(key) if !key.trim().is_empty() => {
                        RequiredField::Filter(key.trim().to_string())
                    }
                    _ => return Err(invalid("unknown field")),
                },
            };
            Ok(Constraint::Require(field))
        }
        "max_words" => rest
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Constraint::MaxWords)
            .ok_or_else(|| invalid("expected a positive integer")),
        "max_chars" => rest
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Constraint::MaxChars)
            .ok_or_else(|| invalid("expected a positive integer")),
        _ => Err(invalid("unknown rule")),
    }
}

fn parse_selection(s: &str) -> Option<Selection> {
    let (filter, value) = s.split_once('=')?;
    let (filter, value) = (filter.trim(), value.trim());
    if filter.is_empty() || value.is_empty() {
        return None;
    }
    Some(Selection {
        filter: filter.to_string(),
        value: value.to_string(),
    })
}

/// Parse every rule, rejecting the first one that does not parse.
/// Used when blueprints are created or edited.
pub fn validate_all(rules: &[String]) -> Result<(), AppError> {
    for rule in rules {
        parse_constraint(rule)?;
    }
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstraintReport {
    pub violations: Vec<String>,
    /// Rules that failed to parse; reported as warnings, not violations.
    pub unparsed: Vec<String>,
}

pub fn evaluate(rules: &[String], subject: &ConstraintSubject) -> ConstraintReport {
    let mut report = ConstraintReport::default();
    for rule in rules {
        match parse_constraint(rule) {
            Ok(constraint) => {
                if let Some(violation) = constraint.check(subject) {
                    report.violations.push(violation);
                }
            }
            Err(e) => report.unparsed.push(e.to_string()),
        }
    }
    report
}
