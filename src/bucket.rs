//! Legacy nested-array ("bucket") encoding of requirement trees, as stored
//! in the catalog data file.
//!
//! ```text
//! ["ECEN314 C", "ECEN325 C", ["ECEN350 C", ".", "CSCE350 C"], "ECEN449 C ^"]
//! ```
//!
//! A string entry is a course with its minimum grade, suffixed with `^` when
//! current enrollment also counts. `"."` between two adjacent items is OR;
//! plain adjacency is AND. OR binds tighter: `[a, ".", b, c]` is
//! `(a OR b) AND c`. Nested arrays group.

use serde::{Deserialize, Serialize};

use crate::config::EvaluationConfig;
use crate::error::BucketError;
use crate::expression::{CourseCode, CourseRequirement, Expression, ExpressionKind, Grade, RequirementTree};
use crate::record::CourseEntry;

pub const OR_SEPARATOR: &str = ".";
pub const CONCURRENT_MARKER: &str = "^";

/// Grade assumed for an entry that names none.
pub const LEGACY_DEFAULT_GRADE: Grade = Grade::D;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bucket {
    Entry(String),
    Group(Vec<Bucket>),
}

impl Bucket {
    pub fn entry(s: impl Into<String>) -> Self {
        Self::Entry(s.into())
    }

    fn separator() -> Self {
        Self::Entry(OR_SEPARATOR.to_string())
    }

    fn is_separator(&self) -> bool {
        matches!(self, Self::Entry(s) if s.trim() == OR_SEPARATOR)
    }

    /// The items of a group, or a lone entry as a one-item list.
    pub fn into_items(self) -> Vec<Bucket> {
        match self {
            Self::Group(items) => items,
            entry => vec![entry],
        }
    }
}

/// Decodes a bucket list into a single expression. An empty list decodes to
/// `None`.
pub fn decode(items: &[Bucket]) -> Result<Option<Expression>, BucketError> {
    Ok(Expression::all(decode_conjuncts(items)?))
}

/// Encodes `expression` as a bucket list. Grade floors are resolved into
/// each entry's grade.
pub fn encode(expression: &Expression, config: &EvaluationConfig) -> Result<Vec<Bucket>, BucketError> {
    match &expression.kind {
        ExpressionKind::And(children) => encode_conjuncts(children, expression.grade_floor, config),
        ExpressionKind::Or(children) => encode_chain(children, expression.grade_floor, config),
        _ => Ok(vec![encode_atom(expression, None, config)?]),
    }
}

impl RequirementTree {
    /// Builds a tree from a stored bucket list. Each top-level conjunct
    /// becomes one clause.
    pub fn from_bucket(target: Option<CourseCode>, items: &[Bucket]) -> Result<Self, BucketError> {
        Ok(Self::new(target, decode_conjuncts(items)?))
    }

    pub fn to_bucket(&self, config: &EvaluationConfig) -> Result<Vec<Bucket>, BucketError> {
        encode_conjuncts(&self.segments, None, config)
    }
}

/// Splits `items` into AND-ed conjuncts, each an OR-chain of adjacent items
/// joined by separators.
fn decode_conjuncts(items: &[Bucket]) -> Result<Vec<Expression>, BucketError> {
    let mut conjuncts = Vec::new();
    // Alternatives of the chain being built; `None` before the first operand.
    let mut chain: Option<Vec<Expression>> = None;
    let mut pending_or = false;

    for item in items {
        if item.is_separator() {
            if chain.is_none() || pending_or {
                return Err(BucketError::DanglingSeparator);
            }
            pending_or = true;
            continue;
        }

        let node = decode_atom(item)?;
        if pending_or {
            // A separator is only accepted after an operand.
            if let Some(alternatives) = chain.as_mut() {
                alternatives.extend(node);
            }
            pending_or = false;
        } else if let Some(done) = chain.replace(node.into_iter().collect()) {
            conjuncts.extend(Expression::any(done));
        }
    }

    if pending_or {
        return Err(BucketError::DanglingSeparator);
    }
    if let Some(done) = chain {
        conjuncts.extend(Expression::any(done));
    }
    Ok(conjuncts)
}

fn decode_atom(item: &Bucket) -> Result<Option<Expression>, BucketError> {
    match item {
        Bucket::Group(items) => decode(items),
        Bucket::Entry(entry) => {
            let CourseEntry {
                code,
                grade,
                in_progress,
            } = CourseEntry::parse(entry).ok_or_else(|| BucketError::MalformedEntry(entry.clone()))?;
            let requirement = CourseRequirement {
                code,
                min_grade: Some(grade.unwrap_or(LEGACY_DEFAULT_GRADE)),
                concurrent_allowed: in_progress,
            };
            Ok(Some(ExpressionKind::Course(requirement).into()))
        }
    }
}

fn encode_conjuncts(
    children: &[Expression],
    floor: Option<Grade>,
    config: &EvaluationConfig,
) -> Result<Vec<Bucket>, BucketError> {
    let mut items = Vec::with_capacity(children.len());
    for child in children {
        match &child.kind {
            // OR binds tighter than adjacency, so it can be written inline.
            ExpressionKind::Or(alternatives) => {
                items.extend(encode_chain(alternatives, child.grade_floor.or(floor), config)?)
            }
            _ => items.push(encode_atom(child, floor, config)?),
        }
    }
    Ok(items)
}

fn encode_chain(
    alternatives: &[Expression],
    floor: Option<Grade>,
    config: &EvaluationConfig,
) -> Result<Vec<Bucket>, BucketError> {
    let mut items = Vec::with_capacity(alternatives.len() * 2);
    for (index, alternative) in alternatives.iter().enumerate() {
        if index > 0 {
            items.push(Bucket::separator());
        }
        items.push(encode_atom(alternative, floor, config)?);
    }
    Ok(items)
}

fn encode_atom(
    node: &Expression,
    inherited: Option<Grade>,
    config: &EvaluationConfig,
) -> Result<Bucket, BucketError> {
    let floor = node.grade_floor.or(inherited);
    match &node.kind {
        ExpressionKind::Course(course) => {
            let grade = course.min_grade.or(floor).unwrap_or(config.default_min_grade);
            let mut entry = format!("{} {grade}", course.code.compact());
            if course.concurrent_allowed {
                entry.push(' ');
                entry.push_str(CONCURRENT_MARKER);
            }
            Ok(Bucket::Entry(entry))
        }
        ExpressionKind::And(children) => Ok(Bucket::Group(encode_conjuncts(children, floor, config)?)),
        ExpressionKind::Or(children) => Ok(Bucket::Group(encode_chain(children, floor, config)?)),
        ExpressionKind::Classification(_) | ExpressionKind::Exam | ExpressionKind::ConcurrentEnrollment => {
            Err(BucketError::Unrepresentable(node.label()))
        }
    }
}
