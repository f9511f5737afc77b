//! Course prerequisite parser/evaluator.
//!
//! Catalog prerequisite text is free-form English ("Grade of C or better in
//! ECEN 314 or concurrent enrollment; senior classification."). We tokenize
//! the restricted sub-language catalogs actually use, parse it into an
//! immutable [`RequirementTree`] once per course, and then evaluate that tree
//! against any number of [`StudentRecord`]s.
//!
//! Parsing never fails: prose the grammar does not understand ("approval of
//! instructor") is dropped. Evaluation is a pure function of the tree and the
//! record, so trees can be shared across threads without locking (see
//! [`RequirementTree::evaluate_batch`] and the `rayon` feature).
//!
//! # Example
//!
//! ```rust
//! use prereq_expr::*;
//!
//! let stat_211: CourseCode = "STAT 211".parse().unwrap();
//! let tree = RequirementTree::parse_for(
//!     stat_211.clone(),
//!     "Grade of C or better in MATH 142, MATH 147, MATH 151, or MATH 171, or concurrent enrollment.",
//! );
//!
//! let passed = StudentRecord::from_entries(["MATH151 B"], Vec::<&str>::new());
//! assert!(evaluate(&tree, &passed));
//!
//! let enrolled = StudentRecord::from_entries(["MATH151 D"], Vec::<&str>::new()).with_enrolled(stat_211);
//! assert!(evaluate(&tree, &enrolled));
//!
//! assert!(!evaluate(&tree, &StudentRecord::new()));
//! ```
//!
//! The legacy nested-array catalog format is handled by [`bucket`], and the
//! on-disk catalog and course history files by [`Catalog`] and
//! [`CourseHistory`].

pub mod bucket;
mod catalog;
mod config;
mod error;
mod evaluate;
mod expression;
mod history;
mod parse;
mod record;
mod tokenize;

/// Uses the [`pest`] parsing expression grammar language.
///
/// ```text
#[doc = include_str!("grammar.pest")]
/// ```
pub mod grammar_doc {}

pub use bucket::Bucket;
pub use catalog::*;
pub use config::*;
pub use error::*;
pub use evaluate::*;
pub use expression::*;
pub use history::*;
pub use parse::parse;
pub use record::*;
pub use tokenize::{split_segments, tokenize, Token, Tokenizer, DEFAULT_CLAUSE_GRADE};
