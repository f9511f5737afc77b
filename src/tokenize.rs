use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::expression::{Classification, CourseCode, Grade};

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to project `src`
struct RequirementLexer;

/// Grade assumed by a grade clause that names no letter.
pub const DEFAULT_CLAUSE_GRADE: Grade = Grade::C;

/// Lexical unit of requirement text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    Course(CourseCode),
    And,
    Or,
    Comma,
    Slash,
    SegmentBreak,
    /// A collapsed "grade of X or better [in]" clause.
    Grade(Grade),
    Concurrent,
    Exam,
    Classification(Classification),
    /// Unrecognized prose, only produced when [`Tokenizer::keep_unknown`] is
    /// set.
    Unknown(String),
}

/// Tokenizes `text`, silently dropping anything unrecognized.
pub fn tokenize(text: &str) -> Vec<Token> {
    Tokenizer::default().tokenize(text)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Tokenizer {
    /// Emit [`Token::Unknown`] for skipped words instead of dropping them.
    pub keep_unknown: bool,
}

impl Tokenizer {
    /// Total: every input yields a (possibly empty) token sequence.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let pairs = match RequirementLexer::parse(Rule::requirement, text) {
            Ok(pairs) => pairs,
            Err(error) => {
                // The grammar skips anything it does not recognize, so this
                // only happens if that invariant is broken.
                tracing::warn!(%error, "requirement text rejected by tokenizer");
                return Vec::new();
            }
        };

        pairs
            .flatten()
            .filter_map(|pair| self.token(pair))
            .collect()
    }

    fn token(&self, pair: Pair<Rule>) -> Option<Token> {
        let token = match pair.as_rule() {
            Rule::course => {
                let mut inner = pair.into_inner();
                let (dept, number) = (inner.next()?, inner.next()?);
                match CourseCode::new(dept.as_str(), number.as_str()) {
                    Ok(code) => Token::Course(code),
                    Err(error) => {
                        tracing::trace!(%error, "dropping course token");
                        return None;
                    }
                }
            }
            Rule::grade_clause => Token::Grade(clause_grade(pair)),
            Rule::or => Token::Or,
            Rule::and => Token::And,
            Rule::concurrent => Token::Concurrent,
            Rule::exam => Token::Exam,
            Rule::classification => {
                let word = pair.as_str().trim_end_matches(|c: char| !c.is_ascii_alphabetic());
                Token::Classification(Classification::from_word(word)?)
            }
            Rule::slash => Token::Slash,
            Rule::comma => Token::Comma,
            Rule::segment_break => Token::SegmentBreak,
            Rule::unknown if self.keep_unknown => Token::Unknown(pair.as_str().to_string()),
            // Structural rules, and pieces of tokens already handled through
            // their parent.
            _ => return None,
        };
        Some(token)
    }
}

/// The most lenient letter listed in a grade clause.
fn clause_grade(pair: Pair<Rule>) -> Grade {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::grade_letter)
        .filter_map(|p| p.as_str().chars().next().and_then(Grade::from_letter))
        .max()
        .unwrap_or(DEFAULT_CLAUSE_GRADE)
}

/// Splits a token sequence into clauses at [`Token::SegmentBreak`]s, skipping
/// empty clauses.
pub fn split_segments(tokens: &[Token]) -> impl Iterator<Item = &[Token]> {
    tokens
        .split(|token| *token == Token::SegmentBreak)
        .filter(|segment| !segment.is_empty())
}
