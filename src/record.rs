use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::expression::{Classification, CourseCode, Grade};

/// `"ECEN314 C"`, `"ECEN 314 C ^"`, `"ECEN_314 ^"`, `"ECEN314"`.
static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z]{2,4})[ _]?(\d{3})\s*([A-Fa-f])?\s*(\^)?\s*$")
        .expect("entry pattern is valid")
});

/// A course entry in the string form used by course history files.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CourseEntry {
    pub code: CourseCode,
    pub grade: Option<Grade>,
    /// Suffixed with `^`: in progress.
    pub in_progress: bool,
}

impl CourseEntry {
    pub fn parse(entry: &str) -> Option<Self> {
        let captures = ENTRY.captures(entry)?;
        let code = CourseCode::new(&captures[1], &captures[2]).ok()?;
        let grade = captures
            .get(3)
            .and_then(|m| m.as_str().chars().next())
            .and_then(Grade::from_letter);
        Some(Self {
            code,
            grade,
            in_progress: captures.get(4).is_some(),
        })
    }
}

/// A student's academic history. Supplied per evaluation and never mutated
/// by it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StudentRecord {
    /// Completed courses with the best grade earned.
    taken: BTreeMap<CourseCode, Grade>,
    /// In-progress courses, with a grade if one was recorded.
    enrolled: BTreeMap<CourseCode, Option<Grade>>,
    classification: Option<Classification>,
    /// Courses whose exam requirement the caller has declared satisfied.
    exam_credit: BTreeSet<CourseCode>,
}

impl StudentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from history-file strings.
    ///
    /// `taken` entries must carry a grade (`"ACCT209 C"`); `enrolled` entries
    /// may omit it (`"ECEN449 ^"`). Malformed entries are skipped, so they
    /// never satisfy anything.
    pub fn from_entries<T, E>(taken: T, enrolled: E) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut record = Self::new();
        for entry in taken {
            let entry = entry.as_ref();
            match CourseEntry::parse(entry) {
                Some(CourseEntry {
                    code,
                    grade: Some(grade),
                    in_progress: false,
                }) => record.add_taken(code, grade),
                _ => tracing::warn!(entry, "skipping malformed taken entry"),
            }
        }
        for entry in enrolled {
            let entry = entry.as_ref();
            match CourseEntry::parse(entry) {
                Some(CourseEntry { code, grade, .. }) => record.add_enrolled(code, grade),
                None => tracing::warn!(entry, "skipping malformed enrolled entry"),
            }
        }
        record
    }

    /// Records a completed course. Retakes keep the best grade.
    pub fn add_taken(&mut self, code: CourseCode, grade: Grade) {
        self.taken
            .entry(code)
            .and_modify(|best| *best = (*best).min(grade))
            .or_insert(grade);
    }

    pub fn add_enrolled(&mut self, code: CourseCode, grade: Option<Grade>) {
        self.enrolled.insert(code, grade);
    }

    pub fn with_taken(mut self, code: CourseCode, grade: Grade) -> Self {
        self.add_taken(code, grade);
        self
    }

    pub fn with_enrolled(mut self, code: CourseCode) -> Self {
        self.add_enrolled(code, None);
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_exam_credit(mut self, code: CourseCode) -> Self {
        self.exam_credit.insert(code);
        self
    }

    pub fn grade(&self, code: &CourseCode) -> Option<Grade> {
        self.taken.get(code).copied()
    }

    /// Completed `code` with a grade at least as good as `min`.
    pub fn has_completed(&self, code: &CourseCode, min: Grade) -> bool {
        self.grade(code).is_some_and(|grade| grade.meets(min))
    }

    pub fn is_enrolled(&self, code: &CourseCode) -> bool {
        self.enrolled.contains_key(code)
    }

    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    pub fn has_exam_credit(&self, code: &CourseCode) -> bool {
        self.exam_credit.contains(code)
    }

    pub fn taken(&self) -> impl Iterator<Item = (&CourseCode, Grade)> {
        self.taken.iter().map(|(code, grade)| (code, *grade))
    }

    pub fn enrolled(&self) -> impl Iterator<Item = &CourseCode> {
        self.enrolled.keys()
    }
}
