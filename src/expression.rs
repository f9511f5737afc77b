use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CourseCodeError;

/// Letter grade on the 5-point scale. `A` is best, so "at least `C`" means
/// `grade <= Grade::C` under the derived ordering.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// True if `self` is at least as good as `min`.
    pub fn meets(self, min: Grade) -> bool {
        self <= min
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'F' => Some(Self::F),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::F => 'F',
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Student standing, ordered by seniority.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Freshman,
    Sophomore,
    Junior,
    Senior,
}

impl Classification {
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.to_ascii_lowercase();
        let word = word.strip_suffix('s').unwrap_or(&word);
        match word {
            "freshman" | "freshmen" => Some(Self::Freshman),
            "sophomore" => Some(Self::Sophomore),
            "junior" => Some(Self::Junior),
            "senior" => Some(Self::Senior),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Freshman => "Freshman",
            Self::Sophomore => "Sophomore",
            Self::Junior => "Junior",
            Self::Senior => "Senior",
        };
        f.write_str(name)
    }
}

/// Normalized course identifier: upper-case department letters and a
/// 3-digit number.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CourseCode {
    dept: String,
    number: String,
}

impl CourseCode {
    /// Builds a code from its parts, normalizing case.
    ///
    /// The department must be 2 to 4 ASCII letters and the number exactly 3
    /// ASCII digits.
    pub fn new(dept: &str, number: &str) -> Result<Self, CourseCodeError> {
        let dept_ok = (2..=4).contains(&dept.len()) && dept.bytes().all(|b| b.is_ascii_alphabetic());
        let number_ok = number.len() == 3 && number.bytes().all(|b| b.is_ascii_digit());
        if !dept_ok || !number_ok {
            return Err(CourseCodeError::Malformed(format!("{dept} {number}")));
        }
        Ok(Self {
            dept: dept.to_ascii_uppercase(),
            number: number.to_string(),
        })
    }

    pub fn dept(&self) -> &str {
        &self.dept
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Key used by the persisted catalog, e.g. `ECEN_403`.
    pub fn catalog_key(&self) -> String {
        format!("{}_{}", self.dept, self.number)
    }

    /// Form used by the legacy bucket entries, e.g. `ECEN403`.
    pub fn compact(&self) -> String {
        format!("{}{}", self.dept, self.number)
    }
}

impl FromStr for CourseCode {
    type Err = CourseCodeError;

    /// Accepts `"ECEN 314"`, `"ECEN314"` and `"ecen_314"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(|| CourseCodeError::Malformed(s.to_string()))?;
        let (dept, rest) = s.split_at(split);
        let number = rest.trim_start_matches([' ', '_']);
        Self::new(dept, number).map_err(|_| CourseCodeError::Malformed(s.to_string()))
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dept, self.number)
    }
}

/// A single-course leaf.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CourseRequirement {
    pub code: CourseCode,
    /// The leaf's own explicit grade. `None` inherits the nearest enclosing
    /// floor.
    pub min_grade: Option<Grade>,
    /// Current enrollment also satisfies the requirement.
    pub concurrent_allowed: bool,
}

impl CourseRequirement {
    pub fn new(code: CourseCode) -> Self {
        Self {
            code,
            min_grade: None,
            concurrent_allowed: false,
        }
    }
}

/// One node of a requirement tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// Group-level minimum grade inherited by every course leaf below that
    /// has no explicit grade of its own.
    pub grade_floor: Option<Grade>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExpressionKind {
    // Leaves.
    Course(CourseRequirement),
    Classification(Classification),
    Exam,
    /// Current enrollment in the course the requirement text belongs to.
    ConcurrentEnrollment,

    // Composites, never empty and never holding a single child.
    And(Vec<Expression>),
    Or(Vec<Expression>),
}

impl From<ExpressionKind> for Expression {
    fn from(kind: ExpressionKind) -> Self {
        Self {
            kind,
            grade_floor: None,
        }
    }
}

impl Expression {
    pub fn course(code: CourseCode) -> Self {
        ExpressionKind::Course(CourseRequirement::new(code)).into()
    }

    pub fn classification(level: Classification) -> Self {
        ExpressionKind::Classification(level).into()
    }

    pub fn exam() -> Self {
        ExpressionKind::Exam.into()
    }

    pub fn concurrent_enrollment() -> Self {
        ExpressionKind::ConcurrentEnrollment.into()
    }

    pub fn with_grade_floor(mut self, floor: Option<Grade>) -> Self {
        self.grade_floor = floor;
        self
    }

    /// Conjunction of `children`. Returns `None` for no children and the
    /// child itself for exactly one.
    pub fn all(children: Vec<Expression>) -> Option<Self> {
        Self::composite(children, false)
    }

    /// Disjunction of `children`, with the same collapsing rules as
    /// [`Expression::all`]. Classification leaves are merged into a single
    /// leaf at the lowest listed level.
    pub fn any(children: Vec<Expression>) -> Option<Self> {
        Self::composite(children, true)
    }

    fn composite(children: Vec<Expression>, is_or: bool) -> Option<Self> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expression {
                    kind: ExpressionKind::Or(inner),
                    grade_floor: None,
                } if is_or => flat.extend(inner),
                Expression {
                    kind: ExpressionKind::And(inner),
                    grade_floor: None,
                } if !is_or => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if is_or {
            flat = merge_classifications(flat);
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ if is_or => Some(ExpressionKind::Or(flat).into()),
            _ => Some(ExpressionKind::And(flat).into()),
        }
    }

    /// Applies a group floor to this node. An existing floor is kept, since
    /// the nearer annotation wins.
    pub(crate) fn inherit_floor(&mut self, floor: Option<Grade>) {
        if self.grade_floor.is_none() {
            self.grade_floor = floor;
        }
    }

    /// Sets the explicit grade of every course leaf that has none, descending
    /// through cross-listings.
    pub(crate) fn set_leaf_grade(&mut self, grade: Grade) {
        match &mut self.kind {
            ExpressionKind::Course(course) => {
                course.min_grade.get_or_insert(grade);
            }
            ExpressionKind::And(children) | ExpressionKind::Or(children) => {
                for child in children {
                    child.set_leaf_grade(grade);
                }
            }
            _ => {}
        }
    }

    /// Marks every course leaf as satisfiable by current enrollment.
    pub(crate) fn allow_concurrent(&mut self) {
        match &mut self.kind {
            ExpressionKind::Course(course) => course.concurrent_allowed = true,
            ExpressionKind::And(children) | ExpressionKind::Or(children) => {
                children.iter_mut().for_each(Self::allow_concurrent)
            }
            _ => {}
        }
    }

    pub fn children(&self) -> &[Expression] {
        match &self.kind {
            ExpressionKind::And(children) | ExpressionKind::Or(children) => children,
            _ => &[],
        }
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Self::size).sum::<usize>()
    }

    /// One-line description of this node, without its children.
    pub fn label(&self) -> String {
        let mut label = match &self.kind {
            ExpressionKind::Course(course) => {
                let mut label = format!("COURSE: {}", course.code);
                if let Some(grade) = course.min_grade {
                    label.push_str(&format!(" (min {grade})"));
                }
                if course.concurrent_allowed {
                    label.push_str(" (or concurrent)");
                }
                label
            }
            ExpressionKind::Classification(level) => format!("CLASSIFICATION: {level}"),
            ExpressionKind::Exam => "EXAM".to_string(),
            ExpressionKind::ConcurrentEnrollment => "CONCURRENT ENROLLMENT".to_string(),
            ExpressionKind::And(_) => "AND".to_string(),
            ExpressionKind::Or(_) => "OR".to_string(),
        };
        if let Some(floor) = self.grade_floor {
            label.push_str(&format!(" [GRADE {floor}]"));
        }
        label
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}- {}", "", self.label(), indent = depth * 4)?;
        for child in self.children() {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

fn merge_classifications(children: Vec<Expression>) -> Vec<Expression> {
    let mut merged: Vec<Expression> = Vec::with_capacity(children.len());
    let mut slot: Option<usize> = None;
    for child in children {
        match child.kind {
            ExpressionKind::Classification(level) => match slot {
                Some(index) => {
                    if let ExpressionKind::Classification(existing) = &mut merged[index].kind {
                        *existing = (*existing).min(level);
                    }
                }
                None => {
                    slot = Some(merged.len());
                    merged.push(Expression::classification(level));
                }
            },
            _ => merged.push(child),
        }
    }
    merged
}

/// Indented tree rendering, one node per line.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Parsed form of one course's requirement text.
///
/// `segments` are the clauses of the text. They are the children of an
/// implicit top-level conjunction, so an empty tree is vacuously satisfied.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequirementTree {
    /// The course this requirement text is attached to, if known. Needed to
    /// decide bare concurrent-enrollment and exam leaves.
    pub target: Option<CourseCode>,
    pub segments: Vec<Expression>,
}

impl RequirementTree {
    pub fn new(target: Option<CourseCode>, segments: Vec<Expression>) -> Self {
        Self { target, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The whole tree as a single expression, or `None` if there are no
    /// clauses.
    pub fn root(&self) -> Option<Expression> {
        Expression::all(self.segments.clone())
    }

    pub fn with_target(mut self, target: CourseCode) -> Self {
        self.target = Some(target);
        self
    }
}

impl fmt::Display for RequirementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => writeln!(f, "ROOT: {target}")?,
            None => writeln!(f, "ROOT")?,
        }
        for segment in &self.segments {
            segment.fmt_indented(f, 1)?;
        }
        Ok(())
    }
}
