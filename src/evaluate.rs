use std::fmt;

use bitvec::vec::BitVec;

use crate::config::EvaluationConfig;
use crate::expression::{CourseCode, CourseRequirement, Expression, ExpressionKind, Grade, RequirementTree};
use crate::record::StudentRecord;

#[cfg(feature = "rayon")]
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

/// Decides whether `record` satisfies `tree` under the default
/// [`EvaluationConfig`].
pub fn evaluate(tree: &RequirementTree, record: &StudentRecord) -> bool {
    tree.evaluate(record)
}

/// Everything a node needs besides itself. Borrowed for the duration of one
/// evaluation; nothing here is mutated.
#[derive(Clone, Copy)]
struct Context<'a> {
    target: Option<&'a CourseCode>,
    record: &'a StudentRecord,
    config: &'a EvaluationConfig,
}

impl Context<'_> {
    fn course_met(&self, course: &CourseRequirement, floor: Option<Grade>) -> bool {
        let min = course
            .min_grade
            .or(floor)
            .unwrap_or(self.config.default_min_grade);
        self.record.has_completed(&course.code, min)
            || (course.concurrent_allowed && self.record.is_enrolled(&course.code))
    }
}

impl RequirementTree {
    pub fn evaluate(&self, record: &StudentRecord) -> bool {
        self.evaluate_with(record, &EvaluationConfig::default())
    }

    /// True iff every clause holds. A tree with no clauses is vacuously
    /// satisfied.
    pub fn evaluate_with(&self, record: &StudentRecord, config: &EvaluationConfig) -> bool {
        let context = self.context(record, config);
        let satisfied = self
            .segments
            .iter()
            .all(|segment| segment.evaluate_recursive(context, None));
        tracing::debug!(course = ?self.target, satisfied, "evaluated requirement tree");
        satisfied
    }

    /// Evaluates the tree against each record. Bit `i` of the output is the
    /// result for `records[i]`.
    pub fn evaluate_batch(&self, records: &[StudentRecord], config: &EvaluationConfig) -> BitVec {
        #[cfg(feature = "rayon")]
        let results: Vec<bool> = records
            .par_iter()
            .map(|record| self.evaluate_with(record, config))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let results: Vec<bool> = records
            .iter()
            .map(|record| self.evaluate_with(record, config))
            .collect();

        results.into_iter().collect()
    }

    /// Evaluates every node, without short-circuiting, and reports which
    /// parts of the requirement are met.
    pub fn explain(&self, record: &StudentRecord, config: &EvaluationConfig) -> Explanation {
        let context = self.context(record, config);
        let children: Vec<_> = self
            .segments
            .iter()
            .map(|segment| segment.explain_recursive(context, None))
            .collect();
        let label = match &self.target {
            Some(target) => format!("ROOT: {target}"),
            None => "ROOT".to_string(),
        };
        Explanation {
            label,
            satisfied: children.iter().all(|child| child.satisfied),
            children,
        }
    }

    fn context<'a>(&'a self, record: &'a StudentRecord, config: &'a EvaluationConfig) -> Context<'a> {
        Context {
            target: self.target.as_ref(),
            record,
            config,
        }
    }
}

impl Expression {
    /// Evaluates a standalone expression. `target` is the course the
    /// requirement belongs to, if known.
    pub fn evaluate(
        &self,
        record: &StudentRecord,
        target: Option<&CourseCode>,
        config: &EvaluationConfig,
    ) -> bool {
        let context = Context {
            target,
            record,
            config,
        };
        self.evaluate_recursive(context, None)
    }

    fn evaluate_recursive(&self, context: Context<'_>, inherited: Option<Grade>) -> bool {
        let floor = self.grade_floor.or(inherited);
        match &self.kind {
            ExpressionKind::And(children) => children
                .iter()
                .all(|child| child.evaluate_recursive(context, floor)),
            ExpressionKind::Or(children) => children
                .iter()
                .any(|child| child.evaluate_recursive(context, floor)),
            ExpressionKind::Course(course) => context.course_met(course, floor),
            ExpressionKind::Classification(level) => context
                .record
                .classification()
                .is_some_and(|standing| standing >= *level),
            // Undetermined from the text alone; needs a caller-supplied
            // credit for the target course.
            ExpressionKind::Exam => context
                .target
                .is_some_and(|code| context.record.has_exam_credit(code)),
            ExpressionKind::ConcurrentEnrollment => context
                .target
                .is_some_and(|code| context.record.is_enrolled(code)),
        }
    }

    fn explain_recursive(&self, context: Context<'_>, inherited: Option<Grade>) -> Explanation {
        let floor = self.grade_floor.or(inherited);
        let (satisfied, children) = match &self.kind {
            ExpressionKind::And(children) | ExpressionKind::Or(children) => {
                let children: Vec<_> = children
                    .iter()
                    .map(|child| child.explain_recursive(context, floor))
                    .collect();
                let satisfied = if matches!(self.kind, ExpressionKind::And(_)) {
                    children.iter().all(|child| child.satisfied)
                } else {
                    children.iter().any(|child| child.satisfied)
                };
                (satisfied, children)
            }
            _ => (self.evaluate_recursive(context, floor), Vec::new()),
        };
        Explanation {
            label: self.label(),
            satisfied,
            children,
        }
    }
}

/// Per-node evaluation result, mirroring the shape of the evaluated tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Explanation {
    pub label: String,
    pub satisfied: bool,
    pub children: Vec<Explanation>,
}

impl Explanation {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let status = if self.satisfied { "met" } else { "needed" };
        writeln!(f, "{:indent$}- {} => {status}", "", self.label, indent = depth * 4)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Classification;
    use proptest::prelude::*;

    fn code(s: &str) -> CourseCode {
        s.parse().unwrap()
    }

    fn course(s: &str) -> Expression {
        Expression::course(code(s))
    }

    fn check(expression: &Expression, record: &StudentRecord) -> bool {
        expression.evaluate(record, None, &EvaluationConfig::default())
    }

    #[test]
    fn default_minimum_is_c() {
        let leaf = course("MATH 151");
        for (grade, expected) in [
            (Grade::A, true),
            (Grade::B, true),
            (Grade::C, true),
            (Grade::D, false),
            (Grade::F, false),
        ] {
            let record = StudentRecord::new().with_taken(code("MATH 151"), grade);
            assert_eq!(check(&leaf, &record), expected, "grade {grade}");
        }

        let config = EvaluationConfig {
            default_min_grade: Grade::D,
        };
        let record = StudentRecord::new().with_taken(code("MATH 151"), Grade::D);
        assert!(leaf.evaluate(&record, None, &config));
    }

    #[test]
    fn leaf_grade_beats_group_floor() {
        let strict: Expression = ExpressionKind::Course(CourseRequirement {
            code: code("CSCE 221"),
            min_grade: Some(Grade::D),
            concurrent_allowed: false,
        })
        .into();
        let group = Expression::all(vec![strict, course("CSCE 222")])
            .unwrap()
            .with_grade_floor(Some(Grade::B));

        let record = StudentRecord::new()
            .with_taken(code("CSCE 221"), Grade::D)
            .with_taken(code("CSCE 222"), Grade::B);
        assert!(check(&group, &record));

        let record = StudentRecord::new()
            .with_taken(code("CSCE 221"), Grade::D)
            .with_taken(code("CSCE 222"), Grade::C);
        assert!(!check(&group, &record));
    }

    #[test]
    fn nearest_floor_wins() {
        let inner = course("STAT 201").with_grade_floor(Some(Grade::B));
        let group = Expression::all(vec![inner, course("MATH 151")])
            .unwrap()
            .with_grade_floor(Some(Grade::D));
        let record = StudentRecord::new()
            .with_taken(code("STAT 201"), Grade::C)
            .with_taken(code("MATH 151"), Grade::D);
        assert!(!check(&group, &record));

        let record = record.with_taken(code("STAT 201"), Grade::B);
        assert!(check(&group, &record));
    }

    #[test]
    fn concurrent_course_accepts_enrollment() {
        let mut leaf = course("CHEM 117");
        assert!(!check(&leaf, &StudentRecord::new().with_enrolled(code("CHEM 117"))));
        leaf.allow_concurrent();
        assert!(check(&leaf, &StudentRecord::new().with_enrolled(code("CHEM 117"))));
        assert!(check(&leaf, &StudentRecord::new().with_taken(code("CHEM 117"), Grade::A)));
        assert!(!check(&leaf, &StudentRecord::new()));
    }

    #[test]
    fn bare_concurrent_needs_target() {
        let leaf = Expression::concurrent_enrollment();
        let record = StudentRecord::new().with_enrolled(code("STAT 211"));
        let config = EvaluationConfig::default();
        assert!(leaf.evaluate(&record, Some(&code("STAT 211")), &config));
        assert!(!leaf.evaluate(&record, Some(&code("STAT 212")), &config));
        assert!(!leaf.evaluate(&record, None, &config));
    }

    #[test]
    fn exam_needs_override() {
        let tree = RequirementTree::parse_for(code("MATH 142"), "placement exam");
        assert!(!tree.evaluate(&StudentRecord::new()));
        assert!(tree.evaluate(&StudentRecord::new().with_exam_credit(code("MATH 142"))));
        assert!(!RequirementTree::parse("placement exam")
            .evaluate(&StudentRecord::new().with_exam_credit(code("MATH 142"))));
    }

    #[test]
    fn classification_rank() {
        let leaf = Expression::classification(Classification::Junior);
        let record = |level| StudentRecord::new().with_classification(level);
        assert!(check(&leaf, &record(Classification::Senior)));
        assert!(check(&leaf, &record(Classification::Junior)));
        assert!(!check(&leaf, &record(Classification::Sophomore)));
        assert!(!check(&leaf, &StudentRecord::new()));
    }

    #[test]
    fn empty_tree_is_vacuously_satisfied() {
        assert!(RequirementTree::default().evaluate(&StudentRecord::new()));
    }

    #[test]
    fn evaluation_does_not_mutate() {
        let tree = RequirementTree::parse_for(
            code("ECEN 403"),
            "Grade of C or better in ECEN 314 or concurrent enrollment; senior classification.",
        );
        let record = StudentRecord::from_entries(["ECEN314 D"], ["ECEN403 ^"])
            .with_classification(Classification::Senior);
        let (tree_before, record_before) = (tree.clone(), record.clone());

        let first = tree.evaluate(&record);
        let second = tree.evaluate(&record);
        assert!(first);
        assert_eq!(first, second);
        assert_eq!(tree, tree_before);
        assert_eq!(record, record_before);
    }

    #[test]
    fn batch_matches_single() {
        let tree = RequirementTree::parse("ACCT 209 or ACCT 229");
        let records = vec![
            StudentRecord::from_entries(["ACCT209 C"], Vec::<&str>::new()),
            StudentRecord::new(),
            StudentRecord::from_entries(["ACCT229 A"], Vec::<&str>::new()),
        ];
        let results = tree.evaluate_batch(&records, &EvaluationConfig::default());
        assert_eq!(results.len(), 3);
        assert!(results[0]);
        assert!(!results[1]);
        assert!(results[2]);
    }

    #[test]
    fn explanation_reports_every_node() {
        let tree = RequirementTree::parse("MATH 151 and MATH 152 or PHYS 206");
        let record = StudentRecord::new().with_taken(code("MATH 151"), Grade::A);
        let explanation = tree.explain(&record, &EvaluationConfig::default());
        assert!(!explanation.satisfied);
        assert_eq!(
            explanation.to_string(),
            "- ROOT => needed\n\
             \x20   - OR => needed\n\
             \x20       - AND => needed\n\
             \x20           - COURSE: MATH 151 => met\n\
             \x20           - COURSE: MATH 152 => needed\n\
             \x20       - COURSE: PHYS 206 => needed\n"
        );
    }

    #[test]
    fn explanation_of_leaf_kinds() {
        let tree = RequirementTree::parse_for(
            code("MATH 309"),
            "Grade of B or better in MATH 308 or concurrent enrollment; placement exam; junior classification.",
        );
        let record = StudentRecord::new()
            .with_taken(code("MATH 308"), Grade::C)
            .with_enrolled(code("MATH 309"))
            .with_classification(Classification::Senior);
        let explanation = tree.explain(&record, &EvaluationConfig::default());
        assert!(!explanation.satisfied);
        assert_eq!(
            explanation.to_string(),
            "- ROOT: MATH 309 => needed\n\
             \x20   - OR [GRADE B] => met\n\
             \x20       - COURSE: MATH 308 => needed\n\
             \x20       - CONCURRENT ENROLLMENT => met\n\
             \x20   - EXAM => needed\n\
             \x20   - CLASSIFICATION: Junior => met\n"
        );
        assert_eq!(explanation.satisfied, tree.evaluate(&record));
    }

    /// Boolean shape of a tree whose leaves are known to be true or false.
    #[derive(Clone, Debug)]
    enum Shape {
        Leaf(bool),
        And(Vec<Shape>),
        Or(Vec<Shape>),
    }

    impl Shape {
        fn expected(&self) -> bool {
            match self {
                Shape::Leaf(value) => *value,
                Shape::And(children) => children.iter().all(Shape::expected),
                Shape::Or(children) => children.iter().any(Shape::expected),
            }
        }

        /// Gives each leaf its own course; true leaves are recorded as taken.
        fn build(&self, next: &mut usize, record: &mut StudentRecord) -> Expression {
            match self {
                Shape::Leaf(value) => {
                    let code = CourseCode::new("TST", &format!("{:03}", *next)).unwrap();
                    *next += 1;
                    if *value {
                        record.add_taken(code.clone(), Grade::B);
                    }
                    Expression::course(code)
                }
                Shape::And(children) => Expression::all(
                    children.iter().map(|child| child.build(next, record)).collect(),
                )
                .unwrap(),
                Shape::Or(children) => Expression::any(
                    children.iter().map(|child| child.build(next, record)).collect(),
                )
                .unwrap(),
            }
        }
    }

    fn shape() -> impl Strategy<Value = Shape> {
        any::<bool>().prop_map(Shape::Leaf).prop_recursive(4, 64, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::And),
                prop::collection::vec(inner, 1..4).prop_map(Shape::Or),
            ]
        })
    }

    proptest! {
        #[test]
        fn and_or_follow_boolean_logic(shape in shape()) {
            let mut record = StudentRecord::new();
            let expression = shape.build(&mut 0, &mut record);
            prop_assert_eq!(check(&expression, &record), shape.expected());
        }
    }
}
