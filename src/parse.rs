use crate::expression::{CourseCode, Expression, ExpressionKind, Grade, RequirementTree};
use crate::tokenize::{split_segments, tokenize, Token};

/// Parses requirement text that is not attached to a known course.
///
/// Never fails. Unrecognized prose is dropped, and text with no recognizable
/// requirement yields an empty (vacuously satisfied) tree.
pub fn parse(text: &str) -> RequirementTree {
    RequirementTree::parse(text)
}

impl RequirementTree {
    /// Parse the requirement tree from `text`.
    pub fn parse(text: &str) -> Self {
        Self::from_tokens(None, &tokenize(text))
    }

    /// Parse the requirement text of `target`.
    ///
    /// The target is what a bare "concurrent enrollment" refers to, so trees
    /// that should honor it must be parsed this way.
    pub fn parse_for(target: CourseCode, text: &str) -> Self {
        Self::from_tokens(Some(target), &tokenize(text))
    }

    /// Builds one tree per clause of `tokens` and conjoins them at the root.
    pub fn from_tokens(target: Option<CourseCode>, tokens: &[Token]) -> Self {
        let segments: Vec<_> = split_segments(tokens)
            .filter_map(|segment| Parser::new(segment).segment())
            .collect();
        tracing::debug!(
            course = ?target,
            tokens = tokens.len(),
            segments = segments.len(),
            "parsed requirement text"
        );
        Self { target, segments }
    }
}

/// Recursive-descent parser over the tokens of one clause.
///
/// ```text
/// segment    := grade_flag? term ( OR grade_flag? term )*
/// term       := factor ( (AND | COMMA) factor )*
/// factor     := COURSE (SLASH COURSE)*
///             | CONCURRENT COURSE?
///             | CLASSIFICATION
///             | EXAM
///             | GRADE+ factor
/// ```
struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
}

/// Output of the `term` production before it becomes a node.
#[derive(Default)]
struct Term {
    factors: Vec<Expression>,
    /// A bare "concurrent enrollment" appeared among the factors.
    concurrent: bool,
    /// Factors were joined by an explicit "and" rather than only commas.
    explicit_and: bool,
}

impl Term {
    /// A comma list like "A, B, or C" takes its meaning from the closing
    /// "or", so its factors are alternatives rather than a conjunction.
    fn is_serial_list(&self) -> bool {
        !self.explicit_and && self.factors.len() > 1
    }

    fn into_expression(self) -> Option<Expression> {
        let conjunction = Expression::all(self.factors);
        if !self.concurrent {
            return conjunction;
        }
        Expression::any(
            conjunction
                .into_iter()
                .chain(std::iter::once(Expression::concurrent_enrollment()))
                .collect(),
        )
    }

    fn push_alternatives(self, alternatives: &mut Vec<Expression>, floor: Option<Grade>, before_or: bool) {
        if before_or && self.is_serial_list() {
            for mut factor in self.factors {
                factor.inherit_floor(floor);
                alternatives.push(factor);
            }
            if self.concurrent {
                alternatives.push(Expression::concurrent_enrollment());
            }
        } else if let Some(mut node) = self.into_expression() {
            node.inherit_floor(floor);
            alternatives.push(node);
        }
    }
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, position: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.position + offset)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Parses the whole clause. Tokens left over after the grammar stops are
    /// parsed again from the top and conjoined with what came before.
    fn segment(mut self) -> Option<Expression> {
        let mut parts = Vec::new();
        while !self.at_end() {
            if !parts.is_empty() {
                tracing::trace!(position = self.position, "resuming after unparsed tokens");
            }
            if let Some(node) = self.disjunction() {
                parts.push(node);
            }
        }
        Expression::all(parts)
    }

    /// `grade_flag? term ( OR grade_flag? term )*`. Consumes at least one
    /// token unless at the end.
    fn disjunction(&mut self) -> Option<Expression> {
        let group_floor = self.grade_flags();

        let mut alternatives = Vec::new();
        let mut term_floor = None;
        loop {
            let term = self.term();
            let before_or = self.or_ahead();
            term.push_alternatives(&mut alternatives, term_floor, before_or);
            if !before_or {
                break;
            }
            self.skip_or();
            term_floor = self.grade_flags();
        }

        let mut node = Expression::any(alternatives)?;
        node.inherit_floor(group_floor);
        Some(node)
    }

    /// `factor ( (AND | COMMA) factor )*`
    fn term(&mut self) -> Term {
        let mut term = Term::default();
        self.collect_factor(&mut term);
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(Token::And), _) => {
                    self.position += 1;
                    term.explicit_and = true;
                }
                (Some(Token::Comma), Some(Token::And)) => {
                    self.position += 2;
                    term.explicit_and = true;
                }
                // ", or" closes the term.
                (Some(Token::Comma), Some(Token::Or)) => break,
                (Some(Token::Comma), _) => self.position += 1,
                _ => break,
            }
            self.collect_factor(&mut term);
        }
        term
    }

    fn collect_factor(&mut self, term: &mut Term) {
        match self.factor() {
            Some(Expression {
                kind: ExpressionKind::ConcurrentEnrollment,
                ..
            }) => term.concurrent = true,
            Some(node) => term.factors.push(node),
            None => {}
        }
    }

    /// Consumes at least one token unless at the end. Tokens that cannot
    /// start a factor are dropped.
    fn factor(&mut self) -> Option<Expression> {
        let token = self.advance()?;
        match token {
            Token::Course(code) => {
                let mut node = self.cross_listing(code);
                self.postfix_grade(&mut node);
                Some(node)
            }
            Token::Concurrent => match self.peek() {
                Some(Token::Course(code)) => {
                    self.position += 1;
                    let mut node = self.cross_listing(code);
                    node.allow_concurrent();
                    self.postfix_grade(&mut node);
                    Some(node)
                }
                _ => Some(Expression::concurrent_enrollment()),
            },
            Token::Classification(level) => Some(Expression::classification(*level)),
            Token::Exam => Some(Expression::exam()),
            Token::Grade(grade) => {
                let floor = self.grade_flags().unwrap_or(*grade);
                let mut node = self.factor()?;
                node.inherit_floor(Some(floor));
                Some(node)
            }
            other => {
                tracing::trace!(token = ?other, position = self.position - 1, "dropping token");
                None
            }
        }
    }

    /// `COURSE (SLASH COURSE)*`, with `first` already consumed. Cross-listed
    /// codes name the same course, so any of them satisfies it.
    fn cross_listing(&mut self, first: &CourseCode) -> Expression {
        let mut codes = vec![Expression::course(first.clone())];
        while let (Some(Token::Slash), Some(Token::Course(code))) = (self.peek(), self.peek_at(1)) {
            codes.push(Expression::course(code.clone()));
            self.position += 2;
        }
        match codes.len() {
            1 => codes.remove(0),
            _ => ExpressionKind::Or(codes).into(),
        }
    }

    /// "CSCE 221 with a grade of C or better": a grade clause right after a
    /// course that does not introduce another course belongs to that course.
    fn postfix_grade(&mut self, node: &mut Expression) {
        if let Some(Token::Grade(grade)) = self.peek() {
            if !matches!(self.peek_at(1), Some(Token::Course(_) | Token::Concurrent)) {
                self.position += 1;
                node.set_leaf_grade(*grade);
            }
        }
    }

    /// Consecutive grade clauses; the last one wins.
    fn grade_flags(&mut self) -> Option<Grade> {
        let mut floor = None;
        while let Some(Token::Grade(grade)) = self.peek() {
            floor = Some(*grade);
            self.position += 1;
        }
        floor
    }

    fn or_ahead(&self) -> bool {
        matches!(
            (self.peek(), self.peek_at(1)),
            (Some(Token::Or), _) | (Some(Token::Comma), Some(Token::Or))
        )
    }

    fn skip_or(&mut self) {
        if self.peek() == Some(&Token::Comma) {
            self.position += 1;
        }
        self.position += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Classification, CourseRequirement};
    use crate::tokenize::Tokenizer;
    use pretty_assertions::assert_eq;

    fn code(s: &str) -> CourseCode {
        s.parse().unwrap()
    }

    fn course(s: &str) -> Expression {
        Expression::course(code(s))
    }

    fn or(children: Vec<Expression>) -> Expression {
        ExpressionKind::Or(children).into()
    }

    fn and(children: Vec<Expression>) -> Expression {
        ExpressionKind::And(children).into()
    }

    #[test]
    fn simple_disjunction() {
        let tree = parse("Prerequisite: ACCT 209 or ACCT 229.");
        assert_eq!(tree.segments, vec![or(vec![course("ACCT 209"), course("ACCT 229")])]);
        assert_eq!(tree.target, None);
    }

    #[test]
    fn empty_text_has_no_segments() {
        assert!(parse("").is_empty());
        assert!(parse("Approval of instructor.").is_empty());
        assert_eq!(parse("").root(), None);
    }

    #[test]
    fn cross_listing_is_a_disjunction() {
        let tree = parse("ECEN 350/CSCE 350");
        assert_eq!(tree.segments, vec![or(vec![course("ECEN 350"), course("CSCE 350")])]);
    }

    #[test]
    fn comma_and_and_are_conjunctions() {
        let tree = parse("MATH 151, PHYS 206 and CHEM 107");
        assert_eq!(
            tree.segments,
            vec![and(vec![course("MATH 151"), course("PHYS 206"), course("CHEM 107")])]
        );
        let tree = parse("MATH 151, PHYS 206, and CHEM 107");
        assert_eq!(
            tree.segments,
            vec![and(vec![course("MATH 151"), course("PHYS 206"), course("CHEM 107")])]
        );
    }

    #[test]
    fn or_binds_looser_than_and() {
        let tree = parse("ECEN 303 and ECEN 322 or CSCE 315");
        assert_eq!(
            tree.segments,
            vec![or(vec![
                and(vec![course("ECEN 303"), course("ECEN 322")]),
                course("CSCE 315"),
            ])]
        );
    }

    #[test]
    fn serial_list_closed_by_or() {
        let tree = parse(
            "Grade of C or better in MATH 142, MATH 147, MATH 151, or MATH 171, or concurrent enrollment.",
        );
        let expected = or(vec![
            course("MATH 142"),
            course("MATH 147"),
            course("MATH 151"),
            course("MATH 171"),
            Expression::concurrent_enrollment(),
        ])
        .with_grade_floor(Some(Grade::C));
        assert_eq!(tree.segments, vec![expected]);

        let tree = parse("MATH 221, MATH 251 or MATH 253");
        assert_eq!(
            tree.segments,
            vec![or(vec![course("MATH 221"), course("MATH 251"), course("MATH 253")])]
        );
    }

    #[test]
    fn classifications_reduce_to_minimum() {
        let tree = parse("junior or senior classification.");
        assert_eq!(
            tree.segments,
            vec![Expression::classification(Classification::Junior)]
        );
    }

    #[test]
    fn concurrent_course() {
        let tree = parse("Concurrent enrollment in CHEM 117");
        let expected: Expression = ExpressionKind::Course(CourseRequirement {
            code: code("CHEM 117"),
            min_grade: None,
            concurrent_allowed: true,
        })
        .into();
        assert_eq!(tree.segments, vec![expected]);
    }

    #[test]
    fn bare_concurrent_folds_into_term() {
        let tree = parse("MATH 308 and concurrent enrollment");
        assert_eq!(
            tree.segments,
            vec![or(vec![course("MATH 308"), Expression::concurrent_enrollment()])]
        );

        let tree = parse("MATH 308 or concurrent enrollment");
        assert_eq!(
            tree.segments,
            vec![or(vec![course("MATH 308"), Expression::concurrent_enrollment()])]
        );
    }

    #[test]
    fn grade_floor_scopes() {
        let tree = parse("grade of C or better in MATH 151 or grade of B or better in STAT 201");
        let expected = or(vec![
            course("MATH 151"),
            course("STAT 201").with_grade_floor(Some(Grade::B)),
        ])
        .with_grade_floor(Some(Grade::C));
        assert_eq!(tree.segments, vec![expected]);

        let tree = parse("Grade of B or better in STAT 201 and MATH 151");
        let expected = and(vec![course("STAT 201"), course("MATH 151")]).with_grade_floor(Some(Grade::B));
        assert_eq!(tree.segments, vec![expected]);
    }

    #[test]
    fn long_runs_of_grade_clauses() {
        let text = format!("MATH 151 and {}MATH 152", "grade or better ".repeat(5_000));
        let tree = parse(&text);
        assert_eq!(
            tree.segments,
            vec![and(vec![
                course("MATH 151"),
                course("MATH 152").with_grade_floor(Some(Grade::C)),
            ])]
        );

        let tree = parse("MATH 151 and grade of A or better grade of B or better in MATH 152");
        assert_eq!(
            tree.segments,
            vec![and(vec![
                course("MATH 151"),
                course("MATH 152").with_grade_floor(Some(Grade::B)),
            ])]
        );
    }

    #[test]
    fn postfix_grade_is_explicit() {
        let tree = parse("CSCE 221 with a grade of B or better");
        let expected: Expression = ExpressionKind::Course(CourseRequirement {
            code: code("CSCE 221"),
            min_grade: Some(Grade::B),
            concurrent_allowed: false,
        })
        .into();
        assert_eq!(tree.segments, vec![expected]);
    }

    #[test]
    fn leftover_tokens_are_conjoined() {
        let tree = parse("MATH 151 grade of B or better in STAT 201");
        assert_eq!(
            tree.segments,
            vec![and(vec![
                course("MATH 151"),
                course("STAT 201").with_grade_floor(Some(Grade::B)),
            ])]
        );
    }

    #[test]
    fn unknown_tokens_are_dropped() {
        let tokens = Tokenizer { keep_unknown: true }.tokenize("approval of instructor or MATH 151");
        let tree = RequirementTree::from_tokens(None, &tokens);
        assert_eq!(tree.segments, vec![course("MATH 151")]);
    }

    #[test]
    fn dangling_operators_are_dropped() {
        let tree = parse("or , and MATH 151 /");
        assert_eq!(tree.segments, vec![course("MATH 151")]);
    }

    #[test]
    fn segments_are_conjoined_at_root() {
        let tree = parse_for_target("MATH 309", "MATH 151; senior classification.");
        assert_eq!(tree.target, Some(code("MATH 309")));
        assert_eq!(
            tree.segments,
            vec![course("MATH 151"), Expression::classification(Classification::Senior)]
        );
        assert_eq!(
            tree.root(),
            Some(and(vec![
                course("MATH 151"),
                Expression::classification(Classification::Senior),
            ]))
        );
    }

    #[test]
    fn full_catalog_entry() {
        let tree = parse(
            "Prerequisites: Grade of C or better in COMM 205 or COMM 243 or ENGL 210; \
             grade of C or better in ECEN 314, ECEN 325, and ECEN 350/CSCE 350 or CSCE 350/ECEN 350; \
             grade of C or better in ECEN 303, ECEN 322, and ECEN 370, or grade C or better in CSCE 315 or CSCE 331, \
             and ECEN 303 or STAT 211, and ECEN 449 or CSCE 462, or concurrent enrollment; senior classification.",
        );
        assert_eq!(tree.segments.len(), 4);
        assert_eq!(
            tree.segments[0],
            or(vec![course("COMM 205"), course("COMM 243"), course("ENGL 210")])
                .with_grade_floor(Some(Grade::C))
        );
        assert_eq!(
            tree.segments[3],
            Expression::classification(Classification::Senior)
        );
    }

    fn parse_for_target(target: &str, text: &str) -> RequirementTree {
        RequirementTree::parse_for(code(target), text)
    }
}
