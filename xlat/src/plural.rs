/* Copyright (C) 2018 Olivier Goffart <ogoffart@woboq.com>

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense,
and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so,
subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES
OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

//! `Plural-Forms` header compiler.
//!
//! A header such as `nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 ? 1 : 2);`
//! compiles into a [`PluralRule`] that maps a count to a plural form index.

use std::sync::Arc;

use thiserror::Error;

/// Why a `Plural-Forms` header could not be compiled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PluralFormsError {
    #[error("missing `nplurals=`")]
    MissingNPlurals,
    #[error("invalid nplurals value {0:?}")]
    InvalidNPlurals(String),
    #[error("missing `plural=`")]
    MissingPlural,
    #[error("error parsing plural rules '{rules}': {error}")]
    InvalidExpression { rules: String, error: String },
}

/// A compiled plural rule.
///
/// A rule with zero forms is the "unusable header" sentinel: its
/// [`select`](Self::select) never matches, and callers fall back to
/// [`PluralRule::default_index`].
#[derive(Clone, Default)]
pub struct PluralRule {
    total_forms: usize,
    expression: Option<Arc<expression::Expression>>,
    source: String,
}

impl PluralRule {
    /// Compiles a `Plural-Forms` header value, degrading to the zero-form
    /// sentinel on any error.
    pub fn parse(header: &str) -> Self {
        match Self::try_parse(header) {
            Ok(rule) => rule,
            Err(error) => {
                if !header.trim().is_empty() {
                    tracing::warn!(
                        %error,
                        header,
                        "unusable Plural-Forms header, using default rule"
                    );
                }
                Self {
                    source: header.to_owned(),
                    ..Self::default()
                }
            }
        }
    }

    /// Compiles a `Plural-Forms` header value.
    pub fn try_parse(header: &str) -> Result<Self, PluralFormsError> {
        let mut nplurals = None;
        let mut plural = None;
        for part in header.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "nplurals" => nplurals = Some(value.trim()),
                "plural" => plural = Some(value.trim()),
                _ => {}
            }
        }
        let nplurals = nplurals.ok_or(PluralFormsError::MissingNPlurals)?;
        let total_forms = nplurals
            .parse::<usize>()
            .map_err(|_| PluralFormsError::InvalidNPlurals(nplurals.to_owned()))?;
        let rules = plural.ok_or(PluralFormsError::MissingPlural)?;
        let expression = expression::parse_rule_expression(rules).map_err(|parse_error| {
            PluralFormsError::InvalidExpression {
                rules: rules.to_owned(),
                error: format!("{parse_error:?}"),
            }
        })?;
        tracing::debug!(total_forms, rules, "compiled Plural-Forms");
        Ok(Self {
            total_forms,
            expression: Some(Arc::new(expression)),
            source: header.to_owned(),
        })
    }

    /// Number of plural forms declared by `nplurals=`, or 0 for the sentinel.
    pub fn total_forms(&self) -> usize {
        if self.expression.is_some() {
            self.total_forms
        } else {
            0
        }
    }

    /// The header text this rule was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Form index for `n`, or `None` when the rule is unusable or the
    /// expression evaluates outside `0..total_forms`.
    ///
    /// Negative counts are evaluated on their absolute value.
    pub fn select(&self, n: i64) -> Option<usize> {
        let expression = self.expression.as_ref()?;
        let n = n.checked_abs().unwrap_or(i64::MAX);
        usize::try_from(expression.evaluate(n))
            .ok()
            .filter(|&index| index < self.total_forms)
    }

    /// The locale-independent two-form rule: 0 for exactly one, 1 otherwise.
    pub fn default_index(n: i64) -> usize {
        if n == 1 {
            0
        } else {
            1
        }
    }
}

impl std::fmt::Debug for PluralRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluralRule")
            .field("total_forms", &self.total_forms())
            .field("source", &self.source)
            .finish()
    }
}

mod expression {
    #[derive(Clone, Copy)]
    pub enum BinaryOp {
        And,
        Or,
        Add,
        Subtract,
        Multiply,
        Divide,
        Modulo,
        Equal,
        NotEqual,
        Greater,
        Smaller,
        GreaterOrEqual,
        SmallerOrEqual,
    }

    #[derive(Clone, Copy)]
    pub enum UnaryOp {
        Not,
        Negate,
    }

    pub enum SubExpression {
        NumberLiteral(i64),
        NVariable,
        Condition {
            condition: u16,
            true_expr: u16,
            false_expr: u16,
        },
        BinaryOp {
            op: BinaryOp,
            lhs: u16,
            rhs: u16,
        },
        UnaryOp {
            op: UnaryOp,
            operand: u16,
        },
    }

    impl SubExpression {
        fn evaluate(&self, sub_expressions: &[SubExpression], n: i64) -> i64 {
            let eval = |index: u16| sub_expressions[index as usize].evaluate(sub_expressions, n);
            match self {
                Self::NumberLiteral(value) => *value,
                Self::NVariable => n,
                Self::Condition {
                    condition,
                    true_expr,
                    false_expr,
                } => {
                    if eval(*condition) != 0 {
                        eval(*true_expr)
                    } else {
                        eval(*false_expr)
                    }
                }
                Self::UnaryOp { op, operand } => {
                    let value = eval(*operand);
                    match op {
                        UnaryOp::Not => (value == 0) as i64,
                        UnaryOp::Negate => value.wrapping_neg(),
                    }
                }
                Self::BinaryOp {
                    op: BinaryOp::And,
                    lhs,
                    rhs,
                } => (eval(*lhs) != 0 && eval(*rhs) != 0) as i64,
                Self::BinaryOp {
                    op: BinaryOp::Or,
                    lhs,
                    rhs,
                } => (eval(*lhs) != 0 || eval(*rhs) != 0) as i64,
                Self::BinaryOp { op, lhs, rhs } => {
                    let lhs_value = eval(*lhs);
                    let rhs_value = eval(*rhs);
                    match op {
                        BinaryOp::Add => lhs_value.wrapping_add(rhs_value),
                        BinaryOp::Subtract => lhs_value.wrapping_sub(rhs_value),
                        BinaryOp::Multiply => lhs_value.wrapping_mul(rhs_value),
                        // A divisor that turns out zero at runtime yields 0.
                        BinaryOp::Divide if rhs_value == 0 => 0,
                        BinaryOp::Divide => lhs_value.wrapping_div(rhs_value),
                        BinaryOp::Modulo if rhs_value == 0 => 0,
                        BinaryOp::Modulo => lhs_value.wrapping_rem(rhs_value),
                        BinaryOp::Equal => (lhs_value == rhs_value) as i64,
                        BinaryOp::NotEqual => (lhs_value != rhs_value) as i64,
                        BinaryOp::Greater => (lhs_value > rhs_value) as i64,
                        BinaryOp::Smaller => (lhs_value < rhs_value) as i64,
                        BinaryOp::GreaterOrEqual => (lhs_value >= rhs_value) as i64,
                        BinaryOp::SmallerOrEqual => (lhs_value <= rhs_value) as i64,
                        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                    }
                }
            }
        }
    }

    #[cfg(test)]
    struct DisplayExpression<'a>(usize, &'a [SubExpression]);

    #[cfg(test)]
    impl DisplayExpression<'_> {
        fn sub(&self, index: u16) -> Self {
            Self(index as usize, self.1)
        }
    }

    #[cfg(test)]
    impl std::fmt::Display for DisplayExpression<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.1[self.0] {
                SubExpression::NumberLiteral(value) => write!(f, "{}", value),
                SubExpression::NVariable => write!(f, "n"),
                SubExpression::Condition {
                    condition,
                    true_expr,
                    false_expr,
                } => write!(
                    f,
                    "({} ? {} : {})",
                    self.sub(*condition),
                    self.sub(*true_expr),
                    self.sub(*false_expr)
                ),
                SubExpression::UnaryOp { op, operand } => {
                    let op_str = match op {
                        UnaryOp::Not => "!",
                        UnaryOp::Negate => "-",
                    };
                    write!(f, "{}{}", op_str, self.sub(*operand))
                }
                SubExpression::BinaryOp { op, lhs, rhs } => {
                    let op_str = match op {
                        BinaryOp::And => "&",
                        BinaryOp::Or => "|",
                        BinaryOp::Add => "+",
                        BinaryOp::Subtract => "-",
                        BinaryOp::Multiply => "*",
                        BinaryOp::Divide => "/",
                        BinaryOp::Modulo => "%",
                        BinaryOp::Equal => "=",
                        BinaryOp::NotEqual => "!=",
                        BinaryOp::Greater => ">",
                        BinaryOp::Smaller => "<",
                        BinaryOp::GreaterOrEqual => "≥",
                        BinaryOp::SmallerOrEqual => "≤",
                    };
                    write!(f, "({} {} {})", self.sub(*lhs), op_str, self.sub(*rhs))
                }
            }
        }
    }

    // Nesting of parentheses, ternaries or prefix operators beyond this is
    // rejected.
    const MAX_DEPTH: usize = 64;

    // Evaluation recurses along the arena, so its size bounds the stack.
    // Real headers stay well under a hundred nodes.
    const MAX_NODES: usize = 512;

    #[derive(Default)]
    struct ExpressionBuilder {
        sub_expressions: Vec<SubExpression>,
        depth: usize,
    }

    impl ExpressionBuilder {
        fn add<'a>(
            &mut self,
            sub_expr: SubExpression,
            at: &'a [u8],
        ) -> Result<u16, ParseError<'a>> {
            if self.sub_expressions.len() >= MAX_NODES {
                return Err(ParseError("expression too long", at));
            }
            let index = self.sub_expressions.len() as u16;
            self.sub_expressions.push(sub_expr);
            Ok(index)
        }
    }

    pub struct Expression {
        sub_expressions: Box<[SubExpression]>,
    }

    impl From<ExpressionBuilder> for Expression {
        fn from(expression_builder: ExpressionBuilder) -> Self {
            Self {
                sub_expressions: expression_builder.sub_expressions.into_boxed_slice(),
            }
        }
    }

    impl Expression {
        pub fn evaluate(&self, n: i64) -> i64 {
            self.sub_expressions
                .last()
                .map(|expr| expr.evaluate(&self.sub_expressions, n))
                .unwrap_or(0)
        }
    }

    pub struct ParseError<'a>(pub &'static str, &'a [u8]);

    impl std::fmt::Debug for ParseError<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "ParseError({}, rest={:?})",
                self.0,
                String::from_utf8_lossy(self.1)
            )
        }
    }

    pub fn parse_rule_expression(string: &str) -> Result<Expression, ParseError<'_>> {
        let mut expression_builder = ExpressionBuilder::default();
        let s = parse_expression(string.as_bytes(), &mut expression_builder)?;
        if !s.rest.is_empty() {
            return Err(ParseError("extra character in string", s.rest));
        }
        Ok(expression_builder.into())
    }

    struct ParsingState<'a> {
        expr: u16,
        rest: &'a [u8],
    }

    type ParseResult<'a> = Result<ParsingState<'a>, ParseError<'a>>;

    /// `<or_expr> ('?' <expression> ':' <expression>)?`
    fn parse_expression<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        builder.depth += 1;
        if builder.depth > MAX_DEPTH {
            return Err(ParseError("expression nested too deeply", string));
        }
        let state = parse_or_expr(skip_whitespace(string), builder)?;
        let result = if let Some(rest) = state.rest.strip_prefix(b"?") {
            let s1 = parse_expression(rest, builder)?;
            let rest = s1
                .rest
                .strip_prefix(b":")
                .ok_or(ParseError("expected ':'", s1.rest))?;
            let s2 = parse_expression(rest, builder)?;
            let expr = builder.add(
                SubExpression::Condition {
                    condition: state.expr,
                    true_expr: s1.expr,
                    false_expr: s2.expr,
                },
                s2.rest,
            )?;
            ParsingState {
                expr,
                rest: s2.rest,
            }
        } else {
            state
        };
        builder.depth -= 1;
        Ok(result)
    }

    /// One left-associative precedence level: `<next> (<op> <next>)*`.
    fn parse_binary_level<'a>(
        string: &'a [u8],
        builder: &mut ExpressionBuilder,
        operators: &[(&str, BinaryOp)],
        next: fn(&'a [u8], &mut ExpressionBuilder) -> ParseResult<'a>,
    ) -> ParseResult<'a> {
        let mut state = next(string, builder)?;
        'outer: loop {
            for &(token, op) in operators {
                if let Some(rest) = state.rest.strip_prefix(token.as_bytes()) {
                    let rhs = next(rest, builder)?;
                    if matches!(op, BinaryOp::Divide | BinaryOp::Modulo)
                        && matches!(
                            builder.sub_expressions[rhs.expr as usize],
                            SubExpression::NumberLiteral(0)
                        )
                    {
                        return Err(ParseError("division by zero", rest));
                    }
                    let expr = builder.add(
                        SubExpression::BinaryOp {
                            op,
                            lhs: state.expr,
                            rhs: rhs.expr,
                        },
                        rhs.rest,
                    )?;
                    state = ParsingState {
                        expr,
                        rest: rhs.rest,
                    };
                    continue 'outer;
                }
            }
            return Ok(state);
        }
    }

    fn parse_or_expr<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        parse_binary_level(string, builder, &[("||", BinaryOp::Or)], parse_and_expr)
    }

    fn parse_and_expr<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        parse_binary_level(string, builder, &[("&&", BinaryOp::And)], parse_eq_expr)
    }

    fn parse_eq_expr<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        parse_binary_level(
            string,
            builder,
            &[("==", BinaryOp::Equal), ("!=", BinaryOp::NotEqual)],
            parse_cmp_expr,
        )
    }

    fn parse_cmp_expr<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        parse_binary_level(
            string,
            builder,
            &[
                ("<=", BinaryOp::SmallerOrEqual),
                (">=", BinaryOp::GreaterOrEqual),
                ("<", BinaryOp::Smaller),
                (">", BinaryOp::Greater),
            ],
            parse_additive,
        )
    }

    fn parse_additive<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        parse_binary_level(
            string,
            builder,
            &[("+", BinaryOp::Add), ("-", BinaryOp::Subtract)],
            parse_multiplicative,
        )
    }

    fn parse_multiplicative<'a>(
        string: &'a [u8],
        builder: &mut ExpressionBuilder,
    ) -> ParseResult<'a> {
        parse_binary_level(
            string,
            builder,
            &[
                ("*", BinaryOp::Multiply),
                ("/", BinaryOp::Divide),
                ("%", BinaryOp::Modulo),
            ],
            parse_unary,
        )
    }

    /// `('!' | '-' | '+')* <term>`
    fn parse_unary<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        let mut ops = Vec::new();
        let mut prefixes = 0;
        let mut string = skip_whitespace(string);
        loop {
            let op = match string.first() {
                Some(b'!') => Some(UnaryOp::Not),
                Some(b'-') => Some(UnaryOp::Negate),
                Some(b'+') => None,
                _ => break,
            };
            prefixes += 1;
            if prefixes > MAX_DEPTH {
                return Err(ParseError("too many unary operators", string));
            }
            ops.extend(op);
            string = skip_whitespace(&string[1..]);
        }
        let mut state = parse_term(string, builder)?;
        for op in ops.into_iter().rev() {
            state.expr = builder.add(
                SubExpression::UnaryOp {
                    op,
                    operand: state.expr,
                },
                state.rest,
            )?;
        }
        Ok(state)
    }

    fn parse_term<'a>(string: &'a [u8], builder: &mut ExpressionBuilder) -> ParseResult<'a> {
        let string = skip_whitespace(string);
        let state = match string
            .first()
            .ok_or(ParseError("unexpected end of string", string))?
        {
            b'n' => ParsingState {
                expr: builder.add(SubExpression::NVariable, string)?,
                rest: &string[1..],
            },
            b'(' => {
                let s = parse_expression(&string[1..], builder)?;
                let rest = s
                    .rest
                    .strip_prefix(b")")
                    .ok_or(ParseError("expected ')'", s.rest))?;
                ParsingState { expr: s.expr, rest }
            }
            x if x.is_ascii_digit() => {
                let (n, rest) = parse_number(string)?;
                ParsingState {
                    expr: builder.add(SubExpression::NumberLiteral(n), string)?,
                    rest,
                }
            }
            _ => return Err(ParseError("unexpected token", string)),
        };
        Ok(ParsingState {
            rest: skip_whitespace(state.rest),
            ..state
        })
    }

    fn parse_number(string: &[u8]) -> Result<(i64, &[u8]), ParseError<'_>> {
        let end = string
            .iter()
            .position(|&c| !c.is_ascii_digit())
            .unwrap_or(string.len());
        let n = std::str::from_utf8(&string[..end])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or(ParseError("can't parse number", string))?;
        Ok((n, &string[end..]))
    }

    fn skip_whitespace(string: &[u8]) -> &[u8] {
        string.trim_ascii_start()
    }

}

#[cfg(test)]
mod tests {
    use super::{PluralFormsError, PluralRule};

    const POLISH: &str =
        "nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 && (n%100<10 || n%100>=20) ? 1 : 2);";

    #[test]
    fn english() {
        let rule = PluralRule::parse("nplurals=2; plural=(n != 1);");
        assert_eq!(rule.total_forms(), 2);
        assert_eq!(rule.select(1), Some(0));
        assert_eq!(rule.select(0), Some(1));
        assert_eq!(rule.select(2), Some(1));
        assert_eq!(rule.select(-1), Some(0));
    }

    #[test]
    fn polish() {
        let rule = PluralRule::parse(POLISH);
        assert_eq!(rule.total_forms(), 3);
        let got: Vec<_> = [1, 2, 4, 5, 12, 22, 25, 112]
            .iter()
            .map(|&n| rule.select(n).unwrap())
            .collect();
        assert_eq!(got, [0, 1, 1, 2, 2, 1, 2, 2]);
    }

    #[test]
    fn out_of_range_index() {
        let rule = PluralRule::parse("nplurals=2; plural=n;");
        assert_eq!(rule.select(1), Some(1));
        assert_eq!(rule.select(2), None);
    }

    #[test]
    fn malformed_headers() {
        assert_eq!(
            PluralRule::try_parse("nplurals=2;").unwrap_err(),
            PluralFormsError::MissingPlural
        );
        assert_eq!(
            PluralRule::try_parse("plural=n != 1;").unwrap_err(),
            PluralFormsError::MissingNPlurals
        );
        assert!(matches!(
            PluralRule::try_parse("nplurals=x; plural=0;"),
            Err(PluralFormsError::InvalidNPlurals(_))
        ));
        assert!(matches!(
            PluralRule::try_parse("nplurals=2; plural=n %% 2;"),
            Err(PluralFormsError::InvalidExpression { .. })
        ));
        for header in ["", "nplurals=2;", "nplurals=2; plural=n/0;", "garbage"] {
            let rule = PluralRule::parse(header);
            assert_eq!(rule.total_forms(), 0, "{header}");
            assert_eq!(rule.select(1), None);
        }
    }

    #[test]
    fn oversized_headers_fall_back() {
        let unary = format!("nplurals=2; plural={}n;", "!".repeat(1_000_000));
        let negated = format!("nplurals=2; plural={}n;", "-".repeat(500_000));
        let flat = format!("nplurals=2; plural={};", vec!["n"; 30_000].join("+"));
        for header in [unary, negated, flat] {
            let rule = PluralRule::parse(&header);
            assert_eq!(rule.total_forms(), 0);
            assert_eq!(rule.select(1), None);
        }
    }

    #[test]
    fn recompiling_is_idempotent() {
        let a = PluralRule::parse(POLISH);
        let b = PluralRule::parse(POLISH);
        for n in -5..=20 {
            assert_eq!(a.select(n), b.select(n));
        }
    }

    #[test]
    fn default_index() {
        assert_eq!(PluralRule::default_index(1), 0);
        for n in [-1, 0, 2, 100] {
            assert_eq!(PluralRule::default_index(n), 1);
        }
    }
}
