// The inline evaluation form.
//
// An expression over machine integers is either converted to a value witness, or, if it is a
// comparison, checked and reported as an assertion. Precedence from loosest to tightest:
//
//   comparison      == != < > <= >=     (at most one per expression)
//   additive        + - .-              (left associative; .- truncates at zero)
//   multiplicative  * / %               (left associative)
//   unary           -x
//   power           **                  (right associative, binds tighter than unary minus)
//   primary         literals, function calls, parentheses

use std::fmt;

use tracing::trace;

use crate::calculator::{self, Budget};
use crate::expression::WitnessExpr;
use crate::kernel::{Integer, Natural};

/// Calls to the recursive functions allowed in one evaluation.
pub const DEFAULT_BUDGET: u64 = 1_000_000;

/// How deeply parentheses, signs and exponents may nest.
pub const MAX_NESTING: usize = 256;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EvaluationError {
    // The text does not parse. The offset is in bytes.
    Syntax { offset: usize, message: String },

    UnknownOperator { offset: usize, operator: String },

    UnknownFunction(String),

    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    Overflow(String),

    DivisionByZero,

    // A comparison or a negative number where a natural belongs, or a coefficient stream
    // that is not the one a proof kind is built on.
    TypeMismatch(String),

    // A recursive function ran out of evaluation budget.
    Budget,
}

impl EvaluationError {
    fn syntax(offset: usize, message: impl Into<String>) -> EvaluationError {
        EvaluationError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            EvaluationError::Syntax { .. } => "Syntax",
            EvaluationError::UnknownOperator { .. } => "UnknownOperator",
            EvaluationError::UnknownFunction(_) => "UnknownFunction",
            EvaluationError::Arity { .. } => "Arity",
            EvaluationError::Overflow(_) => "Overflow",
            EvaluationError::DivisionByZero => "DivisionByZero",
            EvaluationError::TypeMismatch(_) => "TypeMismatch",
            EvaluationError::Budget => "Budget",
        }
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvaluationError::Syntax { offset, message } => {
                write!(f, "syntax error at offset {}: {}", offset, message)
            }
            EvaluationError::UnknownOperator { offset, operator } => {
                write!(f, "unknown operator '{}' at offset {}", operator, offset)
            }
            EvaluationError::UnknownFunction(name) => write!(f, "unknown function '{}'", name),
            EvaluationError::Arity {
                function,
                expected,
                actual,
            } => write!(
                f,
                "{} takes {} arguments but was given {}",
                function, expected, actual
            ),
            EvaluationError::Overflow(op) => write!(f, "arithmetic overflow in '{}'", op),
            EvaluationError::DivisionByZero => write!(f, "division by zero"),
            EvaluationError::TypeMismatch(s) => write!(f, "type mismatch: {}", s),
            EvaluationError::Budget => write!(f, "evaluation budget exceeded"),
        }
    }
}

impl std::error::Error for EvaluationError {}

/// A comparison that evaluated to false.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssertionFailure {
    pub description: String,
    pub computed: String,
    pub expected: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} is {}, not {}",
            self.description, self.computed, self.expected
        )
    }
}

impl std::error::Error for AssertionFailure {}

/// What an inline evaluation produces when it succeeds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InlineResult {
    /// The value, converted to a witness expression.
    Witness(WitnessExpr),

    /// An assertion that held.
    Unit,
}

impl fmt::Display for InlineResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InlineResult::Witness(expr) => write!(f, "{}", expr),
            InlineResult::Unit => write!(f, "()"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum TokenKind {
    Number(i64),
    Ident(String),
    Plus,
    Minus,
    DotMinus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Compare(Comparison),
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparison {
    fn holds(&self, left: i64, right: i64) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            Comparison::Lt => left < right,
            Comparison::Gt => left > right,
            Comparison::Le => left <= right,
            Comparison::Ge => left >= right,
        }
    }
}

fn lex(text: &str) -> Result<Vec<Token>, EvaluationError> {
    let bytes = text.as_bytes();
    let mut tokens = vec![];
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let value = text[start..i]
                .parse::<i64>()
                .map_err(|_| EvaluationError::Overflow(text[start..i].to_string()))?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                start,
                end: i,
            });
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(text[start..i].to_string()),
                start,
                end: i,
            });
            continue;
        }

        // Operators, longest match first.
        let rest = &text[i..];
        let (kind, len) = if rest.starts_with("**") {
            (TokenKind::StarStar, 2)
        } else if rest.starts_with(".-") {
            (TokenKind::DotMinus, 2)
        } else if rest.starts_with("==") {
            (TokenKind::Compare(Comparison::Eq), 2)
        } else if rest.starts_with("!=") {
            (TokenKind::Compare(Comparison::Ne), 2)
        } else if rest.starts_with("<=") {
            (TokenKind::Compare(Comparison::Le), 2)
        } else if rest.starts_with(">=") {
            (TokenKind::Compare(Comparison::Ge), 2)
        } else {
            let kind = match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '%' => TokenKind::Percent,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                ',' => TokenKind::Comma,
                '<' => TokenKind::Compare(Comparison::Lt),
                '>' => TokenKind::Compare(Comparison::Gt),
                _ => {
                    let operator: String = rest
                        .chars()
                        .take_while(|c| !c.is_ascii_alphanumeric() && !c.is_ascii_whitespace())
                        .collect();
                    return Err(EvaluationError::UnknownOperator {
                        offset: start,
                        operator,
                    });
                }
            };
            (kind, 1)
        };
        i += len;
        tokens.push(Token {
            kind,
            start,
            end: i,
        });
    }
    Ok(tokens)
}

/// The result of parsing and evaluating at the top level.
enum Outcome {
    Value(i64),
    Comparison {
        op: Comparison,
        left_text: String,
        left: i64,
        right: i64,
    },
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    i: usize,
    depth: usize,
    budget: Budget,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.i).map(|t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.i).map_or(self.text.len(), |t| t.start)
    }

    fn bump(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.i)?.kind.clone();
        self.i += 1;
        Some(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), EvaluationError> {
        let offset = self.offset();
        match self.bump() {
            Some(k) if k == kind => Ok(()),
            _ => Err(EvaluationError::syntax(offset, format!("expected {}", what))),
        }
    }

    fn parse_top(&mut self) -> Result<Outcome, EvaluationError> {
        let start = self.offset();
        let left = self.parse_add()?;
        let answer = match self.peek() {
            Some(TokenKind::Compare(op)) => {
                let op = *op;
                let end = self.tokens[self.i - 1].end;
                let left_text = self.text[start..end].trim().to_string();
                self.bump();
                let right = self.parse_add()?;
                Outcome::Comparison {
                    op,
                    left_text,
                    left,
                    right,
                }
            }
            _ => Outcome::Value(left),
        };
        match self.peek() {
            None => Ok(answer),
            Some(TokenKind::Compare(_)) => Err(EvaluationError::syntax(
                self.offset(),
                "comparisons cannot be chained",
            )),
            Some(_) => Err(EvaluationError::syntax(self.offset(), "unexpected token")),
        }
    }

    fn parse_add(&mut self) -> Result<i64, EvaluationError> {
        let mut value = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => "+",
                Some(TokenKind::Minus) => "-",
                Some(TokenKind::DotMinus) => ".-",
                _ => break,
            };
            self.bump();
            let right = self.parse_mul()?;
            let result = match op {
                "+" => value.checked_add(right),
                "-" => value.checked_sub(right),
                _ => value.checked_sub(right).map(|d| d.max(0)),
            };
            value = result.ok_or_else(|| EvaluationError::Overflow(op.to_string()))?;
        }
        Ok(value)
    }

    fn parse_mul(&mut self) -> Result<i64, EvaluationError> {
        let mut value = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => "*",
                Some(TokenKind::Slash) => "/",
                Some(TokenKind::Percent) => "%",
                _ => break,
            };
            self.bump();
            let right = self.parse_unary()?;
            if op != "*" && right == 0 {
                return Err(EvaluationError::DivisionByZero);
            }
            let result = match op {
                "*" => value.checked_mul(right),
                "/" => value.checked_div(right),
                _ => value.checked_rem(right),
            };
            value = result.ok_or_else(|| EvaluationError::Overflow(op.to_string()))?;
        }
        Ok(value)
    }

    // Every nested subexpression passes through here.
    fn parse_unary(&mut self) -> Result<i64, EvaluationError> {
        if self.depth >= MAX_NESTING {
            return Err(EvaluationError::syntax(
                self.offset(),
                format!("expressions may nest at most {} deep", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let value = self.parse_signed();
        self.depth -= 1;
        value
    }

    fn parse_signed(&mut self) -> Result<i64, EvaluationError> {
        if self.peek() == Some(&TokenKind::Minus) {
            self.bump();
            return self
                .parse_unary()?
                .checked_neg()
                .ok_or_else(|| EvaluationError::Overflow("-".to_string()));
        }
        self.parse_pow()
    }

    fn parse_pow(&mut self) -> Result<i64, EvaluationError> {
        let base = self.parse_primary()?;
        if self.peek() != Some(&TokenKind::StarStar) {
            return Ok(base);
        }
        self.bump();
        let exponent = self.parse_unary()?;
        let exponent = u32::try_from(exponent).map_err(|_| {
            EvaluationError::TypeMismatch("the exponent must be non-negative".to_string())
        })?;
        base.checked_pow(exponent)
            .ok_or_else(|| EvaluationError::Overflow("**".to_string()))
    }

    fn parse_primary(&mut self) -> Result<i64, EvaluationError> {
        let offset = self.offset();
        match self.bump() {
            Some(TokenKind::Number(n)) => Ok(n),
            Some(TokenKind::LParen) => {
                let value = self.parse_add()?;
                if let Some(TokenKind::Compare(_)) = self.peek() {
                    return Err(EvaluationError::TypeMismatch(
                        "comparisons are only allowed at the top level".to_string(),
                    ));
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(value)
            }
            Some(TokenKind::Ident(name)) => {
                self.expect(TokenKind::LParen, "'(' after a function name")?;
                let mut args = vec![];
                if self.peek() != Some(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_add()?);
                        if self.peek() == Some(&TokenKind::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                self.call(&name, &args)
            }
            Some(_) => Err(EvaluationError::syntax(offset, "expected a value")),
            None => Err(EvaluationError::syntax(offset, "unexpected end of input")),
        }
    }

    fn call(&mut self, name: &str, args: &[i64]) -> Result<i64, EvaluationError> {
        let expected = match name {
            "negate" | "factorial" | "fibonacci" => 1,
            "gcd" | "ackermann" => 2,
            "hyperop" => 3,
            _ => return Err(EvaluationError::UnknownFunction(name.to_string())),
        };
        if args.len() != expected {
            return Err(EvaluationError::Arity {
                function: name.to_string(),
                expected,
                actual: args.len(),
            });
        }
        let naturals = args
            .iter()
            .map(|&a| {
                u64::try_from(a).map_err(|_| {
                    EvaluationError::TypeMismatch(format!("{} takes non-negative arguments", name))
                })
            })
            .collect::<Result<Vec<u64>, EvaluationError>>();
        let result = match name {
            "negate" => {
                return args[0]
                    .checked_neg()
                    .ok_or_else(|| EvaluationError::Overflow(name.to_string()))
            }
            "factorial" => calculator::factorial(naturals?[0])?,
            "fibonacci" => calculator::fibonacci(naturals?[0])?,
            "gcd" => calculator::gcd(args[0].unsigned_abs(), args[1].unsigned_abs()),
            "ackermann" => {
                let n = naturals?;
                calculator::ackermann(n[0], n[1], &mut self.budget)?
            }
            _ => {
                let n = naturals?;
                calculator::hyperop(n[0], n[1], n[2], &mut self.budget)?
            }
        };
        i64::try_from(result).map_err(|_| EvaluationError::Overflow(name.to_string()))
    }
}

/// Evaluates an expression to a number. Comparisons are not allowed here.
pub fn evaluate(text: &str) -> Result<i64, EvaluationError> {
    match parse(text, DEFAULT_BUDGET)? {
        Outcome::Value(v) => Ok(v),
        Outcome::Comparison { .. } => Err(EvaluationError::TypeMismatch(
            "expected a number, not a comparison".to_string(),
        )),
    }
}

fn parse(text: &str, budget: u64) -> Result<Outcome, EvaluationError> {
    let tokens = lex(text)?;
    let mut parser = Parser {
        text,
        tokens,
        i: 0,
        depth: 0,
        budget: Budget::new(budget),
    };
    parser.parse_top()
}

/// Either an evaluation problem or an assertion that did not hold.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InlineError {
    Evaluation(EvaluationError),
    Assertion(AssertionFailure),
}

impl fmt::Display for InlineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InlineError::Evaluation(e) => write!(f, "{}", e),
            InlineError::Assertion(a) => write!(f, "{}", a),
        }
    }
}

impl From<EvaluationError> for InlineError {
    fn from(e: EvaluationError) -> InlineError {
        InlineError::Evaluation(e)
    }
}

/// The inline evaluation form.
///
/// A number converts to its value witness: a natural if non-negative, otherwise an integer.
/// A comparison that holds yields unit. One that fails reports
/// `"<left> is <computed>, not <expected>"` for equality, and
/// `"<comparison> is false, not true"` for the others.
pub fn evaluate_inline(text: &str) -> Result<InlineResult, InlineError> {
    let outcome = parse(text, DEFAULT_BUDGET)?;
    match outcome {
        Outcome::Value(v) => {
            trace!(text, value = v, "evaluated");
            let expr = if v >= 0 {
                WitnessExpr::Nat(Natural::new(v as u64))
            } else {
                WitnessExpr::Int(Integer::from_i64(v))
            };
            Ok(InlineResult::Witness(expr))
        }
        Outcome::Comparison {
            op,
            left_text,
            left,
            right,
        } => {
            if op.holds(left, right) {
                return Ok(InlineResult::Unit);
            }
            let failure = if op == Comparison::Eq {
                AssertionFailure {
                    description: left_text,
                    computed: left.to_string(),
                    expected: right.to_string(),
                }
            } else {
                AssertionFailure {
                    description: text.trim().to_string(),
                    computed: "false".to_string(),
                    expected: "true".to_string(),
                }
            };
            Err(InlineError::Assertion(failure))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7);
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), 9);
        assert_eq!(evaluate("2 ** 3 ** 2").unwrap(), 512);
        assert_eq!(evaluate("-2 ** 2").unwrap(), -4);
        assert_eq!(evaluate("10 - 3 - 2").unwrap(), 5);
        assert_eq!(evaluate("3 .- 5").unwrap(), 0);
        assert_eq!(evaluate("5 .- 3").unwrap(), 2);
        assert_eq!(evaluate("17 / 5 + 17 % 5").unwrap(), 5);
    }

    #[test]
    fn test_functions() {
        assert_eq!(evaluate("factorial(5)").unwrap(), 120);
        assert_eq!(evaluate("fibonacci(10)").unwrap(), 55);
        assert_eq!(evaluate("gcd(12, 18)").unwrap(), 6);
        assert_eq!(evaluate("negate(4)").unwrap(), -4);
        assert_eq!(evaluate("hyperop(3, 2, 5)").unwrap(), 32);
        assert_eq!(evaluate("ackermann(2, 2)").unwrap(), 7);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            evaluate("foo(1)"),
            Err(EvaluationError::UnknownFunction("foo".to_string()))
        );
        assert_eq!(
            evaluate("gcd(1)"),
            Err(EvaluationError::Arity {
                function: "gcd".to_string(),
                expected: 2,
                actual: 1
            })
        );
        assert!(matches!(
            evaluate("1 $ 2"),
            Err(EvaluationError::UnknownOperator { offset: 2, .. })
        ));
        assert!(matches!(evaluate("1 +"), Err(EvaluationError::Syntax { .. })));
        assert_eq!(evaluate("1 / 0"), Err(EvaluationError::DivisionByZero));
        assert!(matches!(
            evaluate("2 ** 64"),
            Err(EvaluationError::Overflow(_))
        ));
        assert_eq!(evaluate("ackermann(4, 2)"), Err(EvaluationError::Budget));
        assert!(matches!(
            evaluate("1 < 2 < 3"),
            Err(EvaluationError::Syntax { .. })
        ));
    }

    #[test]
    fn test_nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(evaluate(&deep), Err(EvaluationError::Syntax { .. })));
        let signs = format!("{}1", "-".repeat(200_000));
        assert!(matches!(evaluate(&signs), Err(EvaluationError::Syntax { .. })));
        let powers = vec!["1"; 100_000].join(" ** ");
        assert!(matches!(evaluate(&powers), Err(EvaluationError::Syntax { .. })));

        let fine = format!("{}7{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&fine).unwrap(), 7);
    }

    #[test]
    fn test_high_hyperop_levels() {
        assert_eq!(evaluate("hyperop(200000, 2, 1)").unwrap(), 2);
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(
            evaluate_inline("2 * 3").unwrap(),
            InlineResult::Witness(WitnessExpr::Nat(Natural::new(6)))
        );
        assert_eq!(
            evaluate_inline("2 - 5").unwrap(),
            InlineResult::Witness(WitnessExpr::Int(Integer::from_i64(-3)))
        );
    }

    #[test]
    fn test_assertions() {
        assert_eq!(evaluate_inline("2 * 3 == 6").unwrap(), InlineResult::Unit);
        assert_eq!(evaluate_inline("1 < 2").unwrap(), InlineResult::Unit);

        let err = evaluate_inline("2 * 3 == 7").unwrap_err();
        assert_eq!(err.to_string(), "2 * 3 is 6, not 7");

        let err = evaluate_inline("5 <= 4").unwrap_err();
        assert_eq!(err.to_string(), "5 <= 4 is false, not true");
    }
}
