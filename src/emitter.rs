use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::calculator::{self, Term};
use crate::certificate::{Assertion, Certificate, Declaration, FieldRef, VerificationRoutine};
use crate::diagnostics::Validator;
use crate::error::{Error, Result};
use crate::evaluator::EvaluationError;
use crate::expression::WitnessExpr;
use crate::kernel::induction::Theorem;
use crate::kernel::stream::{StreamArena, StreamId};
use crate::kernel::witness::Sign;
use crate::kernel::{Field, Natural};
use crate::product_table::{flat_chain, ordering_chain, sum_chain, ProductTable};

/// A named proof kind with its parameters.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProofKind {
    /// `k * multiplier` for every `k` up to the depth, built both as a composed and a flat
    /// product, with the two compared.
    MultiplicationTable { multiplier: u64, depth: u64 },

    /// Fibonacci states up to the depth, plus `F(k) < F(k+1)` for `k >= 2`.
    Fibonacci { depth: u64 },

    /// The convergents of `[1; 1, 1, ...]` against Fibonacci ratios.
    GoldenRatio { depth: u64 },

    /// The convergents of `1 + 1/(2 + 9/(2 + 25/(2 + ...)))` against the Leibniz partial sums.
    PiLeibniz { depth: u64 },

    /// The convergents of `[1; 2, 2, ...]` against powers of `[[2, 1], [1, 0]]`.
    Sqrt2Matrix { depth: u64 },

    /// `left_operand * b = b * left_operand` for every `b` up to the depth.
    Commutativity { left_operand: u64, depth: u64 },

    /// `(left + middle) + c = left + (middle + c)` for every `c` up to the depth.
    Associativity { left: u64, middle: u64, depth: u64 },

    /// `left + right = right + left`.
    Addition { left: u64, right: u64 },
}

impl ProofKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProofKind::MultiplicationTable { .. } => "multiplication_table",
            ProofKind::Fibonacci { .. } => "fibonacci",
            ProofKind::GoldenRatio { .. } => "golden_ratio",
            ProofKind::PiLeibniz { .. } => "pi_leibniz",
            ProofKind::Sqrt2Matrix { .. } => "sqrt2_matrix",
            ProofKind::Commutativity { .. } => "commutativity",
            ProofKind::Associativity { .. } => "associativity",
            ProofKind::Addition { .. } => "addition",
        }
    }

    pub fn depth(&self) -> Option<u64> {
        match self {
            ProofKind::MultiplicationTable { depth, .. }
            | ProofKind::Fibonacci { depth }
            | ProofKind::GoldenRatio { depth }
            | ProofKind::PiLeibniz { depth }
            | ProofKind::Sqrt2Matrix { depth }
            | ProofKind::Commutativity { depth, .. }
            | ProofKind::Associativity { depth, .. } => Some(*depth),
            ProofKind::Addition { .. } => None,
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match self {
            ProofKind::MultiplicationTable { multiplier, depth } => {
                write!(f, "(multiplier: {}, depth: {})", multiplier, depth)
            }
            ProofKind::Fibonacci { depth }
            | ProofKind::GoldenRatio { depth }
            | ProofKind::PiLeibniz { depth }
            | ProofKind::Sqrt2Matrix { depth } => write!(f, "(depth: {})", depth),
            ProofKind::Commutativity {
                left_operand,
                depth,
            } => write!(f, "(left_operand: {}, depth: {})", left_operand, depth),
            ProofKind::Associativity {
                left,
                middle,
                depth,
            } => write!(f, "(left: {}, middle: {}, depth: {})", left, middle, depth),
            ProofKind::Addition { left, right } => {
                write!(f, "(left: {}, right: {})", left, right)
            }
        }
    }
}

/// A proof kind attached to the container its declarations go in.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub container: String,

    #[serde(flatten)]
    pub proof: ProofKind,
}

impl Request {
    pub fn new(container: impl Into<String>, proof: ProofKind) -> Request {
        Request {
            container: container.into(),
            proof,
        }
    }
}

fn nat(value: u64) -> Natural {
    Natural::new(value)
}

fn reference(name: &str) -> WitnessExpr {
    WitnessExpr::Ref(name.to_string())
}

/// The mutable state of one expansion: the dedup table and everything emitted so far.
/// It lives only as long as one call to `emit`.
struct Expansion<'a> {
    request: &'a Request,
    max_chain_length: u64,
    table: ProductTable,
    declarations: Vec<Declaration>,
    assertions: Vec<Assertion>,
}

impl<'a> Expansion<'a> {
    fn new(request: &'a Request, max_chain_length: u64) -> Expansion<'a> {
        Expansion {
            request,
            max_chain_length,
            table: ProductTable::new(),
            declarations: vec![],
            assertions: vec![],
        }
    }

    fn declare(&mut self, name: String, expr: WitnessExpr) {
        trace!(name = %name, "declaring");
        self.declarations.push(Declaration::new(name, expr));
    }

    /// Fails if some chain would have to count up to `value`.
    /// Called before the chain is built, so an oversized request never allocates it.
    fn check(&self, value: u64) -> Result<()> {
        let parameter = self.request.proof.depth().map_or("right", |_| "depth");
        let mut validator = Validator::new(&self.request.container, self.max_chain_length);
        validator.chain(value, parameter);
        Ok(validator.finish()?)
    }

    /// Passes a calculator result through. A trace that overflows would need a chain longer
    /// than any limit, so overflow reports as the chain length diagnostic.
    fn computed<T>(&self, result: std::result::Result<T, EvaluationError>) -> Result<T> {
        if let Err(EvaluationError::Overflow(_)) = &result {
            self.check(u64::MAX)?;
        }
        Ok(result?)
    }

    /// A reference to `factor * multiplier` in the shared chain for `factor`.
    /// The chains themselves are checked against the limit in `finish`.
    fn product(&mut self, factor: u64, multiplier: u64) -> WitnessExpr {
        self.table.need(nat(factor), nat(multiplier))
    }

    fn sum(&self, left: u64, right: u64) -> Result<WitnessExpr> {
        self.check(left.saturating_add(right))?;
        Ok(sum_chain(nat(left), nat(right)))
    }

    fn assert_eq(&mut self, left: (&str, Field), right: (&str, Field)) {
        self.assertions.push(Assertion::new(
            FieldRef::new(left.0, left.1),
            FieldRef::new(right.0, right.1),
        ));
    }

    /// Declares `{prefix}0..={prefix}{terms.len()}`, the convergents of `b0` and `terms`.
    fn convergents(&mut self, prefix: &str, b0: u64, terms: &[Term]) -> Result<Vec<(u64, u64)>> {
        let trace = self.computed(calculator::convergents(b0, terms))?;
        self.declare(format!("{}0", prefix), WitnessExpr::ConvergentBase(nat(b0)));
        for (i, term) in terms.iter().enumerate() {
            let (p, q) = trace[i];
            let (prev_p, prev_q) = if i == 0 { (1, 0) } else { trace[i - 1] };
            let p_b = p.saturating_mul(term.b);
            let prev_p_a = prev_p.saturating_mul(term.a);
            let q_b = q.saturating_mul(term.b);
            let prev_q_a = prev_q.saturating_mul(term.a);
            let expr = WitnessExpr::ConvergentStep {
                prev: Box::new(reference(&format!("{}{}", prefix, i))),
                p_times_b: Box::new(self.product(p, term.b)),
                prev_p_times_a: Box::new(self.product(prev_p, term.a)),
                q_times_b: Box::new(self.product(q, term.b)),
                prev_q_times_a: Box::new(self.product(prev_q, term.a)),
                numerator: Box::new(self.sum(p_b, prev_p_a)?),
                denominator: Box::new(self.sum(q_b, prev_q_a)?),
            };
            self.declare(format!("{}{}", prefix, i + 1), expr);
        }
        Ok(trace)
    }

    /// Declares `{prefix}0..={prefix}{depth}`, the Fibonacci states.
    fn fibonacci(&mut self, prefix: &str, depth: u64) -> Result<Vec<u64>> {
        let fibs = self.computed(calculator::fibonacci_sequence(depth as usize + 2))?;
        self.declare(format!("{}0", prefix), WitnessExpr::FibonacciBase);
        for k in 1..=depth as usize {
            let expr = WitnessExpr::FibonacciStep {
                state: Box::new(reference(&format!("{}{}", prefix, k - 1))),
                sum: Box::new(self.sum(fibs[k - 1], fibs[k])?),
            };
            self.declare(format!("{}{}", prefix, k), expr);
        }
        Ok(fibs)
    }

    fn finish(self) -> Result<Certificate> {
        self.check(self.table.largest_total())?;
        let request = self.request;
        let mut declarations = self.table.declarations();
        declarations.extend(self.declarations);
        let verification = if self.assertions.is_empty() {
            None
        } else {
            Some(VerificationRoutine {
                name: format!("verify_{}", request.proof.name()),
                assertions: self.assertions,
            })
        };
        Ok(Certificate {
            container: request.container.clone(),
            proof: request.proof.clone(),
            declarations,
            verification,
        })
    }
}

/// Checks a request against the input rules. Returns nothing if it may be expanded.
pub fn validate(request: &Request, max_chain_length: u64) -> Result<()> {
    let mut validator = Validator::new(&request.container, max_chain_length);
    if let Some(depth) = request.proof.depth() {
        validator.depth(depth);
    }
    match &request.proof {
        ProofKind::MultiplicationTable { multiplier, .. } => validator.multiplier(*multiplier),
        ProofKind::Commutativity { left_operand, .. } => validator.left_operand(*left_operand),
        _ => {}
    }
    Ok(validator.finish()?)
}

/// Expands a request into a certificate.
///
/// The request is validated first, then the calculator computes the trace, and every chain
/// length is checked before the chain is built. Any failure leaves nothing behind: the caller
/// gets the error and no partial certificate.
pub fn emit(request: &Request, max_chain_length: u64) -> Result<Certificate> {
    validate(request, max_chain_length)?;

    let mut expansion = Expansion::new(request, max_chain_length);
    match request.proof {
        ProofKind::MultiplicationTable { multiplier, depth } => {
            multiplication_table(&mut expansion, multiplier, depth)?
        }
        ProofKind::Fibonacci { depth } => fibonacci(&mut expansion, depth)?,
        ProofKind::GoldenRatio { depth } => golden_ratio(&mut expansion, depth)?,
        ProofKind::PiLeibniz { depth } => pi_leibniz(&mut expansion, depth)?,
        ProofKind::Sqrt2Matrix { depth } => sqrt2_matrix(&mut expansion, depth)?,
        ProofKind::Commutativity {
            left_operand,
            depth,
        } => commutativity(&mut expansion, left_operand, depth)?,
        ProofKind::Associativity {
            left,
            middle,
            depth,
        } => associativity(&mut expansion, left, middle, depth)?,
        ProofKind::Addition { left, right } => addition(&mut expansion, left, right)?,
    }

    let cert = expansion.finish()?;
    debug!(
        container = %cert.container,
        proof = %cert.proof,
        declarations = cert.declarations.len(),
        assertions = cert.assertion_count(),
        "emitted certificate"
    );
    Ok(cert)
}

fn multiplication_table(expansion: &mut Expansion, multiplier: u64, depth: u64) -> Result<()> {
    expansion.check(multiplier.saturating_mul(depth))?;
    for k in 1..=depth {
        let composed = format!("_Prod{}", k);
        let flat = format!("_Flat{}", k);
        let point = expansion.product(multiplier, k);
        expansion.declare(composed.clone(), point);

        // Each flat product continues the previous one with one more copy.
        let expr = if k == 1 {
            flat_chain(nat(multiplier), Natural::ONE)
        } else {
            let mut expr = reference(&format!("_Flat{}", k - 1));
            for _ in 0..multiplier {
                expr = WitnessExpr::tick(expr);
            }
            WitnessExpr::group(expr)
        };
        expansion.declare(flat.clone(), expr);
        expansion.assert_eq((&composed, Field::Total), (&flat, Field::Total));
        expansion.assert_eq((&composed, Field::Right), (&flat, Field::Right));
    }
    Ok(())
}

fn fibonacci(expansion: &mut Expansion, depth: u64) -> Result<()> {
    let fibs = expansion.computed(calculator::fibonacci_sequence(depth as usize + 2))?;
    expansion.check(fibs[depth as usize + 1])?;
    expansion.fibonacci("FIB", depth)?;
    for k in 2..=depth as usize {
        let name = format!("_Lt{}", k);
        if let Some(expr) = ordering_chain(nat(fibs[k]), nat(fibs[k + 1])) {
            expansion.declare(name.clone(), expr);
            let state = format!("FIB{}", k);
            expansion.assert_eq((&name, Field::Left), (&state, Field::Current));
            expansion.assert_eq((&name, Field::Right), (&state, Field::Next));
        }
    }
    Ok(())
}

/// Fails unless the two streams agree at every position.
fn same_stream(arena: &StreamArena, a: StreamId, b: StreamId, what: &str) -> Result<()> {
    if arena.bisimilar(a, b) {
        return Ok(());
    }
    Err(Error::Evaluation(EvaluationError::TypeMismatch(format!(
        "the {} stream is not periodic as expected",
        what
    ))))
}

/// Continued-fraction terms read off two coefficient streams.
fn stream_terms(arena: &StreamArena, a: StreamId, b: StreamId, depth: u64) -> Vec<Term> {
    arena
        .unfold(a)
        .zip(arena.unfold(b))
        .take(depth as usize)
        .map(|(a, b)| Term {
            a: a.get(),
            b: b.get(),
        })
        .collect()
}

fn golden_ratio(expansion: &mut Expansion, depth: u64) -> Result<()> {
    // [1; 1, 1, ...] is the all-ones stream, its own tail.
    let mut arena = StreamArena::new();
    let ones = arena.constant(Natural::ONE);
    same_stream(&arena, ones, arena.tail(ones), "golden ratio coefficient")?;
    let b0 = arena.head(ones).get();
    let terms = stream_terms(&arena, ones, arena.tail(ones), depth);

    expansion.convergents("CF", b0, &terms)?;
    expansion.fibonacci("FIB", depth + 1)?;
    for i in 0..=depth {
        let cf = format!("CF{}", i);
        let fib = format!("FIB{}", i + 1);
        expansion.assert_eq((&cf, Field::P), (&fib, Field::Next));
        expansion.assert_eq((&cf, Field::Q), (&fib, Field::Current));
    }
    Ok(())
}

fn pi_leibniz(expansion: &mut Expansion, depth: u64) -> Result<()> {
    let terms = expansion.computed(calculator::pi_terms(depth as usize))?;
    expansion.convergents("CF", 1, &terms)?;

    let (sums, steps) = expansion.computed(calculator::leibniz_partial_sums(depth as usize + 1))?;
    expansion.declare("LS1".to_string(), WitnessExpr::PartialSumBase);
    for (i, step) in steps.iter().enumerate() {
        let (prev_p, prev_q) = sums[i];
        let numerator = if step.subtract {
            expansion.sum(step.p, prev_q)?
        } else {
            expansion.sum(step.p_times_d, prev_q)?
        };
        let expr = WitnessExpr::PartialSumStep {
            sign: if step.subtract { Sign::Sub } else { Sign::Add },
            prev: Box::new(reference(&format!("LS{}", i + 1))),
            p_times_d: Box::new(expansion.product(prev_p, step.denominator)),
            q_times_d: Box::new(expansion.product(prev_q, step.denominator)),
            numerator: Box::new(numerator),
        };
        expansion.declare(format!("LS{}", i + 2), expr);
    }

    for i in 0..=depth {
        let cf = format!("CF{}", i);
        let ls = format!("LS{}", i + 1);
        expansion.assert_eq((&cf, Field::P), (&ls, Field::Q));
        expansion.assert_eq((&cf, Field::Q), (&ls, Field::P));
    }
    Ok(())
}

fn sqrt2_matrix(expansion: &mut Expansion, depth: u64) -> Result<()> {
    // [1; 2, 2, ...] is a 1 followed by the periodic stream of 2s.
    let mut arena = StreamArena::new();
    let ones = arena.constant(Natural::ONE);
    let twos = arena.constant(nat(2));
    let coefficients = arena
        .eventually_periodic(&[Natural::ONE], &[nat(2)])
        .ok_or_else(|| {
            Error::Evaluation(EvaluationError::TypeMismatch(
                "the square root of 2 expansion has no periodic part".to_string(),
            ))
        })?;
    same_stream(&arena, arena.tail(coefficients), twos, "square root of 2 coefficient")?;
    let b0 = arena.head(coefficients).get();
    let terms = stream_terms(&arena, ones, arena.tail(coefficients), depth);

    expansion.convergents("CF", b0, &terms)?;

    // The matrix multipliers are the periodic part of the expansion.
    let multipliers: Vec<u64> = arena.take(twos, depth as usize).iter().map(|m| m.get()).collect();
    let powers = expansion.computed(calculator::matrix_powers(b0, &multipliers))?;
    expansion.declare("MAT0".to_string(), WitnessExpr::MatrixBase(nat(b0)));
    for (i, &m) in multipliers.iter().enumerate() {
        let [[a, b], [c, d]] = powers[i];
        let expr = WitnessExpr::MatrixStep {
            prev: Box::new(reference(&format!("MAT{}", i))),
            a_times_m: Box::new(expansion.product(a, m)),
            b_times_m: Box::new(expansion.product(b, m)),
            top_left: Box::new(expansion.sum(a.saturating_mul(m), c)?),
            top_right: Box::new(expansion.sum(b.saturating_mul(m), d)?),
        };
        expansion.declare(format!("MAT{}", i + 1), expr);
    }

    for i in 0..=depth {
        let mat = format!("MAT{}", i);
        let cf = format!("CF{}", i);
        expansion.assert_eq((&mat, Field::A), (&cf, Field::P));
        expansion.assert_eq((&mat, Field::B), (&cf, Field::Q));
    }
    Ok(())
}

fn commutativity(expansion: &mut Expansion, left_operand: u64, depth: u64) -> Result<()> {
    expansion.check(left_operand.saturating_mul(depth))?;
    for b in 1..=depth {
        let forward = format!("_Fwd{}", b);
        let reverse = format!("_Rev{}", b);

        // A * b, flat: one more group of A ticks on top of A * (b - 1).
        let mut fwd = if b == 1 {
            WitnessExpr::FlatBase(nat(left_operand))
        } else {
            reference(&format!("_Fwd{}", b - 1))
        };
        for _ in 0..left_operand {
            fwd = WitnessExpr::tick(fwd);
        }
        expansion.declare(forward.clone(), WitnessExpr::group(fwd));

        // b * A, by distributing one more unit over 0 * A.
        let previous = if b == 1 {
            WitnessExpr::theorem(Theorem::MulLeftZero, vec![WitnessExpr::Nat(nat(left_operand))])
        } else {
            reference(&format!("_Rev{}", b - 1))
        };
        expansion.declare(
            reverse.clone(),
            WitnessExpr::theorem(Theorem::SuccLeftMul, vec![previous]),
        );

        expansion.assert_eq((&forward, Field::Total), (&reverse, Field::Total));
        expansion.assert_eq((&forward, Field::Left), (&reverse, Field::Right));
        expansion.assert_eq((&forward, Field::Right), (&reverse, Field::Left));
    }

    // The whole pairing at A * D in one theorem, plus the 0 and 1 base cases at D.
    let last = format!("_Fwd{}", depth);
    let pairs = [("_Pair", left_operand), ("_PairZero", 0), ("_PairOne", 1)];
    for (name, left) in pairs {
        expansion.declare(
            name.to_string(),
            WitnessExpr::theorem(
                Theorem::Commute,
                vec![WitnessExpr::Nat(nat(left)), WitnessExpr::Nat(nat(depth))],
            ),
        );
    }
    expansion.assert_eq(("_Pair", Field::Total), (&last, Field::Total));
    expansion.assert_eq(("_Pair", Field::Left), (&last, Field::Left));
    expansion.assert_eq(("_PairZero", Field::Right), (&last, Field::Right));
    expansion.assert_eq(("_PairOne", Field::Total), (&last, Field::Right));
    Ok(())
}

fn associativity(expansion: &mut Expansion, left: u64, middle: u64, depth: u64) -> Result<()> {
    expansion.check(left.saturating_add(middle).saturating_add(depth))?;
    let seed = expansion.sum(left, middle)?;
    expansion.declare("_Seed".to_string(), seed);
    for c in 1..=depth {
        let assoc = format!("_Assoc{}", c);
        let direct = format!("_Direct{}", c);
        expansion.declare(
            assoc.clone(),
            WitnessExpr::theorem(
                Theorem::AddAssociative,
                vec![reference("_Seed"), WitnessExpr::Nat(nat(c))],
            ),
        );
        let expr = if c == 1 {
            expansion.sum(left, middle + 1)?
        } else {
            WitnessExpr::sum_step(reference(&format!("_Direct{}", c - 1)))
        };
        expansion.declare(direct.clone(), expr);
        expansion.assert_eq((&assoc, Field::Left), (&direct, Field::Total));
        expansion.assert_eq((&assoc, Field::Right), (&direct, Field::Total));
    }
    Ok(())
}

fn addition(expansion: &mut Expansion, left: u64, right: u64) -> Result<()> {
    let sum = expansion.sum(left, right)?;
    expansion.declare("_Sum".to_string(), sum);
    expansion.declare(
        "_Swap".to_string(),
        WitnessExpr::theorem(Theorem::AddCommutative, vec![reference("_Sum")]),
    );
    let direct = expansion.sum(right, left)?;
    expansion.declare("_Direct".to_string(), direct);
    for field in [Field::Left, Field::Right, Field::Total] {
        expansion.assert_eq(("_Swap", field), ("_Direct", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const LIMIT: u64 = 4096;

    fn names(cert: &Certificate) -> Vec<&str> {
        cert.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_depth_zero_emits_nothing() {
        let request = Request::new("Golden", ProofKind::GoldenRatio { depth: 0 });
        match emit(&request, LIMIT) {
            Err(Error::Validation(e)) => {
                assert_eq!(e.diagnostics.len(), 1);
                assert_eq!(e.diagnostics[0].message(), "depth must be at least 1");
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplier_one_is_rejected() {
        let request = Request::new(
            "Table",
            ProofKind::MultiplicationTable {
                multiplier: 1,
                depth: 3,
            },
        );
        let err = emit(&request, LIMIT).unwrap_err();
        assert_eq!(err.to_string(), "Table.multiplier: multiplier must be at least 2");
    }

    #[test]
    fn test_chain_limit() {
        let request = Request::new(
            "Table",
            ProofKind::MultiplicationTable {
                multiplier: 100,
                depth: 10,
            },
        );
        let err = emit(&request, 500).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Table.depth: a witness chain would exceed the configured maximum length"
        );
    }

    #[test]
    fn test_multiplication_table_shares_one_chain() {
        let request = Request::new(
            "Table",
            ProofKind::MultiplicationTable {
                multiplier: 3,
                depth: 3,
            },
        );
        let cert = emit(&request, LIMIT).unwrap();
        assert_eq!(
            names(&cert),
            vec!["_Mul3", "_Prod1", "_Flat1", "_Prod2", "_Flat2", "_Prod3", "_Flat3"]
        );
        assert_eq!(cert.assertion_count(), 6);
    }

    #[test]
    fn test_declarations_only_refer_backwards() {
        let kinds = vec![
            ProofKind::PiLeibniz { depth: 3 },
            ProofKind::GoldenRatio { depth: 4 },
            ProofKind::Sqrt2Matrix { depth: 3 },
            ProofKind::Fibonacci { depth: 6 },
            ProofKind::Commutativity {
                left_operand: 4,
                depth: 3,
            },
        ];
        for kind in kinds {
            let cert = emit(&Request::new("C", kind), LIMIT).unwrap();
            let mut seen = std::collections::HashSet::new();
            for decl in &cert.declarations {
                for name in decl.expr.references() {
                    assert!(seen.contains(name), "{} refers to {} too early", decl.name, name);
                }
                seen.insert(decl.name.as_str());
            }
        }
    }

    #[test]
    fn test_commutativity_closes_with_theorem_pairs() {
        let request = Request::new(
            "Comm",
            ProofKind::Commutativity {
                left_operand: 2,
                depth: 2,
            },
        );
        let cert = emit(&request, LIMIT).unwrap();
        assert_eq!(
            names(&cert),
            vec!["_Fwd1", "_Rev1", "_Fwd2", "_Rev2", "_Pair", "_PairZero", "_PairOne"]
        );
        assert_eq!(cert.declarations[4].expr.to_string(), "Commute(2, 2)");
        assert_eq!(cert.assertion_count(), 10);
    }

    #[test]
    fn test_calculator_overflow_is_a_chain_diagnostic() {
        let request = Request::new("Fib", ProofKind::Fibonacci { depth: 93 });
        let err = emit(&request, LIMIT).unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");
        assert_eq!(
            err.to_string(),
            "Fib.depth: a witness chain would exceed the configured maximum length"
        );

        // Without a limit to exceed, the overflow itself is reported.
        let err = emit(&request, u64::MAX).unwrap_err();
        assert_eq!(err.error_type(), "EvaluationError");
    }

    #[test]
    fn test_fibonacci_orderings() {
        let cert = emit(&Request::new("Fib", ProofKind::Fibonacci { depth: 4 }), LIMIT).unwrap();
        assert_eq!(
            names(&cert),
            vec!["FIB0", "FIB1", "FIB2", "FIB3", "FIB4", "_Lt2", "_Lt3", "_Lt4"]
        );
    }
}
