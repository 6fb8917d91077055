use std::fmt;

use serde::{Deserialize, Serialize};

use super::natural::{Integer, Natural};

/// A constructor was applied to sub-witnesses that do not satisfy its side conditions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConstraintError {
    /// The constructor that rejected its arguments, like "ProductStep".
    pub constructor: &'static str,

    pub message: String,
}

impl ConstraintError {
    fn new(constructor: &'static str, message: impl Into<String>) -> Self {
        ConstraintError {
            constructor,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.constructor, self.message)
    }
}

pub type Result<T> = std::result::Result<T, ConstraintError>;

/// Checks a side condition of the form `actual == expected` for a named constructor.
fn require(
    constructor: &'static str,
    what: &str,
    actual: Natural,
    expected: Natural,
) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(ConstraintError::new(
            constructor,
            format!("{} is {}, not {}", what, actual, expected),
        ))
    }
}

/// The successor of `n`, for a constructor that has to count one past it.
fn succ(constructor: &'static str, n: Natural) -> Result<Natural> {
    n.checked_succ()
        .ok_or_else(|| ConstraintError::new(constructor, format!("{} has no successor", n)))
}

fn require_complete(constructor: &'static str, what: &str, p: &ProductWitness) -> Result<()> {
    if p.is_complete() {
        Ok(())
    } else {
        Err(ConstraintError::new(
            constructor,
            format!("{} has {} pending units", what, p.pending),
        ))
    }
}

/// A witness that `left + right = total`.
/// The fields are private, so the only way to get one is through the constructors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SumWitness {
    left: Natural,
    right: Natural,
    total: Natural,
}

impl SumWitness {
    /// `n + 0 = n`
    pub fn base(n: Natural) -> SumWitness {
        SumWitness {
            left: n,
            right: Natural::ZERO,
            total: n,
        }
    }

    /// From `l + r = t`, conclude `l + S(r) = S(t)`.
    pub fn step(&self) -> Result<SumWitness> {
        Ok(SumWitness {
            left: self.left,
            right: succ("SumStep", self.right)?,
            total: succ("SumStep", self.total)?,
        })
    }

    /// The base witness for `left`, stepped `right` times.
    pub fn chain(left: Natural, right: Natural) -> Result<SumWitness> {
        let mut witness = SumWitness::base(left);
        for _ in 0..right.get() {
            witness = witness.step()?;
        }
        Ok(witness)
    }

    /// Case analysis. Returns the predecessor witness if this one was built by `step`.
    pub fn invert(&self) -> Option<SumWitness> {
        let right = self.right.pred()?;
        let total = self.total.pred()?;
        Some(SumWitness {
            left: self.left,
            right,
            total,
        })
    }

    pub fn left(&self) -> Natural {
        self.left
    }

    pub fn right(&self) -> Natural {
        self.right
    }

    pub fn total(&self) -> Natural {
        self.total
    }
}

/// The two ways a product witness can be built.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ProductEncoding {
    /// Base plus steps that each carry a sum witness for the running total.
    Composed,

    /// Base plus unit ticks and group markers, with no sub-witnesses.
    /// This form nests inside other inductive proofs without multiplying their constraints.
    Flat,
}

/// A witness that `left * right = total`, where `right` counts copies of `left`.
///
/// A flat witness may be in the middle of a copy, in which case `pending` units have been
/// ticked since the last group. Everything that consumes a product requires it to be complete.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ProductWitness {
    left: Natural,
    right: Natural,
    total: Natural,
    pending: u64,
    encoding: ProductEncoding,
}

impl ProductWitness {
    /// `n * 0 = 0`
    pub fn base(n: Natural) -> ProductWitness {
        ProductWitness {
            left: n,
            right: Natural::ZERO,
            total: Natural::ZERO,
            pending: 0,
            encoding: ProductEncoding::Composed,
        }
    }

    /// From `l * r = t` and `t + l = t2`, conclude `l * S(r) = t2`.
    pub fn step(mul: &ProductWitness, add: &SumWitness) -> Result<ProductWitness> {
        require_complete("ProductStep", "the product", mul)?;
        require("ProductStep", "the sum's left", add.left, mul.total)?;
        require("ProductStep", "the sum's right", add.right, mul.left)?;
        Ok(ProductWitness {
            left: mul.left,
            right: succ("ProductStep", mul.right)?,
            total: add.total,
            pending: 0,
            encoding: ProductEncoding::Composed,
        })
    }

    /// The flat form of `n * 0 = 0`.
    pub fn flat_base(n: Natural) -> ProductWitness {
        ProductWitness {
            encoding: ProductEncoding::Flat,
            ..ProductWitness::base(n)
        }
    }

    /// Adds one unit within the current copy.
    pub fn tick(&self) -> Result<ProductWitness> {
        if self.encoding != ProductEncoding::Flat {
            return Err(ConstraintError::new("Tick", "only flat products can tick"));
        }
        if self.pending >= self.left.get() {
            return Err(ConstraintError::new(
                "Tick",
                format!("the current copy of {} is already full", self.left),
            ));
        }
        Ok(ProductWitness {
            total: succ("Tick", self.total)?,
            pending: self.pending + 1,
            ..*self
        })
    }

    /// Closes one full copy, which must have exactly `left` units.
    pub fn group(&self) -> Result<ProductWitness> {
        if self.encoding != ProductEncoding::Flat {
            return Err(ConstraintError::new("Group", "only flat products can group"));
        }
        require(
            "Group",
            "the number of pending units",
            Natural::new(self.pending),
            self.left,
        )?;
        Ok(ProductWitness {
            right: succ("Group", self.right)?,
            pending: 0,
            ..*self
        })
    }

    /// Composed chain for `left * right`, built one step at a time.
    pub fn chain(left: Natural, right: Natural) -> Result<ProductWitness> {
        let mut witness = ProductWitness::base(left);
        for _ in 0..right.get() {
            let add = SumWitness::chain(witness.total, left)?;
            witness = ProductWitness::step(&witness, &add)?;
        }
        Ok(witness)
    }

    /// Flat chain for `left * right`: `left` ticks followed by a group, `right` times.
    pub fn flat_chain(left: Natural, right: Natural) -> Result<ProductWitness> {
        let mut witness = ProductWitness::flat_base(left);
        for _ in 0..right.get() {
            for _ in 0..left.get() {
                witness = witness.tick()?;
            }
            witness = witness.group()?;
        }
        Ok(witness)
    }

    /// Case analysis on a complete product.
    /// Returns the product for one fewer copy, and the sum that adds the last copy.
    pub fn invert(&self) -> Option<(ProductWitness, SumWitness)> {
        if !self.is_complete() {
            return None;
        }
        let right = self.right.pred()?;
        // total = left * right holds by construction, so this cannot underflow.
        let previous = Natural::new(self.total.get() - self.left.get());
        let mul = ProductWitness {
            left: self.left,
            right,
            total: previous,
            pending: 0,
            encoding: self.encoding,
        };
        let add = SumWitness {
            left: previous,
            right: self.left,
            total: self.total,
        };
        Some((mul, add))
    }

    pub fn left(&self) -> Natural {
        self.left
    }

    pub fn right(&self) -> Natural {
        self.right
    }

    pub fn total(&self) -> Natural {
        self.total
    }

    pub fn encoding(&self) -> ProductEncoding {
        self.encoding
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

/// A witness that `left < right`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OrderingWitness {
    left: Natural,
    right: Natural,
}

impl OrderingWitness {
    /// `0 < S(n)`
    pub fn base(n: Natural) -> Result<OrderingWitness> {
        Ok(OrderingWitness {
            left: Natural::ZERO,
            right: succ("OrderingBase", n)?,
        })
    }

    /// From `l < r`, conclude `S(l) < S(r)`.
    pub fn step(&self) -> Result<OrderingWitness> {
        Ok(OrderingWitness {
            left: succ("OrderingStep", self.left)?,
            right: succ("OrderingStep", self.right)?,
        })
    }

    pub fn left(&self) -> Natural {
        self.left
    }

    pub fn right(&self) -> Natural {
        self.right
    }
}

/// Three consecutive Fibonacci numbers, with the sum that links them.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FibonacciState {
    prev: Natural,
    current: Natural,
    next: Natural,
    sum: SumWitness,
}

impl FibonacciState {
    /// `(F(-1), F(0), F(1)) = (1, 0, 1)`
    pub fn base() -> FibonacciState {
        FibonacciState {
            prev: Natural::ONE,
            current: Natural::ZERO,
            next: Natural::ONE,
            sum: SumWitness::base(Natural::ONE),
        }
    }

    /// Advances by one, given a witness for `current + next`.
    pub fn step(&self, sum: &SumWitness) -> Result<FibonacciState> {
        require("FibonacciStep", "the sum's left", sum.left, self.current)?;
        require("FibonacciStep", "the sum's right", sum.right, self.next)?;
        Ok(FibonacciState {
            prev: self.current,
            current: self.next,
            next: sum.total,
            sum: *sum,
        })
    }

    pub fn prev(&self) -> Natural {
        self.prev
    }

    pub fn current(&self) -> Natural {
        self.current
    }

    pub fn next(&self) -> Natural {
        self.next
    }

    /// The witness for `prev + current = next`.
    pub fn sum(&self) -> &SumWitness {
        &self.sum
    }
}

/// The sub-witnesses needed to advance a convergent by one term.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConvergentStep {
    pub p_times_b: ProductWitness,
    pub prev_p_times_a: ProductWitness,
    pub q_times_b: ProductWitness,
    pub prev_q_times_a: ProductWitness,
    pub numerator: SumWitness,
    pub denominator: SumWitness,
}

/// A continued-fraction convergent `p / q`, with the previous convergent's terms.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Convergent {
    p: Natural,
    q: Natural,
    prev_p: Natural,
    prev_q: Natural,
}

impl Convergent {
    /// The depth-zero convergent `b0 / 1`.
    pub fn base(b0: Natural) -> Convergent {
        Convergent {
            p: b0,
            q: Natural::ONE,
            prev_p: Natural::ONE,
            prev_q: Natural::ZERO,
        }
    }

    /// `h_n = b * h_{n-1} + a * h_{n-2}`, and the same for `k_n`.
    pub fn step(&self, parts: &ConvergentStep) -> Result<Convergent> {
        const NAME: &str = "ConvergentStep";
        for (what, product) in [
            ("p * b", &parts.p_times_b),
            ("prev_p * a", &parts.prev_p_times_a),
            ("q * b", &parts.q_times_b),
            ("prev_q * a", &parts.prev_q_times_a),
        ] {
            require_complete(NAME, what, product)?;
        }
        require(NAME, "the left of p * b", parts.p_times_b.left, self.p)?;
        require(NAME, "the left of prev_p * a", parts.prev_p_times_a.left, self.prev_p)?;
        require(NAME, "the left of q * b", parts.q_times_b.left, self.q)?;
        require(NAME, "the left of prev_q * a", parts.prev_q_times_a.left, self.prev_q)?;
        require(
            NAME,
            "the multiplier of q * b",
            parts.q_times_b.right,
            parts.p_times_b.right,
        )?;
        require(
            NAME,
            "the multiplier of prev_q * a",
            parts.prev_q_times_a.right,
            parts.prev_p_times_a.right,
        )?;
        require(NAME, "the numerator's left", parts.numerator.left, parts.p_times_b.total)?;
        require(
            NAME,
            "the numerator's right",
            parts.numerator.right,
            parts.prev_p_times_a.total,
        )?;
        require(NAME, "the denominator's left", parts.denominator.left, parts.q_times_b.total)?;
        require(
            NAME,
            "the denominator's right",
            parts.denominator.right,
            parts.prev_q_times_a.total,
        )?;
        Ok(Convergent {
            p: parts.numerator.total,
            q: parts.denominator.total,
            prev_p: self.p,
            prev_q: self.q,
        })
    }

    pub fn p(&self) -> Natural {
        self.p
    }

    pub fn q(&self) -> Natural {
        self.q
    }

    pub fn prev_p(&self) -> Natural {
        self.prev_p
    }

    pub fn prev_q(&self) -> Natural {
        self.prev_q
    }
}

/// Whether a partial-sum step adds or subtracts the next unit fraction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Sign {
    Add,
    Sub,
}

/// A partial sum `p / q` of an alternating series of unit fractions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RationalPartialSum {
    p: Natural,
    q: Natural,
}

impl RationalPartialSum {
    /// `1 / 1`
    pub fn base() -> RationalPartialSum {
        RationalPartialSum {
            p: Natural::ONE,
            q: Natural::ONE,
        }
    }

    /// `p/q ± 1/d = (p*d ± q) / (q*d)`.
    ///
    /// For `Add`, the sum witness is `p*d + q = p'`.
    /// For `Sub`, it is `p' + q = p*d`, since naturals have no subtraction.
    pub fn step(
        &self,
        sign: Sign,
        p_times_d: &ProductWitness,
        q_times_d: &ProductWitness,
        numerator: &SumWitness,
    ) -> Result<RationalPartialSum> {
        let name = match sign {
            Sign::Add => "PartialSumAdd",
            Sign::Sub => "PartialSumSub",
        };
        require_complete(name, "p * d", p_times_d)?;
        require_complete(name, "q * d", q_times_d)?;
        require(name, "the left of p * d", p_times_d.left, self.p)?;
        require(name, "the left of q * d", q_times_d.left, self.q)?;
        require(name, "the multiplier of q * d", q_times_d.right, p_times_d.right)?;
        require(name, "the numerator's right", numerator.right, self.q)?;
        let p = match sign {
            Sign::Add => {
                require(name, "the numerator's left", numerator.left, p_times_d.total)?;
                numerator.total
            }
            Sign::Sub => {
                require(name, "the numerator's total", numerator.total, p_times_d.total)?;
                numerator.left
            }
        };
        Ok(RationalPartialSum {
            p,
            q: q_times_d.total,
        })
    }

    pub fn p(&self) -> Natural {
        self.p
    }

    pub fn q(&self) -> Natural {
        self.q
    }
}

/// A 2x2 matrix `[[a, b], [c, d]]` of naturals.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Matrix2x2 {
    a: Natural,
    b: Natural,
    c: Natural,
    d: Natural,
}

impl Matrix2x2 {
    /// `[[b0, 1], [1, 0]]`
    pub fn base(b0: Natural) -> Matrix2x2 {
        Matrix2x2 {
            a: b0,
            b: Natural::ONE,
            c: Natural::ONE,
            d: Natural::ZERO,
        }
    }

    /// Left-multiplies by `[[m, 1], [1, 0]]`, where `m` is the shared multiplier.
    /// The bottom row becomes the old top row, so it needs no arithmetic.
    pub fn step(
        &self,
        a_times_m: &ProductWitness,
        b_times_m: &ProductWitness,
        top_left: &SumWitness,
        top_right: &SumWitness,
    ) -> Result<Matrix2x2> {
        const NAME: &str = "MatrixStep";
        require_complete(NAME, "a * m", a_times_m)?;
        require_complete(NAME, "b * m", b_times_m)?;
        require(NAME, "the left of a * m", a_times_m.left, self.a)?;
        require(NAME, "the left of b * m", b_times_m.left, self.b)?;
        require(NAME, "the multiplier of b * m", b_times_m.right, a_times_m.right)?;
        require(NAME, "the top-left sum's left", top_left.left, a_times_m.total)?;
        require(NAME, "the top-left sum's right", top_left.right, self.c)?;
        require(NAME, "the top-right sum's left", top_right.left, b_times_m.total)?;
        require(NAME, "the top-right sum's right", top_right.right, self.d)?;
        Ok(Matrix2x2 {
            a: top_left.total,
            b: top_right.total,
            c: self.a,
            d: self.b,
        })
    }

    pub fn a(&self) -> Natural {
        self.a
    }

    pub fn b(&self) -> Natural {
        self.b
    }

    pub fn c(&self) -> Natural {
        self.c
    }

    pub fn d(&self) -> Natural {
        self.d
    }
}

/// `(a + b) + c = a + (b + c)`, with every sum that appears on either side.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AssociativityWitness {
    pub(crate) ab: SumWitness,
    pub(crate) bc: SumWitness,
    pub(crate) left_grouped: SumWitness,
    pub(crate) right_grouped: SumWitness,
}

impl AssociativityWitness {
    /// `a + b`
    pub fn ab(&self) -> &SumWitness {
        &self.ab
    }

    /// `b + c`
    pub fn bc(&self) -> &SumWitness {
        &self.bc
    }

    /// `(a + b) + c`
    pub fn left_grouped(&self) -> &SumWitness {
        &self.left_grouped
    }

    /// `a + (b + c)`
    pub fn right_grouped(&self) -> &SumWitness {
        &self.right_grouped
    }
}

/// `a * b = b * a`, as a forward product and a reverse product with the operands swapped.
/// The induction layer only builds one after checking that the two sides agree.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CommutativityWitness {
    pub(crate) forward: ProductWitness,
    pub(crate) reverse: ProductWitness,
}

impl CommutativityWitness {
    /// `a * b`
    pub fn forward(&self) -> &ProductWitness {
        &self.forward
    }

    /// `b * a`
    pub fn reverse(&self) -> &ProductWitness {
        &self.reverse
    }
}

/// The named fields that assertions can compare.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Field {
    Value,
    Left,
    Right,
    Total,
    Prev,
    Current,
    Next,
    P,
    Q,
    PrevP,
    PrevQ,
    A,
    B,
    C,
    D,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Field::Value => "Value",
            Field::Left => "Left",
            Field::Right => "Right",
            Field::Total => "Total",
            Field::Prev => "Prev",
            Field::Current => "Current",
            Field::Next => "Next",
            Field::P => "P",
            Field::Q => "Q",
            Field::PrevP => "PrevP",
            Field::PrevQ => "PrevQ",
            Field::A => "A",
            Field::B => "B",
            Field::C => "C",
            Field::D => "D",
        };
        write!(f, "{}", name)
    }
}

/// Which kind of witness a value is.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum WitnessKind {
    Natural,
    Integer,
    Sum,
    Product,
    Ordering,
    Fibonacci,
    Convergent,
    PartialSum,
    Matrix,
    Associativity,
    Commutativity,
}

impl fmt::Display for WitnessKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Any fully elaborated witness.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Witness {
    Natural(Natural),
    Integer(Integer),
    Sum(SumWitness),
    Product(ProductWitness),
    Ordering(OrderingWitness),
    Fibonacci(FibonacciState),
    Convergent(Convergent),
    PartialSum(RationalPartialSum),
    Matrix(Matrix2x2),
    Associativity(AssociativityWitness),
    Commutativity(CommutativityWitness),
}

impl Witness {
    pub fn kind(&self) -> WitnessKind {
        match self {
            Witness::Natural(_) => WitnessKind::Natural,
            Witness::Integer(_) => WitnessKind::Integer,
            Witness::Sum(_) => WitnessKind::Sum,
            Witness::Product(_) => WitnessKind::Product,
            Witness::Ordering(_) => WitnessKind::Ordering,
            Witness::Fibonacci(_) => WitnessKind::Fibonacci,
            Witness::Convergent(_) => WitnessKind::Convergent,
            Witness::PartialSum(_) => WitnessKind::PartialSum,
            Witness::Matrix(_) => WitnessKind::Matrix,
            Witness::Associativity(_) => WitnessKind::Associativity,
            Witness::Commutativity(_) => WitnessKind::Commutativity,
        }
    }

    /// Reads a natural-valued field. Returns None if this kind has no such field.
    pub fn field(&self, field: Field) -> Option<Natural> {
        match (self, field) {
            (Witness::Natural(n), Field::Value) => Some(*n),
            (Witness::Sum(s), Field::Left) => Some(s.left),
            (Witness::Sum(s), Field::Right) => Some(s.right),
            (Witness::Sum(s), Field::Total) => Some(s.total),
            (Witness::Product(p), Field::Left) => Some(p.left),
            (Witness::Product(p), Field::Right) => Some(p.right),
            (Witness::Product(p), Field::Total) => Some(p.total),
            (Witness::Ordering(o), Field::Left) => Some(o.left),
            (Witness::Ordering(o), Field::Right) => Some(o.right),
            (Witness::Fibonacci(s), Field::Prev) => Some(s.prev),
            (Witness::Fibonacci(s), Field::Current) => Some(s.current),
            (Witness::Fibonacci(s), Field::Next) => Some(s.next),
            (Witness::Convergent(c), Field::P) => Some(c.p),
            (Witness::Convergent(c), Field::Q) => Some(c.q),
            (Witness::Convergent(c), Field::PrevP) => Some(c.prev_p),
            (Witness::Convergent(c), Field::PrevQ) => Some(c.prev_q),
            (Witness::PartialSum(s), Field::P) => Some(s.p),
            (Witness::PartialSum(s), Field::Q) => Some(s.q),
            (Witness::Matrix(m), Field::A) => Some(m.a),
            (Witness::Matrix(m), Field::B) => Some(m.b),
            (Witness::Matrix(m), Field::C) => Some(m.c),
            (Witness::Matrix(m), Field::D) => Some(m.d),
            (Witness::Associativity(w), Field::Left) => Some(w.left_grouped.total),
            (Witness::Associativity(w), Field::Right) => Some(w.right_grouped.total),
            (Witness::Commutativity(w), Field::Left) => Some(w.forward.left),
            (Witness::Commutativity(w), Field::Right) => Some(w.forward.right),
            (Witness::Commutativity(w), Field::Total) => Some(w.forward.total),
            _ => None,
        }
    }

    /// The fields that structural comparison looks at, in a fixed order.
    /// Products compare by their contract, so the two encodings agree when their fields do.
    pub fn fields(&self) -> Vec<(Field, Natural)> {
        let names: &[Field] = match self {
            Witness::Natural(_) => &[Field::Value],
            Witness::Integer(_) => &[],
            Witness::Sum(_) | Witness::Product(_) | Witness::Commutativity(_) => {
                &[Field::Left, Field::Right, Field::Total]
            }
            Witness::Ordering(_) | Witness::Associativity(_) => &[Field::Left, Field::Right],
            Witness::Fibonacci(_) => &[Field::Prev, Field::Current, Field::Next],
            Witness::Convergent(_) => &[Field::P, Field::Q, Field::PrevP, Field::PrevQ],
            Witness::PartialSum(_) => &[Field::P, Field::Q],
            Witness::Matrix(_) => &[Field::A, Field::B, Field::C, Field::D],
        };
        names
            .iter()
            .filter_map(|&name| self.field(name).map(|value| (name, value)))
            .collect()
    }
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Witness::Integer(i) = self {
            return write!(f, "Integer({})", i);
        }
        write!(f, "{}(", self.kind())?;
        for (i, (name, value)) in self.fields().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: u64) -> Natural {
        Natural::new(value)
    }

    fn sum(left: u64, right: u64) -> SumWitness {
        SumWitness::chain(n(left), n(right)).unwrap()
    }

    fn product(left: u64, right: u64) -> ProductWitness {
        ProductWitness::chain(n(left), n(right)).unwrap()
    }

    #[test]
    fn test_sum_chain_round_trip() {
        for left in 0..6 {
            for right in 0..6 {
                let w = SumWitness::chain(n(left), n(right)).unwrap();
                assert_eq!(w.left(), n(left));
                assert_eq!(w.right(), n(right));
                assert_eq!(w.total(), n(left + right));
            }
        }
    }

    #[test]
    fn test_sum_invert() {
        let w = SumWitness::chain(n(2), n(3)).unwrap();
        let p = w.invert().unwrap();
        assert_eq!((p.left(), p.right(), p.total()), (n(2), n(2), n(4)));
        assert!(SumWitness::base(n(5)).invert().is_none());
    }

    #[test]
    fn test_product_encodings_agree() {
        for left in 0..5 {
            for right in 0..5 {
                let composed = ProductWitness::chain(n(left), n(right)).unwrap();
                let flat = ProductWitness::flat_chain(n(left), n(right)).unwrap();
                assert_eq!(composed.total(), n(left * right));
                assert_eq!(
                    Witness::Product(composed).fields(),
                    Witness::Product(flat).fields()
                );
            }
        }
    }

    #[test]
    fn test_product_step_checks_its_sum() {
        let base = ProductWitness::base(n(3));
        let good = SumWitness::chain(n(0), n(3)).unwrap();
        let step = ProductWitness::step(&base, &good).unwrap();
        assert_eq!((step.left(), step.right(), step.total()), (n(3), n(1), n(3)));

        let bad = SumWitness::chain(n(0), n(2)).unwrap();
        let err = ProductWitness::step(&base, &bad).unwrap_err();
        assert_eq!(err.constructor, "ProductStep");
        assert!(err.message.contains("the sum's right is 2, not 3"));
    }

    #[test]
    fn test_flat_product_rejects_overfull_copy() {
        let mut w = ProductWitness::flat_base(n(2));
        w = w.tick().unwrap().tick().unwrap();
        assert!(w.tick().is_err());
        assert!(!w.is_complete());
        let grouped = w.group().unwrap();
        assert!(grouped.is_complete());
        assert!(ProductWitness::flat_base(n(2)).tick().unwrap().group().is_err());
    }

    #[test]
    fn test_product_invert() {
        let w = ProductWitness::chain(n(4), n(3)).unwrap();
        let (mul, add) = w.invert().unwrap();
        assert_eq!((mul.left(), mul.right(), mul.total()), (n(4), n(2), n(8)));
        assert_eq!((add.left(), add.right(), add.total()), (n(8), n(4), n(12)));
        assert_eq!(ProductWitness::step(&mul, &add).unwrap(), w);
    }

    #[test]
    fn test_fibonacci_steps() {
        let mut state = FibonacciState::base();
        let mut seen = vec![state.next()];
        for _ in 0..6 {
            let sum = SumWitness::chain(state.current(), state.next()).unwrap();
            state = state.step(&sum).unwrap();
            seen.push(state.next());
        }
        let values: Vec<u64> = seen.iter().map(|v| v.get()).collect();
        assert_eq!(values, vec![1, 1, 2, 3, 5, 8, 13]);
        assert_eq!(state.sum().total(), state.next());
    }

    #[test]
    fn test_convergent_step_requires_shared_multiplier() {
        let c0 = Convergent::base(n(1));
        let parts = ConvergentStep {
            p_times_b: product(1, 2),
            prev_p_times_a: product(1, 1),
            q_times_b: product(1, 2),
            prev_q_times_a: product(0, 1),
            numerator: sum(2, 1),
            denominator: sum(2, 0),
        };
        let c1 = c0.step(&parts).unwrap();
        assert_eq!((c1.p(), c1.q(), c1.prev_p(), c1.prev_q()), (n(3), n(2), n(1), n(1)));

        let skewed = ConvergentStep {
            q_times_b: product(1, 3),
            ..parts
        };
        assert!(c0.step(&skewed).is_err());
    }

    #[test]
    fn test_partial_sum_sub_then_add() {
        let s1 = RationalPartialSum::base();
        let s2 = s1
            .step(
                Sign::Sub,
                &product(1, 3),
                &product(1, 3),
                &sum(2, 1),
            )
            .unwrap();
        assert_eq!((s2.p(), s2.q()), (n(2), n(3)));
        let s3 = s2
            .step(
                Sign::Add,
                &product(2, 5),
                &product(3, 5),
                &sum(10, 3),
            )
            .unwrap();
        assert_eq!((s3.p(), s3.q()), (n(13), n(15)));
    }

    #[test]
    fn test_matrix_step() {
        let m0 = Matrix2x2::base(n(1));
        let m1 = m0
            .step(
                &product(1, 2),
                &product(1, 2),
                &sum(2, 1),
                &sum(2, 0),
            )
            .unwrap();
        assert_eq!((m1.a(), m1.b(), m1.c(), m1.d()), (n(3), n(2), n(1), n(1)));
    }

    #[test]
    fn test_steps_past_the_largest_natural_are_rejected() {
        let top = SumWitness::base(n(u64::MAX));
        let err = top.step().unwrap_err();
        assert_eq!(err.constructor, "SumStep");
        assert_eq!(err.message, format!("{} has no successor", u64::MAX));

        assert!(OrderingWitness::base(n(u64::MAX)).is_err());
        let near = OrderingWitness::base(n(u64::MAX - 1)).unwrap();
        assert_eq!(near.step().unwrap_err().constructor, "OrderingStep");

        let flat = ProductWitness::flat_base(n(1));
        assert!(flat.tick().unwrap().group().is_ok());
    }

    #[test]
    fn test_witness_display() {
        let w = Witness::Sum(sum(2, 3));
        assert_eq!(w.to_string(), "Sum(Left: 2, Right: 3, Total: 5)");
        assert_eq!(w.field(Field::P), None);
    }
}
