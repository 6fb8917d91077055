// Universal theorems, proved by structural induction.
//
// Each theorem is an induction over the Peano view of one natural (or over the steps of a
// witness, peeled off with its eliminator). The base case is the witness for zero, and the
// successor case builds the witness for S(p) out of the witness for p. `induct` runs that
// recursion bottom-up as a loop, so the stack stays flat however long the chain is.
//
// Induction here runs over a single index. Facts that couple two free naturals, like general
// multiplication commutativity, are only available with one operand fixed (commute_fixed_left)
// or at a bounded depth. Associativity gets around this by taking an already-constructed sum as
// a seed and inducting over the third natural only.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::natural::{Natural, Peano};
use super::witness::{
    AssociativityWitness, CommutativityWitness, ConstraintError, ProductWitness, Result,
    SumWitness, Witness,
};

/// Proves a statement for `n` from its base case and its successor case.
/// The successor case gets `p` and the witness for `p`, and returns the witness for `S(p)`.
fn induct<T>(n: Natural, base: T, mut step: impl FnMut(Natural, T) -> Result<T>) -> Result<T> {
    let mut witness = base;
    let mut remaining = n;
    let mut index = Natural::ZERO;
    while let Peano::Succ(rest) = remaining.peano() {
        witness = step(index, witness)?;
        index = Natural::new(n.get() - rest.get());
        remaining = rest;
    }
    Ok(witness)
}

/// Peels every step off a sum witness. Returns the base `a + 0 = a` and how many steps there were.
fn unwind_sum(w: &SumWitness) -> (SumWitness, Natural) {
    let mut base = *w;
    while let Some(prev) = base.invert() {
        base = prev;
    }
    (base, w.right())
}

/// Peels every copy off a complete product witness, down to `a * 0 = 0`.
fn unwind_product(w: &ProductWitness) -> (ProductWitness, Natural) {
    let mut base = *w;
    while let Some((prev, _)) = base.invert() {
        base = prev;
    }
    (base, w.right())
}

fn successor(constructor: &'static str, n: Natural) -> Result<Natural> {
    n.checked_succ().ok_or_else(|| ConstraintError {
        constructor,
        message: format!("{} has no successor", n),
    })
}

/// `0 + n = n`
pub fn add_left_zero(n: Natural) -> Result<SumWitness> {
    induct(n, SumWitness::base(Natural::ZERO), |_, prev| prev.step())
}

/// From `a + b = c`, conclude `S(a) + b = S(c)`, by induction on the steps of the witness.
pub fn succ_left_add(w: &SumWitness) -> Result<SumWitness> {
    let (base, steps) = unwind_sum(w);
    let start = SumWitness::base(successor("SuccLeftAdd", base.left())?);
    induct(steps, start, |_, prev| prev.step())
}

/// From `a + b = c`, conclude `b + a = c`.
pub fn add_commutative(w: &SumWitness) -> Result<SumWitness> {
    let (base, steps) = unwind_sum(w);
    induct(steps, add_left_zero(base.left())?, |_, prev| succ_left_add(&prev))
}

/// From the seed `a + b = ab`, conclude `(a + b) + c = a + (b + c)`.
pub fn add_associative(seed: &SumWitness, c: Natural) -> Result<AssociativityWitness> {
    let base = AssociativityWitness {
        ab: *seed,
        bc: SumWitness::base(seed.right()),
        left_grouped: SumWitness::base(seed.total()),
        right_grouped: *seed,
    };
    induct(c, base, |_, prev| {
        Ok(AssociativityWitness {
            ab: prev.ab,
            bc: prev.bc.step()?,
            left_grouped: prev.left_grouped.step()?,
            right_grouped: prev.right_grouped.step()?,
        })
    })
}

/// `0 * n = 0`
pub fn mul_left_zero(n: Natural) -> Result<ProductWitness> {
    induct(n, ProductWitness::base(Natural::ZERO), |_, prev| {
        ProductWitness::step(&prev, &SumWitness::base(Natural::ZERO))
    })
}

/// `1 * n = n`
pub fn mul_left_one(n: Natural) -> Result<ProductWitness> {
    induct(n, ProductWitness::base(Natural::ONE), |p, prev| {
        ProductWitness::step(&prev, &SumWitness::base(p).step()?)
    })
}

/// Distributes one more unit across every copy.
/// From `a * b = t`, conclude `S(a) * b = t + b`.
pub fn succ_left_mul(w: &ProductWitness) -> Result<ProductWitness> {
    if !w.is_complete() {
        return Err(ConstraintError {
            constructor: "SuccLeftMul",
            message: "the product has pending units".to_string(),
        });
    }
    let (base, copies) = unwind_product(w);
    let start = ProductWitness::base(successor("SuccLeftMul", base.left())?);
    induct(copies, start, |_, prev| {
        let add = SumWitness::chain(prev.total(), prev.left())?;
        ProductWitness::step(&prev, &add)
    })
}

/// The reverse chain `b * a`, by induction on `b`.
pub fn reverse_chain(a: Natural, b: Natural) -> Result<ProductWitness> {
    induct(b, mul_left_zero(a)?, |_, prev| succ_left_mul(&prev))
}

/// Checks that the two sides really are `a * b` and `b * a` with the same total.
fn pair(forward: ProductWitness, reverse: ProductWitness) -> Result<CommutativityWitness> {
    let agree = forward.total() == reverse.total()
        && forward.left() == reverse.right()
        && forward.right() == reverse.left();
    if !agree {
        return Err(ConstraintError {
            constructor: "Commute",
            message: format!(
                "{} * {} = {} does not pair with {} * {} = {}",
                forward.left(),
                forward.right(),
                forward.total(),
                reverse.left(),
                reverse.right(),
                reverse.total()
            ),
        });
    }
    Ok(CommutativityWitness { forward, reverse })
}

/// `a * b = b * a` for a fixed left operand of at least 2.
/// The forward side is flat, `a` ticks per group. The reverse side distributes one unit at a time.
pub fn commute_fixed_left(a: Natural, b: Natural) -> Result<CommutativityWitness> {
    pair(ProductWitness::flat_chain(a, b)?, reverse_chain(a, b)?)
}

/// `0 * b = b * 0`, straight from the base cases.
pub fn commute_zero(b: Natural) -> Result<CommutativityWitness> {
    pair(mul_left_zero(b)?, ProductWitness::base(b))
}

/// `1 * b = b * 1`
pub fn commute_one(b: Natural) -> Result<CommutativityWitness> {
    let reverse = ProductWitness::step(&ProductWitness::base(b), &add_left_zero(b)?)?;
    pair(mul_left_one(b)?, reverse)
}

/// Picks the dedicated base-case witnesses for 0 and 1, and the general pairing otherwise.
pub fn commute(a: Natural, b: Natural) -> Result<CommutativityWitness> {
    match a.get() {
        0 => commute_zero(b),
        1 => commute_one(b),
        _ => commute_fixed_left(a, b),
    }
}

/// A universal theorem that can appear inside a certificate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Theorem {
    AddLeftZero,
    SuccLeftAdd,
    AddCommutative,
    AddAssociative,
    MulLeftZero,
    MulLeftOne,
    SuccLeftMul,
    Commute,
}

impl Theorem {
    pub fn name(&self) -> &'static str {
        match self {
            Theorem::AddLeftZero => "AddLeftZero",
            Theorem::SuccLeftAdd => "SuccLeftAdd",
            Theorem::AddCommutative => "AddCommutative",
            Theorem::AddAssociative => "AddAssociative",
            Theorem::MulLeftZero => "MulLeftZero",
            Theorem::MulLeftOne => "MulLeftOne",
            Theorem::SuccLeftMul => "SuccLeftMul",
            Theorem::Commute => "Commute",
        }
    }

    fn mismatch(&self, args: &[Witness]) -> ConstraintError {
        let kinds: Vec<String> = args.iter().map(|a| a.kind().to_string()).collect();
        ConstraintError {
            constructor: self.name(),
            message: format!("cannot apply to ({})", kinds.join(", ")),
        }
    }

    /// Fails if the induction would run over more than `limit` units.
    fn within(&self, limit: u64, sizes: &[Natural]) -> Result<()> {
        match sizes.iter().find(|size| size.get() > limit) {
            Some(size) => Err(ConstraintError {
                constructor: self.name(),
                message: format!("induction over {} exceeds the maximum chain length {}", size, limit),
            }),
            None => Ok(()),
        }
    }

    /// Instantiates the theorem at the given arguments.
    /// Every natural the proof inducts over must be at most `limit`.
    pub fn apply(&self, args: &[Witness], limit: u64) -> Result<Witness> {
        match (self, args) {
            (Theorem::AddLeftZero, [Witness::Natural(n)]) => {
                self.within(limit, &[*n])?;
                Ok(Witness::Sum(add_left_zero(*n)?))
            }
            (Theorem::SuccLeftAdd, [Witness::Sum(w)]) => {
                self.within(limit, &[w.right()])?;
                Ok(Witness::Sum(succ_left_add(w)?))
            }
            (Theorem::AddCommutative, [Witness::Sum(w)]) => {
                self.within(limit, &[w.left(), w.right()])?;
                Ok(Witness::Sum(add_commutative(w)?))
            }
            (Theorem::AddAssociative, [Witness::Sum(seed), Witness::Natural(c)]) => {
                self.within(limit, &[*c])?;
                Ok(Witness::Associativity(add_associative(seed, *c)?))
            }
            (Theorem::MulLeftZero, [Witness::Natural(n)]) => {
                self.within(limit, &[*n])?;
                Ok(Witness::Product(mul_left_zero(*n)?))
            }
            (Theorem::MulLeftOne, [Witness::Natural(n)]) => {
                self.within(limit, &[*n])?;
                Ok(Witness::Product(mul_left_one(*n)?))
            }
            (Theorem::SuccLeftMul, [Witness::Product(w)]) => {
                self.within(limit, &[w.left(), w.right()])?;
                Ok(Witness::Product(succ_left_mul(w)?))
            }
            (Theorem::Commute, [Witness::Natural(a), Witness::Natural(b)]) => {
                let total = Natural::new(a.get().saturating_mul(b.get()));
                self.within(limit, &[*a, *b, total])?;
                Ok(Witness::Commutativity(commute(*a, *b)?))
            }
            _ => Err(self.mismatch(args)),
        }
    }
}

impl fmt::Display for Theorem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::witness::Field;

    const LIMIT: u64 = 4096;

    fn n(value: u64) -> Natural {
        Natural::new(value)
    }

    fn sum(left: u64, right: u64) -> SumWitness {
        SumWitness::chain(n(left), n(right)).unwrap()
    }

    fn triple(w: &SumWitness) -> (u64, u64, u64) {
        (w.left().get(), w.right().get(), w.total().get())
    }

    #[test]
    fn test_add_left_zero_for_every_small_natural() {
        for i in 0..20 {
            assert_eq!(triple(&add_left_zero(n(i)).unwrap()), (0, i, i));
        }
    }

    #[test]
    fn test_succ_left_add() {
        assert_eq!(triple(&succ_left_add(&sum(3, 4)).unwrap()), (4, 4, 8));
    }

    #[test]
    fn test_add_commutative() {
        for a in 0..6 {
            for b in 0..6 {
                assert_eq!(triple(&add_commutative(&sum(a, b)).unwrap()), (b, a, a + b));
            }
        }
    }

    #[test]
    fn test_long_inductions_do_not_recurse() {
        let w = add_commutative(&sum(1, 200_000)).unwrap();
        assert_eq!(triple(&w), (200_000, 1, 200_001));
        let zero = mul_left_zero(n(200_000)).unwrap();
        assert_eq!(zero.right(), n(200_000));
    }

    #[test]
    fn test_add_associative_from_seed() {
        let w = add_associative(&sum(2, 3), n(4)).unwrap();
        assert_eq!(triple(w.ab()), (2, 3, 5));
        assert_eq!(triple(w.bc()), (3, 4, 7));
        assert_eq!(triple(w.left_grouped()), (5, 4, 9));
        assert_eq!(triple(w.right_grouped()), (2, 7, 9));
    }

    #[test]
    fn test_mul_left_zero_and_one() {
        let zero = mul_left_zero(n(5)).unwrap();
        assert_eq!((zero.left(), zero.right(), zero.total()), (n(0), n(5), n(0)));
        let one = mul_left_one(n(5)).unwrap();
        assert_eq!((one.left(), one.right(), one.total()), (n(1), n(5), n(5)));
    }

    #[test]
    fn test_succ_left_mul_distributes_one_unit() {
        let w = ProductWitness::chain(n(3), n(4)).unwrap();
        let shifted = succ_left_mul(&w).unwrap();
        assert_eq!(
            (shifted.left(), shifted.right(), shifted.total()),
            (n(4), n(4), n(16))
        );
        let pending = ProductWitness::flat_base(n(2)).tick().unwrap();
        assert!(succ_left_mul(&pending).is_err());
    }

    #[test]
    fn test_succ_left_add_at_the_top_is_rejected() {
        let top = SumWitness::base(n(u64::MAX));
        assert_eq!(succ_left_add(&top).unwrap_err().constructor, "SuccLeftAdd");
    }

    #[test]
    fn test_commutativity_pairs_agree() {
        for a in 0..5 {
            for b in 0..5 {
                let pair = commute(n(a), n(b)).unwrap();
                assert_eq!(pair.forward().left(), n(a));
                assert_eq!(pair.reverse().left(), n(b));
                assert_eq!(pair.forward().total(), n(a * b));
                assert_eq!(pair.reverse().total(), n(a * b));
            }
        }
    }

    #[test]
    fn test_base_case_pairs() {
        let zero = commute_zero(n(4)).unwrap();
        assert_eq!(zero.reverse().right(), n(0));
        assert_eq!(zero.forward().total(), n(0));
        let one = commute_one(n(4)).unwrap();
        assert_eq!((one.reverse().left(), one.reverse().right()), (n(4), n(1)));
        assert_eq!(one.forward().total(), n(4));
    }

    #[test]
    fn test_mismatched_sides_do_not_pair() {
        let forward = ProductWitness::chain(n(2), n(3)).unwrap();
        let reverse = ProductWitness::chain(n(2), n(3)).unwrap();
        let err = pair(forward, reverse).unwrap_err();
        assert_eq!(err.constructor, "Commute");
        assert_eq!(err.message, "2 * 3 = 6 does not pair with 2 * 3 = 6");
    }

    #[test]
    fn test_theorem_apply_checks_argument_kinds() {
        let w = Theorem::AddAssociative
            .apply(&[Witness::Sum(sum(1, 1)), Witness::Natural(n(2))], LIMIT)
            .unwrap();
        assert_eq!(w.field(Field::Left), w.field(Field::Right));

        let err = Theorem::SuccLeftMul
            .apply(&[Witness::Natural(n(2))], LIMIT)
            .unwrap_err();
        assert_eq!(err.constructor, "SuccLeftMul");
        assert_eq!(err.message, "cannot apply to (Natural)");
    }

    #[test]
    fn test_commute_theorem() {
        let w = Theorem::Commute
            .apply(&[Witness::Natural(n(3)), Witness::Natural(n(1))], LIMIT)
            .unwrap();
        assert_eq!(w.to_string(), "Commutativity(Left: 3, Right: 1, Total: 3)");
    }

    #[test]
    fn test_theorem_apply_respects_the_limit() {
        let err = Theorem::AddLeftZero
            .apply(&[Witness::Natural(n(u64::MAX))], LIMIT)
            .unwrap_err();
        assert_eq!(
            err.message,
            format!("induction over {} exceeds the maximum chain length 4096", u64::MAX)
        );
        assert!(Theorem::Commute
            .apply(&[Witness::Natural(n(100)), Witness::Natural(n(100))], LIMIT)
            .is_err());
    }
}
