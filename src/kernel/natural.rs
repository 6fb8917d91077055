use std::fmt;

use serde::{Deserialize, Serialize};

/// A unary natural number.
///
/// Conceptually this is the inductive type `Zero | Successor(Natural)`. Since every natural has
/// exactly one structural form, we store it as the number of successors applied to zero.
/// Structural equality and numeric equality coincide.
///
/// Code that wants to reason inductively should match on `peano()` rather than reading the
/// count directly.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Natural(u64);

/// The inductive view of a natural: either zero, or the successor of a smaller natural.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Peano {
    Zero,
    Succ(Natural),
}

impl Natural {
    pub const ZERO: Natural = Natural(0);
    pub const ONE: Natural = Natural(1);

    pub const fn new(value: u64) -> Natural {
        Natural(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// The successor constructor.
    /// Returns None at the top of the representable range rather than wrapping.
    pub fn checked_succ(self) -> Option<Natural> {
        self.0.checked_add(1).map(Natural)
    }

    pub fn pred(self) -> Option<Natural> {
        self.0.checked_sub(1).map(Natural)
    }

    /// Which constructor built this natural.
    pub fn peano(self) -> Peano {
        match self.pred() {
            None => Peano::Zero,
            Some(p) => Peano::Succ(p),
        }
    }
}

impl From<u64> for Natural {
    fn from(value: u64) -> Self {
        Natural(value)
    }
}

impl fmt::Display for Natural {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An integer, used only as the target of value conversion.
/// Negative values are stored as the magnitude minus one, so every integer has one form.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Integer {
    NonNegative(Natural),
    NegativeSucc(Natural),
}

impl Integer {
    pub fn from_i64(value: i64) -> Integer {
        if value >= 0 {
            Integer::NonNegative(Natural(value as u64))
        } else {
            // -(n + 1) for n = |value| - 1, computed without overflowing on i64::MIN.
            Integer::NegativeSucc(Natural((-(value + 1)) as u64))
        }
    }

    pub fn to_i128(self) -> i128 {
        match self {
            Integer::NonNegative(n) => n.get() as i128,
            Integer::NegativeSucc(n) => -(n.get() as i128) - 1,
        }
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_i128())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peano_view() {
        assert_eq!(Natural::ZERO.peano(), Peano::Zero);
        assert_eq!(Natural::new(3).peano(), Peano::Succ(Natural::new(2)));
        assert_eq!(Natural::new(2).checked_succ(), Some(Natural::new(3)));
        assert_eq!(Natural::new(u64::MAX).checked_succ(), None);
    }

    #[test]
    fn test_integer_forms_are_canonical() {
        assert_eq!(Integer::from_i64(-1), Integer::NegativeSucc(Natural::ZERO));
        assert_eq!(Integer::from_i64(4), Integer::NonNegative(Natural::new(4)));
        assert_eq!(Integer::from_i64(i64::MIN).to_i128(), i64::MIN as i128);
        assert_eq!(Integer::from_i64(-7).to_string(), "-7");
    }

    #[test]
    fn test_natural_serializes_as_number() {
        let json = serde_json::to_string(&Natural::new(12)).unwrap();
        assert_eq!(json, "12");
    }
}
