use std::collections::BTreeMap;

use tracing::trace;

use crate::certificate::Declaration;
use crate::expression::WitnessExpr;
use crate::kernel::Natural;

/// Tracks which products one expansion needs, so each factor gets a single shared chain.
///
/// Every consumer that needs `factor * multiplier` gets a reference to the point `multiplier`
/// inside the chain for `factor`. The chain itself is only built once, up to the largest
/// multiplier anyone asked for.
#[derive(Debug, Default)]
pub struct ProductTable {
    max_multiplier: BTreeMap<u64, u64>,
}

impl ProductTable {
    pub fn new() -> ProductTable {
        ProductTable::default()
    }

    /// The declaration name of the shared chain for a factor.
    pub fn chain_name(factor: Natural) -> String {
        format!("_Mul{}", factor)
    }

    /// Records that `factor * multiplier` is needed and returns a reference to it.
    pub fn need(&mut self, factor: Natural, multiplier: Natural) -> WitnessExpr {
        let entry = self.max_multiplier.entry(factor.get()).or_insert(0);
        if multiplier.get() > *entry {
            *entry = multiplier.get();
        }
        WitnessExpr::ChainPoint {
            chain: ProductTable::chain_name(factor),
            multiplier,
        }
    }

    /// The number of distinct chains so far.
    pub fn len(&self) -> usize {
        self.max_multiplier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max_multiplier.is_empty()
    }

    /// The largest total any chain will reach.
    pub fn largest_total(&self) -> u64 {
        self.max_multiplier
            .iter()
            .map(|(factor, multiplier)| factor.saturating_mul(*multiplier))
            .max()
            .unwrap_or(0)
    }

    /// One chain declaration per factor, in increasing factor order.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.max_multiplier
            .iter()
            .map(|(&factor, &multiplier)| {
                let factor = Natural::new(factor);
                trace!(factor = %factor, multiplier, "declaring product chain");
                Declaration::new(
                    ProductTable::chain_name(factor),
                    composed_chain(factor, Natural::new(multiplier)),
                )
            })
            .collect()
    }
}

/// `Base(left)` wrapped in `right` sum steps.
pub fn sum_chain(left: Natural, right: Natural) -> WitnessExpr {
    let mut expr = WitnessExpr::SumBase(left);
    for _ in 0..right.get() {
        expr = WitnessExpr::sum_step(expr);
    }
    expr
}

/// The composed product chain for `factor * multiplier`.
/// Each step adds one more copy of `factor` to the running total with its own sum chain.
pub fn composed_chain(factor: Natural, multiplier: Natural) -> WitnessExpr {
    let mut expr = WitnessExpr::ProductBase(factor);
    let mut total = 0u64;
    for _ in 0..multiplier.get() {
        let add = sum_chain(Natural::new(total), factor);
        expr = WitnessExpr::product_step(expr, add);
        total += factor.get();
    }
    expr
}

/// The flat product chain for `factor * multiplier`: `factor` ticks, then a group, repeatedly.
pub fn flat_chain(factor: Natural, multiplier: Natural) -> WitnessExpr {
    let mut expr = WitnessExpr::FlatBase(factor);
    for _ in 0..multiplier.get() {
        for _ in 0..factor.get() {
            expr = WitnessExpr::tick(expr);
        }
        expr = WitnessExpr::group(expr);
    }
    expr
}

/// `OrderingBase(gap - 1)` stepped `left` times, which witnesses `left < left + gap`.
pub fn ordering_chain(left: Natural, right: Natural) -> Option<WitnessExpr> {
    let gap = right.get().checked_sub(left.get())?;
    let base = Natural::new(gap).pred()?;
    let mut expr = WitnessExpr::OrderingBase(base);
    for _ in 0..left.get() {
        expr = WitnessExpr::ordering_step(expr);
    }
    Some(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: u64) -> Natural {
        Natural::new(value)
    }

    #[test]
    fn test_need_is_idempotent() {
        let mut table = ProductTable::new();
        let first = table.need(n(2), n(3));
        let second = table.need(n(2), n(3));
        assert_eq!(first, second);
        assert_eq!(table.declarations().len(), 1);
    }

    #[test]
    fn test_chain_reaches_the_largest_multiplier() {
        let mut table = ProductTable::new();
        table.need(n(2), n(3));
        table.need(n(2), n(5));
        table.need(n(2), n(1));
        table.need(n(7), n(2));
        let decls = table.declarations();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "_Mul2");
        assert_eq!(decls[0].expr, composed_chain(n(2), n(5)));
        assert_eq!(decls[1].name, "_Mul7");
        assert_eq!(table.largest_total(), 14);
    }

    #[test]
    fn test_ordering_chain_needs_a_gap() {
        assert!(ordering_chain(n(3), n(3)).is_none());
        assert!(ordering_chain(n(4), n(3)).is_none());
        let expr = ordering_chain(n(2), n(5)).unwrap();
        assert_eq!(expr.to_string(), "OrderingStep^2(OrderingBase(2))");
    }
}
