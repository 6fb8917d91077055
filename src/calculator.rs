// Plain machine arithmetic for the recurrences the certificates encode.
// Nothing in here builds witnesses. Every operation is checked, so a value that does not fit
// in a u64 is an error rather than a wrong certificate.

use crate::evaluator::EvaluationError;

type Result<T> = std::result::Result<T, EvaluationError>;

fn overflow(operation: &str) -> EvaluationError {
    EvaluationError::Overflow(operation.to_string())
}

fn add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or_else(|| overflow("+"))
}

fn mul(a: u64, b: u64) -> Result<u64> {
    a.checked_mul(b).ok_or_else(|| overflow("*"))
}

/// `fibonacci(0) = 0`, `fibonacci(1) = 1`.
pub fn fibonacci(n: u64) -> Result<u64> {
    // Starts from F(-1) = 1, so the loop never computes past F(n).
    let (mut prev, mut current) = (1u64, 0u64);
    for _ in 0..n {
        (prev, current) = (current, add(prev, current)?);
    }
    Ok(current)
}

/// `fibonacci(0..count)`.
pub fn fibonacci_sequence(count: usize) -> Result<Vec<u64>> {
    let mut answer = Vec::with_capacity(count);
    let (mut prev, mut current) = (1u64, 0u64);
    for i in 0..count {
        if i > 0 {
            (prev, current) = (current, add(prev, current)?);
        }
        answer.push(current);
    }
    Ok(answer)
}

/// One term of a generalized continued fraction: `a` over, `b` beside.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Term {
    pub a: u64,
    pub b: u64,
}

/// The convergents `H[i] / K[i]` of `b0 + a1/(b1 + a2/(b2 + ...))`, for `i = 0..=terms.len()`.
///
/// `H[i] = b_i * H[i-1] + a_i * H[i-2]`, seeded with `H[-1] = 1, H[0] = b0`,
/// and `K` the same way with `K[-1] = 0, K[0] = 1`.
pub fn convergents(b0: u64, terms: &[Term]) -> Result<Vec<(u64, u64)>> {
    let mut answer = vec![(b0, 1)];
    let (mut prev_h, mut prev_k) = (1u64, 0u64);
    let (mut h, mut k) = (b0, 1u64);
    for term in terms {
        let next_h = add(mul(term.b, h)?, mul(term.a, prev_h)?)?;
        let next_k = add(mul(term.b, k)?, mul(term.a, prev_k)?)?;
        prev_h = h;
        prev_k = k;
        h = next_h;
        k = next_k;
        answer.push((h, k));
    }
    Ok(answer)
}

/// The continued fraction for pi that matches the Leibniz series:
/// `1 + 1^2/(2 + 3^2/(2 + 5^2/(2 + ...)))`, which converges to `4 / pi`.
pub fn pi_terms(depth: usize) -> Result<Vec<Term>> {
    Ok(odd_squares(depth)?
        .into_iter()
        .map(|a| Term { a, b: 2 })
        .collect())
}

/// The odd squares `1, 9, 25, ...`.
pub fn odd_squares(count: usize) -> Result<Vec<u64>> {
    (1..=count as u64)
        .map(|i| {
            let odd = mul(2, i)? - 1;
            mul(odd, odd)
        })
        .collect()
}

/// One step of a Leibniz partial sum.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LeibnizStep {
    pub subtract: bool,
    pub denominator: u64,
    pub p_times_d: u64,
    pub q_times_d: u64,
    pub p: u64,
    pub q: u64,
}

/// The partial sums `S_1 = 1/1, S_2 = 1 - 1/3, S_3 = 1 - 1/3 + 1/5, ...` as unreduced
/// fractions, together with the intermediate products for each step.
/// Returns `count` sums, and the `count - 1` steps between them.
pub fn leibniz_partial_sums(count: usize) -> Result<(Vec<(u64, u64)>, Vec<LeibnizStep>)> {
    let mut sums = Vec::with_capacity(count);
    let mut steps = Vec::new();
    if count == 0 {
        return Ok((sums, steps));
    }
    let (mut p, mut q) = (1u64, 1u64);
    sums.push((p, q));
    for k in 2..=count as u64 {
        let denominator = mul(2, k)? - 1;
        let subtract = k % 2 == 0;
        let p_times_d = mul(p, denominator)?;
        let q_times_d = mul(q, denominator)?;
        let next_p = if subtract {
            p_times_d.checked_sub(q).ok_or_else(|| overflow("-"))?
        } else {
            add(p_times_d, q)?
        };
        steps.push(LeibnizStep {
            subtract,
            denominator,
            p_times_d,
            q_times_d,
            p: next_p,
            q: q_times_d,
        });
        p = next_p;
        q = q_times_d;
        sums.push((p, q));
    }
    Ok((sums, steps))
}

/// A 2x2 matrix as `[[a, b], [c, d]]`.
pub type Matrix = [[u64; 2]; 2];

/// `M_0 = [[b0, 1], [1, 0]]`, and `M_i = [[m_i, 1], [1, 0]] * M_{i-1}` for each multiplier.
pub fn matrix_powers(b0: u64, multipliers: &[u64]) -> Result<Vec<Matrix>> {
    let mut current: Matrix = [[b0, 1], [1, 0]];
    let mut answer = vec![current];
    for &m in multipliers {
        let [[a, b], [c, d]] = current;
        current = [[add(mul(a, m)?, c)?, add(mul(b, m)?, d)?], [a, b]];
        answer.push(current);
    }
    Ok(answer)
}

pub fn factorial(n: u64) -> Result<u64> {
    (1..=n).try_fold(1u64, |acc, i| mul(acc, i))
}

pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Counts calls so that runaway recursions stop with an error.
pub struct Budget {
    remaining: u64,
}

impl Budget {
    pub fn new(limit: u64) -> Budget {
        Budget { remaining: limit }
    }

    pub fn spend(&mut self) -> Result<()> {
        match self.remaining.checked_sub(1) {
            Some(remaining) => {
                self.remaining = remaining;
                Ok(())
            }
            None => Err(EvaluationError::Budget),
        }
    }
}

/// The hyperoperation sequence: `n = 0` is successor, 1 addition, 2 multiplication,
/// 3 exponentiation, and so on.
/// Unfolds `H(n, a, b) = H(n - 1, a, H(n, a, b - 1))` on an explicit stack of pending levels.
pub fn hyperop(n: u64, a: u64, b: u64, budget: &mut Budget) -> Result<u64> {
    let mut stack = vec![n];
    let mut b = b;
    while let Some(n) = stack.pop() {
        budget.spend()?;
        b = match (n, b) {
            (0, _) => add(b, 1)?,
            (1, _) => add(a, b)?,
            (2, _) => mul(a, b)?,
            (3, _) => {
                let exponent = u32::try_from(b).map_err(|_| overflow("**"))?;
                a.checked_pow(exponent).ok_or_else(|| overflow("**"))?
            }
            (_, 0) => 1,
            _ => {
                stack.push(n - 1);
                stack.push(n);
                b - 1
            }
        };
    }
    Ok(b)
}

/// The Ackermann-Peter function, with an explicit stack instead of recursion.
pub fn ackermann(m: u64, n: u64, budget: &mut Budget) -> Result<u64> {
    let mut stack = vec![m];
    let mut n = n;
    while let Some(m) = stack.pop() {
        budget.spend()?;
        if m == 0 {
            n = add(n, 1)?;
        } else if n == 0 {
            stack.push(m - 1);
            n = 1;
        } else {
            stack.push(m - 1);
            stack.push(m);
            n -= 1;
        }
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci() {
        assert_eq!(fibonacci_sequence(8).unwrap(), vec![0, 1, 1, 2, 3, 5, 8, 13]);
        assert_eq!(fibonacci(10).unwrap(), 55);
        assert_eq!(fibonacci(93).unwrap(), 12200160415121876738);
        assert!(fibonacci(94).is_err());
    }

    #[test]
    fn test_golden_convergents() {
        let ones = vec![Term { a: 1, b: 1 }; 4];
        let c = convergents(1, &ones).unwrap();
        assert_eq!(c, vec![(1, 1), (2, 1), (3, 2), (5, 3), (8, 5)]);
    }

    #[test]
    fn test_pi_convergents_and_leibniz_sums() {
        let c = convergents(1, &pi_terms(3).unwrap()).unwrap();
        assert_eq!(c, vec![(1, 1), (3, 2), (15, 13), (105, 76)]);
        let (sums, steps) = leibniz_partial_sums(4).unwrap();
        assert_eq!(sums, vec![(1, 1), (2, 3), (13, 15), (76, 105)]);
        assert_eq!(steps.len(), 3);
        assert!(steps[0].subtract);
        assert_eq!(steps[0].denominator, 3);
        assert!(!steps[1].subtract);
        // The convergents are the reciprocals of the partial sums.
        for i in 0..c.len() {
            assert_eq!(c[i], (sums[i].1, sums[i].0));
        }
        assert_eq!(odd_squares(3).unwrap(), vec![1, 9, 25]);
    }

    #[test]
    fn test_sqrt2_matrix_powers() {
        let m = matrix_powers(1, &[2, 2]).unwrap();
        assert_eq!(m[0], [[1, 1], [1, 0]]);
        assert_eq!(m[1], [[3, 2], [1, 1]]);
        assert_eq!(m[2], [[7, 5], [3, 2]]);
        let c = convergents(1, &[Term { a: 1, b: 2 }; 2]).unwrap();
        assert_eq!(c[2], (7, 5));
    }

    #[test]
    fn test_small_functions() {
        assert_eq!(factorial(5).unwrap(), 120);
        assert_eq!(factorial(0).unwrap(), 1);
        assert!(factorial(30).is_err());
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(0, 7), 7);
    }

    #[test]
    fn test_hyperop_and_ackermann() {
        let mut budget = Budget::new(1_000_000);
        assert_eq!(hyperop(0, 7, 3, &mut budget).unwrap(), 4);
        assert_eq!(hyperop(1, 2, 3, &mut budget).unwrap(), 5);
        assert_eq!(hyperop(2, 2, 3, &mut budget).unwrap(), 6);
        assert_eq!(hyperop(3, 2, 3, &mut budget).unwrap(), 8);
        assert_eq!(hyperop(4, 2, 3, &mut budget).unwrap(), 16);
        assert_eq!(ackermann(2, 3, &mut budget).unwrap(), 9);
        assert_eq!(ackermann(3, 3, &mut budget).unwrap(), 61);

        let mut tiny = Budget::new(10);
        assert_eq!(ackermann(3, 3, &mut tiny), Err(EvaluationError::Budget));
        let mut tiny = Budget::new(10);
        assert_eq!(hyperop(5, 2, 3, &mut tiny), Err(EvaluationError::Budget));
    }

    #[test]
    fn test_high_hyperops_do_not_recurse() {
        // H(n, 2, 1) unfolds one level at a time down to 2^1.
        let mut budget = Budget::new(1_000_000);
        assert_eq!(hyperop(200_000, 2, 1, &mut budget).unwrap(), 2);
        assert_eq!(hyperop(5, 2, 2, &mut budget).unwrap(), 4);
    }

    #[test]
    fn test_pi_terms_are_built_from_odd_squares() {
        let terms = pi_terms(3).unwrap();
        let squares: Vec<u64> = terms.iter().map(|t| t.a).collect();
        assert_eq!(squares, odd_squares(3).unwrap());
        assert!(terms.iter().all(|t| t.b == 2));
    }
}
