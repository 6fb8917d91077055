use std::fmt;

use pretty::{DocAllocator, DocBuilder, Pretty};
use serde::{Deserialize, Serialize};

use crate::kernel::induction::Theorem;
use crate::kernel::witness::Sign;
use crate::kernel::{Integer, Natural};

const PRINT_WIDTH: usize = 80;
const INDENT: isize = 2;

// Subexpressions nested deeper than this print as "...".
const MAX_RENDER_DEPTH: usize = 64;

/// A witness-constructor expression: the data that the emitter produces and the checker
/// elaborates. Nothing here is trusted. The checker rebuilds every witness with the kernel
/// constructors, which enforce the side conditions.
///
/// In memory this is a tree. For storage and checking it is flattened into a postfix
/// `Program`, so arbitrarily long chains never need deep recursion. Cloning, comparing,
/// dropping and serializing all go through the postfix form or an explicit stack.
#[derive(Eq, Deserialize)]
#[serde(try_from = "Program")]
pub enum WitnessExpr {
    /// A natural number as a value.
    Nat(Natural),

    /// An integer as a value. Only produced by value conversion.
    Int(Integer),

    /// The witness bound to an earlier declaration.
    Ref(String),

    /// The point `multiplier` within a product chain declared under `chain`.
    ChainPoint { chain: String, multiplier: Natural },

    SumBase(Natural),
    SumStep(Box<WitnessExpr>),

    ProductBase(Natural),
    ProductStep {
        mul: Box<WitnessExpr>,
        add: Box<WitnessExpr>,
    },
    FlatBase(Natural),
    Tick(Box<WitnessExpr>),
    Group(Box<WitnessExpr>),

    OrderingBase(Natural),
    OrderingStep(Box<WitnessExpr>),

    FibonacciBase,
    FibonacciStep {
        state: Box<WitnessExpr>,
        sum: Box<WitnessExpr>,
    },

    ConvergentBase(Natural),
    ConvergentStep {
        prev: Box<WitnessExpr>,
        p_times_b: Box<WitnessExpr>,
        prev_p_times_a: Box<WitnessExpr>,
        q_times_b: Box<WitnessExpr>,
        prev_q_times_a: Box<WitnessExpr>,
        numerator: Box<WitnessExpr>,
        denominator: Box<WitnessExpr>,
    },

    PartialSumBase,
    PartialSumStep {
        sign: Sign,
        prev: Box<WitnessExpr>,
        p_times_d: Box<WitnessExpr>,
        q_times_d: Box<WitnessExpr>,
        numerator: Box<WitnessExpr>,
    },

    MatrixBase(Natural),
    MatrixStep {
        prev: Box<WitnessExpr>,
        a_times_m: Box<WitnessExpr>,
        b_times_m: Box<WitnessExpr>,
        top_left: Box<WitnessExpr>,
        top_right: Box<WitnessExpr>,
    },

    /// A universal theorem instantiated at some arguments.
    Theorem {
        theorem: Theorem,
        args: Vec<WitnessExpr>,
    },
}

/// One instruction of a postfix program.
/// Each instruction pops its arguments off the stack, in order, and pushes its result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    Nat(Natural),
    Int(Integer),
    Ref(String),
    ChainPoint { chain: String, multiplier: Natural },
    SumBase(Natural),
    SumStep,
    ProductBase(Natural),
    ProductStep,
    FlatBase(Natural),
    Tick,
    Group,
    OrderingBase(Natural),
    OrderingStep,
    FibonacciBase,
    FibonacciStep,
    ConvergentBase(Natural),
    ConvergentStep,
    PartialSumBase,
    PartialSumStep(Sign),
    MatrixBase(Natural),
    MatrixStep,
    Theorem { theorem: Theorem, arity: usize },
}

impl Instruction {
    /// How many values this instruction pops.
    pub fn arity(&self) -> usize {
        match self {
            Instruction::Nat(_)
            | Instruction::Int(_)
            | Instruction::Ref(_)
            | Instruction::ChainPoint { .. }
            | Instruction::SumBase(_)
            | Instruction::ProductBase(_)
            | Instruction::FlatBase(_)
            | Instruction::OrderingBase(_)
            | Instruction::FibonacciBase
            | Instruction::ConvergentBase(_)
            | Instruction::PartialSumBase
            | Instruction::MatrixBase(_) => 0,
            Instruction::SumStep
            | Instruction::Tick
            | Instruction::Group
            | Instruction::OrderingStep => 1,
            Instruction::ProductStep | Instruction::FibonacciStep => 2,
            Instruction::PartialSumStep(_) => 4,
            Instruction::MatrixStep => 5,
            Instruction::ConvergentStep => 7,
            Instruction::Theorem { arity, .. } => *arity,
        }
    }
}

/// A witness expression in postfix form.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program(pub Vec<Instruction>);

/// A postfix program that does not describe exactly one expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProgramError(pub String);

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed witness program: {}", self.0)
    }
}

impl std::error::Error for ProgramError {}

impl WitnessExpr {
    pub fn sum_step(inner: WitnessExpr) -> WitnessExpr {
        WitnessExpr::SumStep(Box::new(inner))
    }

    pub fn ordering_step(inner: WitnessExpr) -> WitnessExpr {
        WitnessExpr::OrderingStep(Box::new(inner))
    }

    pub fn tick(inner: WitnessExpr) -> WitnessExpr {
        WitnessExpr::Tick(Box::new(inner))
    }

    pub fn group(inner: WitnessExpr) -> WitnessExpr {
        WitnessExpr::Group(Box::new(inner))
    }

    pub fn product_step(mul: WitnessExpr, add: WitnessExpr) -> WitnessExpr {
        WitnessExpr::ProductStep {
            mul: Box::new(mul),
            add: Box::new(add),
        }
    }

    pub fn theorem(theorem: Theorem, args: Vec<WitnessExpr>) -> WitnessExpr {
        WitnessExpr::Theorem { theorem, args }
    }

    /// The instruction for this node, and its children in argument order.
    fn split(&self) -> (Instruction, Vec<&WitnessExpr>) {
        use WitnessExpr as E;
        match self {
            E::Nat(n) => (Instruction::Nat(*n), vec![]),
            E::Int(i) => (Instruction::Int(*i), vec![]),
            E::Ref(name) => (Instruction::Ref(name.clone()), vec![]),
            E::ChainPoint { chain, multiplier } => (
                Instruction::ChainPoint {
                    chain: chain.clone(),
                    multiplier: *multiplier,
                },
                vec![],
            ),
            E::SumBase(n) => (Instruction::SumBase(*n), vec![]),
            E::SumStep(inner) => (Instruction::SumStep, vec![inner]),
            E::ProductBase(n) => (Instruction::ProductBase(*n), vec![]),
            E::ProductStep { mul, add } => (Instruction::ProductStep, vec![mul, add]),
            E::FlatBase(n) => (Instruction::FlatBase(*n), vec![]),
            E::Tick(inner) => (Instruction::Tick, vec![inner]),
            E::Group(inner) => (Instruction::Group, vec![inner]),
            E::OrderingBase(n) => (Instruction::OrderingBase(*n), vec![]),
            E::OrderingStep(inner) => (Instruction::OrderingStep, vec![inner]),
            E::FibonacciBase => (Instruction::FibonacciBase, vec![]),
            E::FibonacciStep { state, sum } => (Instruction::FibonacciStep, vec![state, sum]),
            E::ConvergentBase(n) => (Instruction::ConvergentBase(*n), vec![]),
            E::ConvergentStep {
                prev,
                p_times_b,
                prev_p_times_a,
                q_times_b,
                prev_q_times_a,
                numerator,
                denominator,
            } => (
                Instruction::ConvergentStep,
                vec![
                    prev,
                    p_times_b,
                    prev_p_times_a,
                    q_times_b,
                    prev_q_times_a,
                    numerator,
                    denominator,
                ],
            ),
            E::PartialSumBase => (Instruction::PartialSumBase, vec![]),
            E::PartialSumStep {
                sign,
                prev,
                p_times_d,
                q_times_d,
                numerator,
            } => (
                Instruction::PartialSumStep(*sign),
                vec![prev, p_times_d, q_times_d, numerator],
            ),
            E::MatrixBase(n) => (Instruction::MatrixBase(*n), vec![]),
            E::MatrixStep {
                prev,
                a_times_m,
                b_times_m,
                top_left,
                top_right,
            } => (
                Instruction::MatrixStep,
                vec![prev, a_times_m, b_times_m, top_left, top_right],
            ),
            E::Theorem { theorem, args } => (
                Instruction::Theorem {
                    theorem: *theorem,
                    arity: args.len(),
                },
                args.iter().collect(),
            ),
        }
    }

    /// Flattens the tree into postfix order without recursing.
    pub fn to_program(&self) -> Program {
        enum Frame<'e> {
            Visit(&'e WitnessExpr),
            Emit(Instruction),
        }
        let mut output = Vec::new();
        let mut stack = vec![Frame::Visit(self)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Emit(instruction) => output.push(instruction),
                Frame::Visit(expr) => {
                    let (instruction, children) = expr.split();
                    stack.push(Frame::Emit(instruction));
                    for child in children.into_iter().rev() {
                        stack.push(Frame::Visit(child));
                    }
                }
            }
        }
        Program(output)
    }

    /// Rebuilds a tree from a postfix program.
    pub fn from_program(program: &Program) -> Result<WitnessExpr, ProgramError> {
        let mut stack: Vec<WitnessExpr> = Vec::new();
        for (index, instruction) in program.0.iter().enumerate() {
            let arity = instruction.arity();
            if stack.len() < arity {
                return Err(ProgramError(format!(
                    "instruction {} needs {} arguments but only {} are available",
                    index,
                    arity,
                    stack.len()
                )));
            }
            let args = stack.split_off(stack.len() - arity);
            stack.push(WitnessExpr::assemble(instruction, args)?);
        }
        let result = stack.pop();
        match (result, stack.len()) {
            (Some(expr), 0) => Ok(expr),
            (None, _) => Err(ProgramError("the program is empty".to_string())),
            (Some(_), rest) => Err(ProgramError(format!("{} values are left over", rest + 1))),
        }
    }

    /// Builds one node from an instruction and exactly `arity` arguments.
    fn assemble(
        instruction: &Instruction,
        args: Vec<WitnessExpr>,
    ) -> Result<WitnessExpr, ProgramError> {
        use WitnessExpr as E;
        if args.len() != instruction.arity() {
            return Err(ProgramError(format!(
                "{:?} takes {} arguments, not {}",
                instruction,
                instruction.arity(),
                args.len()
            )));
        }
        if let Instruction::Theorem { theorem, .. } = instruction {
            return Ok(E::Theorem {
                theorem: *theorem,
                args,
            });
        }
        let mut args = args.into_iter().map(Box::new);
        let mut next = || {
            args.next()
                .ok_or_else(|| ProgramError(format!("{:?} ran out of arguments", instruction)))
        };
        Ok(match instruction {
            Instruction::Nat(n) => E::Nat(*n),
            Instruction::Int(i) => E::Int(*i),
            Instruction::Ref(name) => E::Ref(name.clone()),
            Instruction::ChainPoint { chain, multiplier } => E::ChainPoint {
                chain: chain.clone(),
                multiplier: *multiplier,
            },
            Instruction::SumBase(n) => E::SumBase(*n),
            Instruction::SumStep => E::SumStep(next()?),
            Instruction::ProductBase(n) => E::ProductBase(*n),
            Instruction::ProductStep => E::ProductStep {
                mul: next()?,
                add: next()?,
            },
            Instruction::FlatBase(n) => E::FlatBase(*n),
            Instruction::Tick => E::Tick(next()?),
            Instruction::Group => E::Group(next()?),
            Instruction::OrderingBase(n) => E::OrderingBase(*n),
            Instruction::OrderingStep => E::OrderingStep(next()?),
            Instruction::FibonacciBase => E::FibonacciBase,
            Instruction::FibonacciStep => E::FibonacciStep {
                state: next()?,
                sum: next()?,
            },
            Instruction::ConvergentBase(n) => E::ConvergentBase(*n),
            Instruction::ConvergentStep => E::ConvergentStep {
                prev: next()?,
                p_times_b: next()?,
                prev_p_times_a: next()?,
                q_times_b: next()?,
                prev_q_times_a: next()?,
                numerator: next()?,
                denominator: next()?,
            },
            Instruction::PartialSumBase => E::PartialSumBase,
            Instruction::PartialSumStep(sign) => E::PartialSumStep {
                sign: *sign,
                prev: next()?,
                p_times_d: next()?,
                q_times_d: next()?,
                numerator: next()?,
            },
            Instruction::MatrixBase(n) => E::MatrixBase(*n),
            Instruction::MatrixStep => E::MatrixStep {
                prev: next()?,
                a_times_m: next()?,
                b_times_m: next()?,
                top_left: next()?,
                top_right: next()?,
            },
            Instruction::Theorem { .. } => unreachable!("theorems are assembled above"),
        })
    }

    /// The number of constructor applications in this expression.
    pub fn size(&self) -> usize {
        self.to_program().0.len()
    }

    /// Every declaration name this expression refers to, in postfix order.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                WitnessExpr::Ref(name) => names.push(name.as_str()),
                WitnessExpr::ChainPoint { chain, .. } => names.push(chain.as_str()),
                _ => stack.extend(expr.split().1.into_iter().rev()),
            }
        }
        names
    }

    /// Counts how many times the same unary constructor is stacked on top of this node.
    /// Returns the constructor name, the count, and the innermost different node.
    fn unary_run(&self) -> Option<(&'static str, usize, &WitnessExpr)> {
        let (name, mut inner) = match self {
            WitnessExpr::SumStep(inner) => ("SumStep", inner.as_ref()),
            WitnessExpr::Tick(inner) => ("Tick", inner.as_ref()),
            WitnessExpr::OrderingStep(inner) => ("OrderingStep", inner.as_ref()),
            _ => return None,
        };
        let mut count = 1;
        loop {
            let next = match (name, inner) {
                ("SumStep", WitnessExpr::SumStep(next))
                | ("Tick", WitnessExpr::Tick(next))
                | ("OrderingStep", WitnessExpr::OrderingStep(next)) => next.as_ref(),
                _ => break,
            };
            count += 1;
            inner = next;
        }
        Some((name, count, inner))
    }

    fn pretty_ref<'a, D, A>(&'a self, allocator: &'a D, depth: usize) -> DocBuilder<'a, D, A>
    where
        A: 'a,
        D: DocAllocator<'a, A>,
    {
        use WitnessExpr as E;

        if depth > MAX_RENDER_DEPTH {
            return allocator.text("...");
        }
        let child = |expr: &'a WitnessExpr| expr.pretty_ref(allocator, depth + 1);

        // Runs of the same unary step print as one application with an exponent.
        if let Some((name, count, inner)) = self.unary_run() {
            let name = if count == 1 {
                name.to_string()
            } else {
                format!("{}^{}", name, count)
            };
            return call(allocator, name, vec![child(inner)]);
        }

        let nat = |n: &Natural| allocator.text(n.to_string());
        let children = |name: &'a str| {
            let args = self.split().1.into_iter().map(child).collect();
            call(allocator, name, args)
        };
        match self {
            E::Nat(n) => nat(n),
            E::Int(i) => allocator.text(i.to_string()),
            E::Ref(name) => allocator.text(name.clone()),
            E::ChainPoint { chain, multiplier } => {
                allocator.text(format!("{}[{}]", chain, multiplier))
            }
            E::SumBase(n) => call(allocator, "SumBase", vec![nat(n)]),
            E::ProductBase(n) => call(allocator, "ProductBase", vec![nat(n)]),
            E::FlatBase(n) => call(allocator, "FlatBase", vec![nat(n)]),
            E::OrderingBase(n) => call(allocator, "OrderingBase", vec![nat(n)]),
            E::ConvergentBase(n) => call(allocator, "ConvergentBase", vec![nat(n)]),
            E::MatrixBase(n) => call(allocator, "MatrixBase", vec![nat(n)]),
            E::FibonacciBase => allocator.text("FibonacciBase"),
            E::PartialSumBase => allocator.text("PartialSumBase"),
            E::Group(inner) => call(allocator, "Group", vec![child(inner.as_ref())]),
            E::PartialSumStep { sign, .. } => children(match sign {
                Sign::Add => "PartialSumAdd",
                Sign::Sub => "PartialSumSub",
            }),
            E::ProductStep { .. } => children("ProductStep"),
            E::FibonacciStep { .. } => children("FibonacciStep"),
            E::ConvergentStep { .. } => children("ConvergentStep"),
            E::MatrixStep { .. } => children("MatrixStep"),
            E::Theorem { theorem, .. } => children(theorem.name()),
            E::SumStep(_) | E::Tick(_) | E::OrderingStep(_) => allocator.nil(),
        }
    }

    /// Detaches every direct child, leaving leaves in their place.
    fn take_children(&mut self) -> Vec<WitnessExpr> {
        use WitnessExpr as E;
        let boxes: Vec<&mut Box<WitnessExpr>> = match self {
            E::SumStep(inner) | E::Tick(inner) | E::Group(inner) | E::OrderingStep(inner) => {
                vec![inner]
            }
            E::ProductStep { mul, add } => vec![mul, add],
            E::FibonacciStep { state, sum } => vec![state, sum],
            E::ConvergentStep {
                prev,
                p_times_b,
                prev_p_times_a,
                q_times_b,
                prev_q_times_a,
                numerator,
                denominator,
            } => vec![
                prev,
                p_times_b,
                prev_p_times_a,
                q_times_b,
                prev_q_times_a,
                numerator,
                denominator,
            ],
            E::PartialSumStep {
                prev,
                p_times_d,
                q_times_d,
                numerator,
                ..
            } => vec![prev, p_times_d, q_times_d, numerator],
            E::MatrixStep {
                prev,
                a_times_m,
                b_times_m,
                top_left,
                top_right,
            } => vec![prev, a_times_m, b_times_m, top_left, top_right],
            E::Theorem { args, .. } => return std::mem::take(args),
            _ => return vec![],
        };
        boxes
            .into_iter()
            .map(|child| std::mem::replace(child.as_mut(), E::Nat(Natural::ZERO)))
            .collect()
    }
}

impl Drop for WitnessExpr {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut expr) = pending.pop() {
            pending.append(&mut expr.take_children());
        }
    }
}

impl Clone for WitnessExpr {
    fn clone(&self) -> Self {
        match WitnessExpr::from_program(&self.to_program()) {
            Ok(expr) => expr,
            Err(e) => panic!("a flattened expression did not rebuild: {}", e),
        }
    }
}

impl PartialEq for WitnessExpr {
    fn eq(&self, other: &Self) -> bool {
        self.to_program() == other.to_program()
    }
}

impl fmt::Debug for WitnessExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("WitnessExpr")
            .field(&self.to_program().0)
            .finish()
    }
}

impl Serialize for WitnessExpr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_program().serialize(serializer)
    }
}

/// `name(arg, arg, ...)`, breaking after the parenthesis when it does not fit.
fn call<'a, D, A>(
    allocator: &'a D,
    name: impl Into<String>,
    args: Vec<DocBuilder<'a, D, A>>,
) -> DocBuilder<'a, D, A>
where
    A: 'a,
    D: DocAllocator<'a, A>,
{
    let mut list = allocator.nil();
    for (i, arg) in args.into_iter().enumerate() {
        if i > 0 {
            list = list.append(allocator.text(",")).append(allocator.line());
        }
        list = list.append(arg);
    }
    allocator
        .text(name.into())
        .append(allocator.text("("))
        .append(
            allocator
                .line_()
                .append(list)
                .nest(INDENT),
        )
        .append(allocator.line_())
        .append(allocator.text(")"))
        .group()
}

impl<'a, D, A> Pretty<'a, D, A> for &'a WitnessExpr
where
    A: 'a,
    D: DocAllocator<'a, A>,
{
    fn pretty(self, allocator: &'a D) -> DocBuilder<'a, D, A> {
        self.pretty_ref(allocator, 0)
    }
}

impl fmt::Display for WitnessExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let allocator = pretty::Arena::<()>::new();
        let doc = self.pretty_ref(&allocator, 0);
        doc.render_fmt(PRINT_WIDTH, f)?;
        Ok(())
    }
}

impl TryFrom<Program> for WitnessExpr {
    type Error = ProgramError;

    fn try_from(program: Program) -> Result<WitnessExpr, ProgramError> {
        WitnessExpr::from_program(&program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: u64) -> Natural {
        Natural::new(value)
    }

    fn sum_chain(left: u64, right: u64) -> WitnessExpr {
        let mut expr = WitnessExpr::SumBase(n(left));
        for _ in 0..right {
            expr = WitnessExpr::sum_step(expr);
        }
        expr
    }

    #[test]
    fn test_program_is_postfix() {
        let expr = WitnessExpr::product_step(WitnessExpr::ProductBase(n(2)), sum_chain(0, 2));
        assert_eq!(
            expr.to_program().0,
            vec![
                Instruction::ProductBase(n(2)),
                Instruction::SumBase(n(0)),
                Instruction::SumStep,
                Instruction::SumStep,
                Instruction::ProductStep,
            ]
        );
        assert_eq!(WitnessExpr::from_program(&expr.to_program()).unwrap(), expr);
    }

    #[test]
    fn test_long_chain_survives_json() {
        // serde_json limits nesting depth, which the postfix form never hits.
        let expr = sum_chain(1, 2000);
        let json = serde_json::to_string(&expr).unwrap();
        let back: WitnessExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn test_malformed_programs() {
        let underflow = Program(vec![Instruction::SumStep]);
        assert!(WitnessExpr::from_program(&underflow).is_err());
        let leftover = Program(vec![Instruction::Nat(n(1)), Instruction::Nat(n(2))]);
        let err = WitnessExpr::from_program(&leftover).unwrap_err();
        assert_eq!(err.0, "2 values are left over");
        assert!(WitnessExpr::from_program(&Program(vec![])).is_err());

        let short_theorem = Program(vec![
            Instruction::Nat(n(1)),
            Instruction::Theorem {
                theorem: Theorem::Commute,
                arity: 2,
            },
        ]);
        let err = WitnessExpr::from_program(&short_theorem).unwrap_err();
        assert!(err.0.starts_with("instruction 1 needs 2 arguments"));
    }

    #[test]
    fn test_deep_chains_clone_compare_and_drop_without_recursing() {
        let expr = sum_chain(0, 200_000);
        let copy = expr.clone();
        assert_eq!(copy, expr);
        assert_ne!(copy, sum_chain(0, 199_999));
        drop(copy);

        let mut product = WitnessExpr::ProductBase(n(1));
        for i in 0..200_000 {
            product = WitnessExpr::product_step(product, WitnessExpr::Ref(format!("S{}", i)));
        }
        assert_eq!(product.size(), 400_001);
        drop(product);
    }

    #[test]
    fn test_deep_nesting_renders_with_an_ellipsis() {
        let mut product = WitnessExpr::ProductBase(n(1));
        for _ in 0..100 {
            product = WitnessExpr::product_step(product, WitnessExpr::Nat(n(0)));
        }
        let text = product.to_string();
        assert!(text.starts_with("ProductStep("));
        assert!(text.contains("..."));
        assert!(!text.contains("ProductBase"));
    }

    #[test]
    fn test_arguments_are_comma_separated() {
        let step = WitnessExpr::product_step(WitnessExpr::ProductBase(n(2)), sum_chain(0, 2));
        assert_eq!(step.to_string(), "ProductStep(ProductBase(2), SumStep^2(SumBase(0)))");
    }

    #[test]
    fn test_display_collapses_runs() {
        assert_eq!(sum_chain(3, 4).to_string(), "SumStep^4(SumBase(3))");
        let point = WitnessExpr::ChainPoint {
            chain: "_Mul2".to_string(),
            multiplier: n(3),
        };
        assert_eq!(point.to_string(), "_Mul2[3]");
        let theorem = WitnessExpr::theorem(Theorem::MulLeftZero, vec![WitnessExpr::Nat(n(3))]);
        assert_eq!(theorem.to_string(), "MulLeftZero(3)");
    }

    #[test]
    fn test_references() {
        let expr = WitnessExpr::FibonacciStep {
            state: Box::new(WitnessExpr::Ref("FIB0".to_string())),
            sum: Box::new(sum_chain(0, 1)),
        };
        assert_eq!(expr.references(), vec!["FIB0"]);
        assert_eq!(expr.size(), 4);
    }
}
