use std::collections::HashMap;

use tracing::trace;

use crate::certificate::{Declaration, FieldRef};
use crate::expression::{Instruction, WitnessExpr};
use crate::kernel::witness::{
    Convergent, ConvergentStep, FibonacciState, Matrix2x2, OrderingWitness, ProductWitness,
    RationalPartialSum, SumWitness,
};
use crate::kernel::{ConstraintError, Natural, Witness};
use crate::project::DEFAULT_MAX_CHAIN_LENGTH;
use crate::verifier::VerificationError;

/// The checker rebuilds witnesses from emitted expressions, one declaration at a time.
///
/// Every witness is rebuilt through the kernel constructors, so a declaration is accepted only
/// if every side condition holds. Nothing from the emitter's arithmetic is trusted. A reference
/// must name a declaration that was checked earlier.
#[derive(Clone, Debug)]
pub struct Checker {
    bindings: HashMap<String, Witness>,

    // Declaration names in the order they were checked.
    order: Vec<String>,

    // The most units a theorem may induct over.
    max_chain_length: u64,
}

impl Default for Checker {
    fn default() -> Self {
        Checker::with_limit(DEFAULT_MAX_CHAIN_LENGTH)
    }
}

impl Checker {
    pub fn new() -> Self {
        Checker::default()
    }

    pub fn with_limit(max_chain_length: u64) -> Self {
        Checker {
            bindings: HashMap::new(),
            order: vec![],
            max_chain_length,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Checks a declaration and binds its witness.
    pub fn declare(&mut self, decl: &Declaration) -> Result<&Witness, VerificationError> {
        if self.bindings.contains_key(&decl.name) {
            return Err(VerificationError::DuplicateDeclaration(decl.name.clone()));
        }
        let witness = self.elaborate(&decl.name, &decl.expr)?;
        trace!(name = %decl.name, witness = %witness, "checked");
        self.order.push(decl.name.clone());
        Ok(self.bindings.entry(decl.name.clone()).or_insert(witness))
    }

    pub fn get(&self, name: &str) -> Option<&Witness> {
        self.bindings.get(name)
    }

    /// The bound witnesses, in the order they were declared.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Witness)> {
        self.order
            .iter()
            .filter_map(move |name| self.bindings.get(name).map(|w| (name.as_str(), w)))
    }

    /// Reads one field of a bound witness.
    pub fn field(&self, field_ref: &FieldRef) -> Result<Natural, VerificationError> {
        let witness = self.get(&field_ref.declaration).ok_or_else(|| {
            VerificationError::UnknownReference {
                declaration: field_ref.to_string(),
                name: field_ref.declaration.clone(),
            }
        })?;
        witness
            .field(field_ref.field)
            .ok_or_else(|| VerificationError::MissingField {
                reference: field_ref.to_string(),
                kind: witness.kind(),
            })
    }

    /// Rebuilds the witness an expression describes.
    /// Runs the postfix form on an explicit stack, so long chains do not recurse.
    pub fn elaborate(
        &self,
        declaration: &str,
        expr: &WitnessExpr,
    ) -> Result<Witness, VerificationError> {
        let program = expr.to_program();
        let mut stack: Vec<Witness> = Vec::new();
        for instruction in &program.0 {
            let arity = instruction.arity();
            if stack.len() < arity {
                return Err(VerificationError::Malformed {
                    declaration: declaration.to_string(),
                    message: format!("{:?} is missing arguments", instruction),
                });
            }
            let args = stack.split_off(stack.len() - arity);
            let witness = self.apply(declaration, instruction, &args)?;
            stack.push(witness);
        }
        match (stack.pop(), stack.is_empty()) {
            (Some(witness), true) => Ok(witness),
            _ => Err(VerificationError::Malformed {
                declaration: declaration.to_string(),
                message: "the expression does not describe exactly one witness".to_string(),
            }),
        }
    }

    fn lookup(&self, declaration: &str, name: &str) -> Result<&Witness, VerificationError> {
        self.get(name)
            .ok_or_else(|| VerificationError::UnknownReference {
                declaration: declaration.to_string(),
                name: name.to_string(),
            })
    }

    /// Applies one constructor to already elaborated arguments.
    fn apply(
        &self,
        declaration: &str,
        instruction: &Instruction,
        args: &[Witness],
    ) -> Result<Witness, VerificationError> {
        let constraint = |error: ConstraintError| VerificationError::Constraint {
            declaration: declaration.to_string(),
            error,
        };
        let ill_typed = |constructor: &'static str| VerificationError::IllTyped {
            declaration: declaration.to_string(),
            constructor,
            found: args.iter().map(|a| a.kind()).collect(),
        };

        use Witness as W;
        let witness = match (instruction, args) {
            (Instruction::Nat(n), []) => W::Natural(*n),
            (Instruction::Int(i), []) => W::Integer(*i),
            (Instruction::Ref(name), []) => *self.lookup(declaration, name)?,
            (Instruction::ChainPoint { chain, multiplier }, []) => {
                self.chain_point(declaration, chain, *multiplier)?
            }
            (Instruction::SumBase(n), []) => W::Sum(SumWitness::base(*n)),
            (Instruction::SumStep, [W::Sum(s)]) => W::Sum(s.step().map_err(constraint)?),
            (Instruction::SumStep, _) => return Err(ill_typed("SumStep")),
            (Instruction::ProductBase(n), []) => W::Product(ProductWitness::base(*n)),
            (Instruction::ProductStep, [W::Product(mul), W::Sum(add)]) => {
                W::Product(ProductWitness::step(mul, add).map_err(constraint)?)
            }
            (Instruction::ProductStep, _) => return Err(ill_typed("ProductStep")),
            (Instruction::FlatBase(n), []) => W::Product(ProductWitness::flat_base(*n)),
            (Instruction::Tick, [W::Product(p)]) => W::Product(p.tick().map_err(constraint)?),
            (Instruction::Tick, _) => return Err(ill_typed("Tick")),
            (Instruction::Group, [W::Product(p)]) => W::Product(p.group().map_err(constraint)?),
            (Instruction::Group, _) => return Err(ill_typed("Group")),
            (Instruction::OrderingBase(n), []) => {
                W::Ordering(OrderingWitness::base(*n).map_err(constraint)?)
            }
            (Instruction::OrderingStep, [W::Ordering(o)]) => {
                W::Ordering(o.step().map_err(constraint)?)
            }
            (Instruction::OrderingStep, _) => return Err(ill_typed("OrderingStep")),
            (Instruction::FibonacciBase, []) => W::Fibonacci(FibonacciState::base()),
            (Instruction::FibonacciStep, [W::Fibonacci(state), W::Sum(sum)]) => {
                W::Fibonacci(state.step(sum).map_err(constraint)?)
            }
            (Instruction::FibonacciStep, _) => return Err(ill_typed("FibonacciStep")),
            (Instruction::ConvergentBase(b0), []) => W::Convergent(Convergent::base(*b0)),
            (
                Instruction::ConvergentStep,
                [W::Convergent(prev), W::Product(p_times_b), W::Product(prev_p_times_a), W::Product(q_times_b), W::Product(prev_q_times_a), W::Sum(numerator), W::Sum(denominator)],
            ) => {
                let parts = ConvergentStep {
                    p_times_b: *p_times_b,
                    prev_p_times_a: *prev_p_times_a,
                    q_times_b: *q_times_b,
                    prev_q_times_a: *prev_q_times_a,
                    numerator: *numerator,
                    denominator: *denominator,
                };
                W::Convergent(prev.step(&parts).map_err(constraint)?)
            }
            (Instruction::ConvergentStep, _) => return Err(ill_typed("ConvergentStep")),
            (Instruction::PartialSumBase, []) => W::PartialSum(RationalPartialSum::base()),
            (
                Instruction::PartialSumStep(sign),
                [W::PartialSum(prev), W::Product(p_times_d), W::Product(q_times_d), W::Sum(numerator)],
            ) => W::PartialSum(
                prev.step(*sign, p_times_d, q_times_d, numerator)
                    .map_err(constraint)?,
            ),
            (Instruction::PartialSumStep(_), _) => return Err(ill_typed("PartialSumStep")),
            (Instruction::MatrixBase(b0), []) => W::Matrix(Matrix2x2::base(*b0)),
            (
                Instruction::MatrixStep,
                [W::Matrix(prev), W::Product(a_times_m), W::Product(b_times_m), W::Sum(top_left), W::Sum(top_right)],
            ) => W::Matrix(
                prev.step(a_times_m, b_times_m, top_left, top_right)
                    .map_err(constraint)?,
            ),
            (Instruction::MatrixStep, _) => return Err(ill_typed("MatrixStep")),
            (Instruction::Theorem { theorem, .. }, args) => {
                theorem.apply(args, self.max_chain_length).map_err(constraint)?
            }
            (_, _) => {
                return Err(VerificationError::Malformed {
                    declaration: declaration.to_string(),
                    message: format!("{:?} takes no arguments", instruction),
                })
            }
        };
        Ok(witness)
    }

    /// The point `multiplier` inside a declared product chain.
    /// Walks back from the end of the chain with the product eliminator.
    fn chain_point(
        &self,
        declaration: &str,
        chain: &str,
        multiplier: Natural,
    ) -> Result<Witness, VerificationError> {
        let mut product = match self.lookup(declaration, chain)? {
            Witness::Product(p) => *p,
            other => {
                return Err(VerificationError::IllTyped {
                    declaration: declaration.to_string(),
                    constructor: "ChainPoint",
                    found: vec![other.kind()],
                })
            }
        };
        let length = product.right();
        while product.right() > multiplier {
            match product.invert() {
                Some((previous, _)) => product = previous,
                None => break,
            }
        }
        if product.right() != multiplier {
            return Err(VerificationError::ChainPoint {
                declaration: declaration.to_string(),
                chain: chain.to_string(),
                multiplier,
                length,
            });
        }
        Ok(Witness::Product(product))
    }
}

/// Elaborates a list of declarations in order.
pub fn check_all(
    declarations: &[Declaration],
    max_chain_length: u64,
) -> Result<Checker, VerificationError> {
    let mut checker = Checker::with_limit(max_chain_length);
    for decl in declarations {
        checker.declare(decl)?;
    }
    Ok(checker)
}
