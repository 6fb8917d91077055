use crate::certificate::Declaration;
use crate::emitter::ProofKind;
use crate::expression::WitnessExpr;
use crate::kernel::{Natural, Witness};
use crate::product_table::sum_chain;
use crate::project::DEFAULT_MAX_CHAIN_LENGTH;
use crate::tests::common::certify;
use crate::verifier::{runtime_assert_equal, verify_certificate, VerificationError};

#[test]
fn test_mismatch_reports_call_site() {
    let (mut cert, _) = certify("Add", ProofKind::Addition { left: 2, right: 3 });
    let direct = cert
        .declarations
        .iter_mut()
        .find(|d| d.name == "_Direct")
        .unwrap();
    *direct = Declaration::new("_Direct", sum_chain(Natural::new(3), Natural::new(3)));

    let err = verify_certificate(&cert, DEFAULT_MAX_CHAIN_LENGTH).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Add.verify_addition[1] (_Swap.Right == _Direct.Right): \
         Natural(Value: 2) does not match Natural(Value: 3)"
    );
}

#[test]
fn test_constraint_failure_names_declaration() {
    let (mut cert, _) = certify("Fib", ProofKind::Fibonacci { depth: 3 });
    let index = cert
        .declarations
        .iter()
        .position(|d| d.name == "FIB2")
        .unwrap();
    cert.declarations[index] = Declaration::new(
        "FIB2",
        WitnessExpr::FibonacciStep {
            state: Box::new(WitnessExpr::Ref("FIB1".to_string())),
            sum: Box::new(sum_chain(Natural::new(1), Natural::new(2))),
        },
    );
    match verify_certificate(&cert, DEFAULT_MAX_CHAIN_LENGTH) {
        Err(VerificationError::Constraint { declaration, error }) => {
            assert_eq!(declaration, "FIB2");
            assert_eq!(error.constructor, "FibonacciStep");
        }
        other => panic!("expected a constraint failure, got {:?}", other.err()),
    }
}

#[test]
fn test_every_declaration_is_rebuilt() {
    let (cert, checker) = certify("Golden", ProofKind::GoldenRatio { depth: 3 });
    assert_eq!(checker.len(), cert.declarations.len());
    for decl in &cert.declarations {
        let witness = checker.get(&decl.name).unwrap();
        runtime_assert_equal(witness, witness);
    }
    assert!(matches!(checker.get("CF3"), Some(Witness::Convergent(_))));
}
