use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use assert_fs::TempDir;

use crate::certificate::{Certificate, FieldRef};
use crate::checker::Checker;
use crate::emitter::{emit, ProofKind, Request};
use crate::error::Error;
use crate::kernel::Field;
use crate::project::DEFAULT_MAX_CHAIN_LENGTH;
use crate::verifier::verify_certificate;

/// Emits a certificate and expects the verifier to accept it.
pub fn certify(container: &str, proof: ProofKind) -> (Certificate, Checker) {
    let request = Request::new(container, proof);
    let cert = match emit(&request, DEFAULT_MAX_CHAIN_LENGTH) {
        Ok(cert) => cert,
        Err(e) => panic!("emit failed: {}", e),
    };
    let checker = match verify_certificate(&cert, DEFAULT_MAX_CHAIN_LENGTH) {
        Ok(checker) => checker,
        Err(e) => panic!("verification failed: {}", e),
    };
    (cert, checker)
}

/// Reads a field of a declared witness.
pub fn value(checker: &Checker, declaration: &str, field: Field) -> u64 {
    match checker.field(&FieldRef::new(declaration, field)) {
        Ok(n) => n.get(),
        Err(e) => panic!("{}", e),
    }
}

/// Expects the request to be rejected by validation, and returns the diagnostic lines.
pub fn rejection(container: &str, proof: ProofKind, max_chain_length: u64) -> Vec<String> {
    match emit(&Request::new(container, proof), max_chain_length) {
        Err(Error::Validation(e)) => e.diagnostics.iter().map(|d| d.to_string()).collect(),
        Err(e) => panic!("expected a validation error, got {}", e),
        Ok(cert) => panic!("expected a rejection, got {} declarations", cert.declarations.len()),
    }
}

/// Creates a project directory with a request file in it.
/// Close the directory after use to clean up.
pub fn setup(requests: &str) -> (TempDir, ChildPath) {
    let temp = TempDir::new().unwrap();
    let file = temp.child("requests.json");
    file.write_str(requests).unwrap();
    (temp, file)
}
