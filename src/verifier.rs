use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::debug;

use crate::builder::{BuildEvent, BuildMetrics, BuildStatus, Builder};
use crate::certificate::{Certificate, CertificateStore};
use crate::checker::{check_all, Checker};
use crate::emitter::Request;
use crate::kernel::{ConstraintError, Natural, Witness, WitnessKind};
use crate::project::{ConfigOverride, Project, ProjectConfig};

/// Why a certificate was not accepted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VerificationError {
    // A constructor's side condition failed while rebuilding a declaration.
    Constraint {
        declaration: String,
        error: ConstraintError,
    },

    // A constructor was applied to the wrong kinds of witness.
    IllTyped {
        declaration: String,
        constructor: &'static str,
        found: Vec<WitnessKind>,
    },

    // A reference to a name that has not been declared yet.
    UnknownReference { declaration: String, name: String },

    DuplicateDeclaration(String),

    // A chain point past the end of its chain.
    ChainPoint {
        declaration: String,
        chain: String,
        multiplier: Natural,
        length: Natural,
    },

    // An assertion read a field the witness does not have.
    MissingField { reference: String, kind: WitnessKind },

    Malformed { declaration: String, message: String },

    // Two witnesses that should match structurally do not.
    Mismatch {
        call_site: String,
        left: String,
        right: String,
    },
}

impl VerificationError {
    pub fn error_type(&self) -> &'static str {
        match self {
            VerificationError::Constraint { .. } => "Constraint",
            VerificationError::IllTyped { .. } => "IllTyped",
            VerificationError::UnknownReference { .. } => "UnknownReference",
            VerificationError::DuplicateDeclaration(_) => "DuplicateDeclaration",
            VerificationError::ChainPoint { .. } => "ChainPoint",
            VerificationError::MissingField { .. } => "MissingField",
            VerificationError::Malformed { .. } => "Malformed",
            VerificationError::Mismatch { .. } => "Mismatch",
        }
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VerificationError::Constraint { declaration, error } => {
                write!(f, "in {}: {}", declaration, error)
            }
            VerificationError::IllTyped {
                declaration,
                constructor,
                found,
            } => {
                let kinds: Vec<String> = found.iter().map(|k| k.to_string()).collect();
                write!(
                    f,
                    "in {}: {} cannot take ({})",
                    declaration,
                    constructor,
                    kinds.join(", ")
                )
            }
            VerificationError::UnknownReference { declaration, name } => {
                write!(f, "in {}: '{}' is not declared before this point", declaration, name)
            }
            VerificationError::DuplicateDeclaration(name) => {
                write!(f, "'{}' is declared more than once", name)
            }
            VerificationError::ChainPoint {
                declaration,
                chain,
                multiplier,
                length,
            } => write!(
                f,
                "in {}: {} only reaches {}, not {}",
                declaration, chain, length, multiplier
            ),
            VerificationError::MissingField { reference, kind } => {
                write!(f, "{}: a {} witness has no such field", reference, kind)
            }
            VerificationError::Malformed {
                declaration,
                message,
            } => write!(f, "in {}: {}", declaration, message),
            VerificationError::Mismatch {
                call_site,
                left,
                right,
            } => write!(f, "{}: {} does not match {}", call_site, left, right),
        }
    }
}

impl std::error::Error for VerificationError {}

/// Whether two witnesses have the same kind and the same fields.
/// Integers compare by value.
pub fn structurally_equal(left: &Witness, right: &Witness) -> bool {
    match (left, right) {
        (Witness::Integer(a), Witness::Integer(b)) => a.to_i128() == b.to_i128(),
        _ => left.kind() == right.kind() && left.fields() == right.fields(),
    }
}

/// Accepts silently on a structural match. Otherwise reports the call site.
pub fn assert_structural_equal(
    call_site: &str,
    left: &Witness,
    right: &Witness,
) -> Result<(), VerificationError> {
    if structurally_equal(left, right) {
        return Ok(());
    }
    Err(VerificationError::Mismatch {
        call_site: call_site.to_string(),
        left: left.to_string(),
        right: right.to_string(),
    })
}

/// The trapping form of `assert_structural_equal`, for invariants that no input can break.
/// Panics on mismatch.
pub fn runtime_assert_equal(left: &Witness, right: &Witness) {
    if !structurally_equal(left, right) {
        panic!("runtime assertion failed: {} does not match {}", left, right);
    }
}

/// Rebuilds every declaration of a certificate, then runs its verification routine.
/// No theorem may induct over more than `max_chain_length` units.
pub fn verify_certificate(
    cert: &Certificate,
    max_chain_length: u64,
) -> Result<Checker, VerificationError> {
    let checker = check_all(&cert.declarations, max_chain_length)?;
    if let Some(routine) = &cert.verification {
        for (i, assertion) in routine.assertions.iter().enumerate() {
            let left = checker.field(&assertion.left)?;
            let right = checker.field(&assertion.right)?;
            let call_site = format!(
                "{}.{}[{}] ({} == {})",
                cert.container, routine.name, i, assertion.left, assertion.right
            );
            assert_structural_equal(
                &call_site,
                &Witness::Natural(left),
                &Witness::Natural(right),
            )?;
        }
    }
    debug!(
        container = %cert.container,
        declarations = checker.len(),
        assertions = cert.assertion_count(),
        "verified"
    );
    Ok(checker)
}

/// Output from running the verifier
#[derive(Debug)]
pub struct VerifierOutput {
    /// The overall build status
    pub status: BuildStatus,

    /// Build metrics collected during verification
    pub metrics: BuildMetrics,

    /// All build events collected during verification
    pub events: Vec<BuildEvent>,
}

impl VerifierOutput {
    /// How many certificates were verified.
    pub fn num_verified(&self) -> usize {
        self.events.iter().filter(|e| e.verified.is_some()).count()
    }

    pub fn is_success(&self) -> bool {
        self.status == BuildStatus::Good
    }
}

/// Where the verifier gets its certificates from.
#[derive(Clone, Debug)]
pub enum Target {
    /// One request, expanded and verified without touching the disk.
    Request(Request),

    /// A JSON file of requests, expanded and verified.
    Requests(PathBuf),

    /// A JSONL file of stored certificates, verified from scratch.
    Certificates(PathBuf),
}

/// The Verifier manages the run of a single build.
pub struct Verifier {
    target: Target,

    /// Settings that override the project configuration.
    overrides: ConfigOverride,

    /// Print each certificate as it is verified.
    pub verbose: bool,

    /// Whether cached certificates with a matching request hash are reused.
    pub check_hashes: bool,
}

impl Verifier {
    pub fn new(target: Target, overrides: ConfigOverride) -> Self {
        Self {
            target,
            overrides,
            verbose: false,
            check_hashes: true,
        }
    }

    fn config(&self) -> ProjectConfig {
        let mut config = ProjectConfig::default();
        self.overrides.apply(&mut config);
        config
    }

    /// Returns VerifierOutput on success, or an error string if the input could not be loaded.
    pub fn run(&self) -> Result<VerifierOutput, String> {
        let project = match &self.target {
            Target::Request(request) => Project::single(request.clone(), self.config()),
            Target::Requests(path) => {
                Project::load(path, &self.overrides).map_err(|e| format!("Error: {}", e))?
            }
            Target::Certificates(_) => {
                let mut config = self.config();
                config.read_cache = false;
                config.write_cache = false;
                Project::new(config)
            }
        };

        // Collect events as they happen, and print the log messages.
        let events = Rc::new(RefCell::new(Vec::new()));
        let events_clone = events.clone();
        let verbose = self.verbose;
        let mut builder = Builder::new(&project, move |event: BuildEvent| {
            if let Some(m) = &event.log_message {
                println!("{}", m);
            }
            if verbose {
                if let Some(text) = &event.rendered {
                    println!("{}", text);
                }
            }
            events_clone.borrow_mut().push(event);
        });
        builder.render = self.verbose;
        builder.check_hashes = self.check_hashes;

        match &self.target {
            Target::Request(_) | Target::Requests(_) => builder.build(),
            Target::Certificates(path) => {
                let store = CertificateStore::load(path)
                    .map_err(|e| format!("Error: cannot load {}: {}", path.display(), e))?;
                builder.reverify(&store);
            }
        }
        builder.metrics.print(builder.status);

        let status = builder.status;
        let metrics = builder.metrics.clone();
        drop(builder);
        Ok(VerifierOutput {
            status,
            metrics,
            events: events.take(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{emit, ProofKind};
    use crate::kernel::witness::{ProductWitness, SumWitness};
    use crate::kernel::Integer;

    fn n(value: u64) -> Natural {
        Natural::new(value)
    }

    #[test]
    fn test_structural_equality() {
        let composed = Witness::Product(ProductWitness::chain(n(3), n(2)).unwrap());
        let flat = Witness::Product(ProductWitness::flat_chain(n(3), n(2)).unwrap());
        assert!(assert_structural_equal("here", &composed, &flat).is_ok());

        let sum = Witness::Sum(SumWitness::chain(n(3), n(3)).unwrap());
        let err = assert_structural_equal("here", &composed, &sum).unwrap_err();
        assert_eq!(
            err.to_string(),
            "here: Product(Left: 3, Right: 2, Total: 6) does not match Sum(Left: 3, Right: 3, Total: 6)"
        );

        let a = Witness::Integer(Integer::from_i64(-3));
        let b = Witness::Integer(Integer::from_i64(-3));
        assert!(structurally_equal(&a, &b));
        assert!(!structurally_equal(&a, &Witness::Integer(Integer::from_i64(3))));
    }

    #[test]
    #[should_panic(expected = "runtime assertion failed")]
    fn test_runtime_assert_traps() {
        runtime_assert_equal(&Witness::Natural(n(1)), &Witness::Natural(n(2)));
    }

    #[test]
    fn test_tampered_assertion_is_caught() {
        let request = Request::new("Golden", ProofKind::GoldenRatio { depth: 2 });
        let mut cert = emit(&request, 4096).unwrap();
        assert!(verify_certificate(&cert, 4096).is_ok());

        let routine = cert.verification.as_mut().unwrap();
        let first = &mut routine.assertions[0];
        first.right.declaration = "FIB2".to_string();
        let err = verify_certificate(&cert, 4096).unwrap_err();
        assert_eq!(err.error_type(), "Mismatch");
        assert!(err
            .to_string()
            .starts_with("Golden.verify_golden_ratio[0] (CF0.P == FIB2.Next)"));
    }

    #[test]
    fn test_long_chains_emit_store_and_reverify() {
        let limit = 1_000_000;
        let request = Request::new(
            "Long",
            ProofKind::Addition {
                left: 1,
                right: 200_000,
            },
        );
        let cert = emit(&request, limit).unwrap();
        let checker = verify_certificate(&cert, limit).unwrap();
        assert_eq!(checker.len(), 3);

        let line = serde_json::to_string(&cert).unwrap();
        let stored: Certificate = serde_json::from_str(&line).unwrap();
        assert!(verify_certificate(&stored, limit).is_ok());
        assert_eq!(stored.clone().declarations, cert.declarations);

        // The same certificate is rejected under a tighter limit.
        let err = verify_certificate(&stored, 1000).unwrap_err();
        assert_eq!(err.error_type(), "Constraint");
    }
}
