use std::fmt;

use crate::diagnostics::ValidationError;
use crate::evaluator::{AssertionFailure, EvaluationError, InlineError};
use crate::verifier::VerificationError;

/// Anything that can stop a request from producing a verified certificate.
#[derive(Debug)]
pub enum Error {
    // The request broke an input rule. Nothing was emitted.
    Validation(ValidationError),

    // The calculator could not compute the trace.
    Evaluation(EvaluationError),

    // An inline comparison did not hold.
    Assertion(AssertionFailure),

    // The emitted certificate did not check.
    Verification(VerificationError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Validation(_) => "ValidationError",
            Error::Evaluation(_) => "EvaluationError",
            Error::Assertion(_) => "AssertionFailure",
            Error::Verification(_) => "VerificationFailure",
        }
    }

    /// Bad input and rejected certificates fail a build.
    /// A request whose trace cannot be computed only leaves it unverified.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Verification(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "{}", e),
            Error::Evaluation(e) => write!(f, "{}", e),
            Error::Assertion(e) => write!(f, "{}", e),
            Error::Verification(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<EvaluationError> for Error {
    fn from(err: EvaluationError) -> Self {
        Error::Evaluation(err)
    }
}

impl From<AssertionFailure> for Error {
    fn from(err: AssertionFailure) -> Self {
        Error::Assertion(err)
    }
}

impl From<VerificationError> for Error {
    fn from(err: VerificationError) -> Self {
        Error::Verification(err)
    }
}

impl From<InlineError> for Error {
    fn from(err: InlineError) -> Self {
        match err {
            InlineError::Evaluation(e) => Error::Evaluation(e),
            InlineError::Assertion(a) => Error::Assertion(a),
        }
    }
}
