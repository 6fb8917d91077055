use std::fmt;

use regex::Regex;

/// Where a diagnostic points: a container, and the parameter within it if there is one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    pub container: String,
    pub parameter: Option<&'static str>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.parameter {
            Some(parameter) => write!(f, "{}.{}", self.container, parameter),
            None => write!(f, "{}", self.container),
        }
    }
}

/// The input rules that every generator invocation is checked against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rule {
    DepthAtLeastOne,
    MultiplierAtLeastTwo,
    LeftOperandAtLeastTwo,
    DepthWithinLimit,
    ChainWithinLimit,
    ContainerName,
}

impl Rule {
    /// Each rule has exactly one message.
    pub fn message(&self) -> &'static str {
        match self {
            Rule::DepthAtLeastOne => "depth must be at least 1",
            Rule::MultiplierAtLeastTwo => "multiplier must be at least 2",
            Rule::LeftOperandAtLeastTwo => {
                "left operand must be at least 2; 0 and 1 have dedicated base-case witnesses"
            }
            Rule::DepthWithinLimit => "depth must not exceed the maximum chain length",
            Rule::ChainWithinLimit => "a witness chain would exceed the configured maximum length",
            Rule::ContainerName => "container name must be an identifier",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub rule: Rule,
    pub location: Location,
}

impl Diagnostic {
    pub fn message(&self) -> &'static str {
        self.rule.message()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message())
    }
}

/// A request that failed validation. Nothing was emitted for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collects diagnostics for one container.
/// Each parameter reports at most one problem, the first rule it breaks.
pub struct Validator {
    container: String,
    diagnostics: Vec<Diagnostic>,
    max_chain_length: u64,
}

impl Validator {
    pub fn new(container: &str, max_chain_length: u64) -> Validator {
        let mut validator = Validator {
            container: container.to_string(),
            diagnostics: vec![],
            max_chain_length,
        };
        let identifier =
            Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").map_or(false, |re| re.is_match(container));
        if !identifier {
            validator.report(Rule::ContainerName, None);
        }
        validator
    }

    fn report(&mut self, rule: Rule, parameter: Option<&'static str>) {
        self.diagnostics.push(Diagnostic {
            rule,
            location: Location {
                container: self.container.clone(),
                parameter,
            },
        });
    }

    pub fn depth(&mut self, depth: u64) {
        if depth < 1 {
            self.report(Rule::DepthAtLeastOne, Some("depth"));
        } else if depth > self.max_chain_length {
            self.report(Rule::DepthWithinLimit, Some("depth"));
        }
    }

    pub fn multiplier(&mut self, multiplier: u64) {
        if multiplier < 2 {
            self.report(Rule::MultiplierAtLeastTwo, Some("multiplier"));
        }
    }

    pub fn left_operand(&mut self, left: u64) {
        if left < 2 {
            self.report(Rule::LeftOperandAtLeastTwo, Some("left_operand"));
        }
    }

    /// Checks a value that some chain will count up to.
    pub fn chain(&mut self, length: u64, parameter: &'static str) {
        let already = self
            .diagnostics
            .iter()
            .any(|d| d.rule == Rule::ChainWithinLimit);
        if length > self.max_chain_length && !already {
            self.report(Rule::ChainWithinLimit, Some(parameter));
        }
    }

    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                diagnostics: self.diagnostics,
            })
        }
    }
}
