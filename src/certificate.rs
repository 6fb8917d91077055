use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::emitter::ProofKind;
use crate::expression::WitnessExpr;
use crate::kernel::Field;

/// A witness expression bound to a name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub expr: WitnessExpr,
}

impl Declaration {
    pub fn new(name: impl Into<String>, expr: WitnessExpr) -> Declaration {
        Declaration {
            name: name.into(),
            expr,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "let {} = {}", self.name, self.expr)
    }
}

/// One field of a declared witness, like `CF1.P`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldRef {
    pub declaration: String,
    pub field: Field,
}

impl FieldRef {
    pub fn new(declaration: impl Into<String>, field: Field) -> FieldRef {
        FieldRef {
            declaration: declaration.into(),
            field,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.declaration, self.field)
    }
}

/// An equality between fields of two independently built witnesses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assertion {
    pub left: FieldRef,
    pub right: FieldRef,
}

impl Assertion {
    pub fn new(left: FieldRef, right: FieldRef) -> Assertion {
        Assertion { left, right }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "assert {} == {}", self.left, self.right)
    }
}

/// The assertions a multi-depth proof checks once all its declarations exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationRoutine {
    pub name: String,
    pub assertions: Vec<Assertion>,
}

/// Everything one generator invocation produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Certificate {
    /// The container the declarations live in.
    pub container: String,

    /// The invocation that produced this certificate.
    pub proof: ProofKind,

    /// In dependency order. A declaration only refers to earlier ones.
    pub declarations: Vec<Declaration>,

    /// None for single-fact proofs, which have nothing to compare.
    pub verification: Option<VerificationRoutine>,
}

impl Certificate {
    pub fn assertion_count(&self) -> usize {
        self.verification
            .as_ref()
            .map_or(0, |routine| routine.assertions.len())
    }

    /// The certificate as source text, one declaration per line.
    pub fn render(&self) -> String {
        let mut lines = vec![format!("container {} {{", self.container)];
        for decl in &self.declarations {
            for (i, line) in decl.to_string().lines().enumerate() {
                let indent = if i == 0 { "  " } else { "    " };
                lines.push(format!("{}{}", indent, line));
            }
        }
        if let Some(routine) = &self.verification {
            lines.push(format!("  verify {} {{", routine.name));
            for assertion in &routine.assertions {
                lines.push(format!("    {}", assertion));
            }
            lines.push("  }".to_string());
        }
        lines.push("}".to_string());
        lines.join("\n")
    }
}

/// A collection of certificates that can be saved to a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateStore {
    pub certs: Vec<Certificate>,
}

impl CertificateStore {
    /// Load a certificate store from a file in JSONL format (one certificate per line)
    pub fn load(filename: &Path) -> Result<CertificateStore, Box<dyn Error>> {
        let file = File::open(filename)?;
        let reader = BufReader::new(file);
        let mut certs = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                let cert: Certificate = serde_json::from_str(&line)?;
                certs.push(cert);
            }
        }

        Ok(CertificateStore { certs })
    }

    /// Save the certificate store to a file in JSONL format (one certificate per line)
    pub fn save(&self, filename: &Path) -> Result<(), Box<dyn Error>> {
        let file = File::create(filename)?;
        let mut writer = BufWriter::new(file);

        for cert in &self.certs {
            let json = serde_json::to_string(cert)?;
            writeln!(writer, "{}", json)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Loads a store, if the filename is a .jsonl file.
    /// The container name is the file stem.
    pub fn load_relative(full_filename: &Path) -> Option<(String, CertificateStore)> {
        if full_filename.extension()? != "jsonl" {
            return None;
        }
        let container = full_filename.file_stem()?.to_string_lossy().to_string();
        let store = CertificateStore::load(full_filename).ok()?;
        Some((container, store))
    }

    pub fn find(&self, container: &str) -> Option<&Certificate> {
        self.certs.iter().find(|cert| cert.container == container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Natural;
    use tempfile::tempdir;

    fn sample(container: &str) -> Certificate {
        Certificate {
            container: container.to_string(),
            proof: ProofKind::Addition { left: 2, right: 3 },
            declarations: vec![Declaration::new(
                "_Sum",
                WitnessExpr::sum_step(WitnessExpr::SumBase(Natural::new(2))),
            )],
            verification: Some(VerificationRoutine {
                name: "verify".to_string(),
                assertions: vec![Assertion::new(
                    FieldRef::new("_Sum", Field::Total),
                    FieldRef::new("_Swap", Field::Total),
                )],
            }),
        }
    }

    #[test]
    fn test_save_load_cycle() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("Sums.jsonl");

        let original = CertificateStore {
            certs: vec![sample("Sums"), sample("Other")],
        };
        original.save(&file_path).unwrap();
        let loaded = CertificateStore::load(&file_path).unwrap();
        assert_eq!(original, loaded);

        let (container, relative) = CertificateStore::load_relative(&file_path).unwrap();
        assert_eq!(container, "Sums");
        assert_eq!(relative.certs.len(), 2);
        assert!(relative.find("Other").is_some());
    }

    #[test]
    fn test_render() {
        let text = sample("Sums").render();
        assert_eq!(
            text,
            "container Sums {\n  let _Sum = SumStep(SumBase(2))\n  verify verify {\n    assert _Sum.Total == _Swap.Total\n  }\n}"
        );
    }
}
