use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{fmt, io};

use serde::Deserialize;
use tracing::{debug, info};

use crate::build_cache::BuildCache;
use crate::certificate::Certificate;
use crate::emitter::Request;
use crate::manifest::request_hash;

/// The Project holds the requests to build and the last known-good build cache.
pub struct Project {
    // Flags that affect project behavior
    pub config: ProjectConfig,

    // The generator invocations, in the order they were listed.
    pub requests: Vec<Request>,

    // The last known-good build cache.
    // This is different from the Builder's build cache, which is created during a build.
    pub build_cache: BuildCache,
}

/// Configuration options for the project.
#[derive(Clone, Debug)]
pub struct ProjectConfig {
    // The longest single sum, product or ordering chain the emitter may produce.
    pub max_chain_length: u64,

    // Whether we should read from the cache
    pub read_cache: bool,

    // Whether we should write to the cache
    pub write_cache: bool,

    // Where certificates and the manifest are stored.
    // A relative path is taken relative to the request file.
    pub build_dir: PathBuf,
}

pub const DEFAULT_MAX_CHAIN_LENGTH: u64 = 4096;

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            read_cache: true,
            write_cache: true,
            build_dir: PathBuf::from("build"),
        }
    }
}

/// Settings that replace the defaults when present.
/// Used both for the `config` object of a request file and for command-line flags.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverride {
    pub max_chain_length: Option<u64>,
    pub read_cache: Option<bool>,
    pub write_cache: Option<bool>,
    pub build_dir: Option<PathBuf>,
}

impl ConfigOverride {
    pub fn apply(&self, config: &mut ProjectConfig) {
        if let Some(max) = self.max_chain_length {
            config.max_chain_length = max;
        }
        if let Some(read) = self.read_cache {
            config.read_cache = read;
        }
        if let Some(write) = self.write_cache {
            config.write_cache = write;
        }
        if let Some(dir) = &self.build_dir {
            config.build_dir = dir.clone();
        }
    }
}

/// The on-disk shape of a request file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestFile {
    #[serde(default)]
    config: Option<ConfigOverride>,

    requests: Vec<Request>,
}

// General project-level errors (file operations, setup, etc.)
#[derive(Debug)]
pub struct ProjectError(pub String);

impl From<io::Error> for ProjectError {
    fn from(error: io::Error) -> Self {
        ProjectError(format!("{}", error))
    }
}

impl From<serde_json::Error> for ProjectError {
    fn from(error: serde_json::Error) -> Self {
        ProjectError(format!("invalid request file: {}", error))
    }
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ProjectError {}

impl From<ProjectError> for String {
    fn from(error: ProjectError) -> Self {
        error.0
    }
}

impl Project {
    /// A project with no requests.
    pub fn new(config: ProjectConfig) -> Project {
        let build_cache = if config.read_cache {
            BuildCache::load(&config.build_dir)
        } else {
            BuildCache::new()
        };
        Project {
            config,
            requests: Vec::new(),
            build_cache,
        }
    }

    /// A project that builds a single request without touching the disk.
    pub fn single(request: Request, mut config: ProjectConfig) -> Project {
        config.read_cache = false;
        config.write_cache = false;
        let mut project = Project::new(config);
        project.requests.push(request);
        project
    }

    /// Loads a request file.
    /// Its `config` object overrides the defaults, and `overrides` overrides both.
    pub fn load(path: &Path, overrides: &ConfigOverride) -> Result<Project, ProjectError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProjectError(format!("cannot read {}: {}", path.display(), e)))?;
        let file: RequestFile = serde_json::from_str(&text)?;

        let mut config = ProjectConfig::default();
        if let Some(from_file) = &file.config {
            from_file.apply(&mut config);
        }
        overrides.apply(&mut config);
        if config.build_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.build_dir = parent.join(&config.build_dir);
            }
        }

        let mut seen = HashSet::new();
        for request in &file.requests {
            if !seen.insert(request.container.as_str()) {
                return Err(ProjectError(format!(
                    "container {} is requested more than once",
                    request.container
                )));
            }
        }

        info!(
            path = %path.display(),
            requests = file.requests.len(),
            build_dir = %config.build_dir.display(),
            "loaded project"
        );
        let mut project = Project::new(config);
        project.requests = file.requests;
        Ok(project)
    }

    /// The cached certificate for a request, if the manifest says it is up to date.
    pub fn find_cert(&self, request: &Request) -> Option<&Certificate> {
        let hash = request_hash(request);
        if !self
            .build_cache
            .manifest
            .matches_entry(&request.container, hash)
        {
            return None;
        }
        let cert = self.build_cache.get_certificate(&request.container)?;
        if cert.proof != request.proof {
            debug!(container = %request.container, "cached certificate is for another proof");
            return None;
        }
        Some(cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::ProofKind;
    use std::io::Write;
    use tempfile::tempdir;

    fn write(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("requests.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_config_precedence() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{
                "config": {"max_chain_length": 100, "write_cache": false},
                "requests": [{"container": "Fib", "kind": "fibonacci", "depth": 3}]
            }"#,
        );
        let overrides = ConfigOverride {
            max_chain_length: Some(50),
            ..ConfigOverride::default()
        };
        let project = Project::load(&path, &overrides).unwrap();
        assert_eq!(project.config.max_chain_length, 50);
        assert!(!project.config.write_cache);
        assert!(project.config.read_cache);
        assert_eq!(project.config.build_dir, dir.path().join("build"));
        assert_eq!(
            project.requests,
            vec![Request::new("Fib", ProofKind::Fibonacci { depth: 3 })]
        );
    }

    #[test]
    fn test_duplicate_containers_rejected() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{"requests": [
                {"container": "A", "kind": "fibonacci", "depth": 3},
                {"container": "A", "kind": "golden_ratio", "depth": 3}
            ]}"#,
        );
        let err = Project::load(&path, &ConfigOverride::default()).err().unwrap();
        assert_eq!(err.to_string(), "container A is requested more than once");
    }

    #[test]
    fn test_unknown_config_key_rejected() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), r#"{"config": {"depth": 3}, "requests": []}"#);
        let err = Project::load(&path, &ConfigOverride::default()).err().unwrap();
        assert!(err.to_string().starts_with("invalid request file"));
    }

    #[test]
    fn test_single_project_skips_cache() {
        let project = Project::single(
            Request::new("Sum", ProofKind::Addition { left: 1, right: 2 }),
            ProjectConfig::default(),
        );
        assert!(!project.config.read_cache);
        assert!(!project.config.write_cache);
        assert!(project.build_cache.is_empty());
        assert_eq!(project.requests.len(), 1);
    }
}
