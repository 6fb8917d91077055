use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use walkdir::WalkDir;

use crate::certificate::{Certificate, CertificateStore};
use crate::manifest::Manifest;

/// Certificates from a build, keyed by container, plus the manifest of request hashes.
#[derive(Debug, Default)]
pub struct BuildCache {
    cache: HashMap<String, CertificateStore>,

    pub manifest: Manifest,
}

impl BuildCache {
    pub fn new() -> Self {
        BuildCache {
            cache: HashMap::new(),
            manifest: Manifest::new(),
        }
    }

    /// Load a build cache from a directory containing JSONL files
    pub fn load(directory: &Path) -> Self {
        let mut cache = HashMap::new();

        if directory.exists() {
            for entry in WalkDir::new(directory).into_iter().filter_map(Result::ok) {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("jsonl") {
                    if let Some((container, cert_store)) = CertificateStore::load_relative(path) {
                        cache.insert(container, cert_store);
                    }
                }
            }
        }

        BuildCache {
            cache,
            manifest: Manifest::load_or_create(directory),
        }
    }

    pub fn insert(&mut self, container: &str, certificates: CertificateStore) {
        self.cache.insert(container.to_string(), certificates);
    }

    pub fn get_certificate(&self, container: &str) -> Option<&Certificate> {
        self.cache.get(container)?.find(container)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Writes one `{container}.jsonl` per container, then the manifest.
    pub fn save(&self, directory: &Path) -> Result<(), Box<dyn Error>> {
        std::fs::create_dir_all(directory)?;
        for (container, cert_store) in &self.cache {
            let path = directory.join(format!("{}.jsonl", container));
            cert_store.save(&path)?;
        }
        self.manifest.save(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{emit, ProofKind, Request};
    use crate::manifest::request_hash;
    use tempfile::tempdir;

    #[test]
    fn test_build_cache_round_trip() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let build_dir = temp_dir.path().join("build");

        let request = Request::new("Sum", ProofKind::Addition { left: 2, right: 3 });
        let cert = emit(&request, 4096).unwrap();
        let mut cache = BuildCache::new();
        cache.insert("Sum", CertificateStore { certs: vec![cert.clone()] });
        cache.manifest.insert("Sum", request_hash(&request));
        cache.save(&build_dir).unwrap();

        let loaded = BuildCache::load(&build_dir);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get_certificate("Sum"), Some(&cert));
        assert!(loaded.manifest.matches_entry("Sum", request_hash(&request)));
        assert!(loaded.get_certificate("Missing").is_none());
    }

    #[test]
    fn test_missing_directory_loads_empty() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let cache = BuildCache::load(&temp_dir.path().join("nothing"));
        assert!(cache.is_empty());
        assert!(cache.manifest.is_empty());
    }
}
