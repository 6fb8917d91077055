use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::emitter::Request;

/// A newtype wrapper for hex-encoded hashes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexHash(String);

impl HexHash {
    /// Create a HexHash from a blake3::Hash
    pub fn new(hash: blake3::Hash) -> Self {
        HexHash(hash.to_hex().to_string())
    }

    /// Get the underlying hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HexHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hashes the canonical JSON form of a request.
/// Two requests hash the same exactly when they would emit the same certificate.
pub fn request_hash(request: &Request) -> blake3::Hash {
    // Serializing a plain struct of strings and integers does not fail.
    let json = serde_json::to_string(request).unwrap_or_default();
    blake3::hash(json.as_bytes())
}

/// The manifest maps each container to the hash of the request that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Version of the manifest format
    pub version: u32,

    pub containers: BTreeMap<String, HexHash>,
}

impl Manifest {
    /// Create a new empty manifest with the current version
    pub fn new() -> Self {
        Manifest {
            version: 1,
            containers: BTreeMap::new(),
        }
    }

    /// Add or update a container hash in the manifest
    pub fn insert(&mut self, container: &str, hash: blake3::Hash) {
        self.containers
            .insert(container.to_string(), HexHash::new(hash));
    }

    /// Check if an entry matches the given container and hash
    pub fn matches_entry(&self, container: &str, hash: blake3::Hash) -> bool {
        match self.containers.get(container) {
            Some(stored_hash) => stored_hash == &HexHash::new(hash),
            None => false,
        }
    }

    /// Check if a container exists in the manifest (regardless of hash)
    pub fn contains(&self, container: &str) -> bool {
        self.containers.contains_key(container)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Save the manifest to manifest.json in the build directory atomically.
    /// Writes to a temporary file first, then renames it over the target.
    pub fn save(&self, build_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let path = build_dir.join("manifest.json");
        let json = serde_json::to_string_pretty(&self)?;

        let temp_path = build_dir.join(".manifest.json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Load a manifest from manifest.json in the build directory
    pub fn load(build_dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let path = build_dir.join("manifest.json");
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let manifest = serde_json::from_str(&contents)?;
        Ok(manifest)
    }

    /// Load a manifest from the build directory, or create a new one if it doesn't exist
    pub fn load_or_create(build_dir: &Path) -> Self {
        match Self::load(build_dir) {
            Ok(manifest) => manifest,
            Err(_) => Self::new(),
        }
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}
