//! Manifest generation for pass bundles
//!
//! Generates the `manifest.json` mapping of every bundle member to the hex digest
//! of its bytes. The signature covers the exact serialized bytes, so the
//! serialization must be stable across runs.

use super::staging::{is_manifest_excluded, member_name, MANIFEST_FILE};
use crate::{Error, Result};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Digest used for manifest entries.
///
/// The wallet verifier expects SHA-1; SHA-256 is available for consumers that
/// accept it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestDigest {
    #[default]
    Sha1,
    Sha256,
}

impl ManifestDigest {
    /// Hex-encoded digest of `data`.
    pub fn hex(self, data: &[u8]) -> String {
        match self {
            ManifestDigest::Sha1 => hex::encode(Sha1::digest(data)),
            ManifestDigest::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}

impl std::str::FromStr for ManifestDigest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(ManifestDigest::Sha1),
            "sha256" | "sha-256" => Ok(ManifestDigest::Sha256),
            other => Err(Error::Config(format!("unknown manifest digest: {}", other))),
        }
    }
}

/// Deterministic mapping from member name to content digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse a serialized manifest.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_slice(data)?;
        Ok(Self { entries })
    }

    /// Serialized bytes; identical input always yields identical output.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.entries)?)
    }

    /// Write `manifest.json` into `dir` and return its path.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        fs::write(&path, self.to_bytes()?)?;
        Ok(path)
    }

    pub fn get(&self, member: &str) -> Option<&str> {
        self.entries.get(member).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for the manifest of a staged bundle
pub struct ManifestBuilder {
    /// Staging root
    root: PathBuf,
    /// Digest algorithm for every entry
    digest: ManifestDigest,
}

impl ManifestBuilder {
    /// Create a manifest builder for the given staging directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            digest: ManifestDigest::default(),
        }
    }

    /// Select the digest algorithm
    pub fn digest(mut self, digest: ManifestDigest) -> Self {
        self.digest = digest;
        self
    }

    /// Walk the staging directory and hash every eligible member.
    ///
    /// Fails on the first unreadable file; nothing is written in that case.
    pub fn scan(&self) -> Result<Manifest> {
        let mut entries = BTreeMap::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1)
        {
            let entry = entry.map_err(|e| io::Error::other(format!("Failed to walk staging directory: {}", e)))?;
            let file_type = entry.file_type();

            if file_type.is_dir() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Failed to compute relative path"))?;
            let name = member_name(relative);
            if is_manifest_excluded(&name) {
                continue;
            }

            if file_type.is_symlink() {
                return Err(Error::Manifest(format!("symlinks cannot be bundled: {}", name)));
            }

            let data = fs::read(entry.path())?;
            entries.insert(name, self.digest.hex(&data));
        }

        Ok(Manifest { entries })
    }

    /// Scan and write `manifest.json` into the staging directory
    pub fn build(&self) -> Result<Manifest> {
        let manifest = self.scan()?;
        manifest.write_to(&self.root)?;
        tracing::debug!(entries = manifest.len(), "manifest written");
        Ok(manifest)
    }
}
