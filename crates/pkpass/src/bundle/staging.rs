//! Per-recipient staging directories.
//!
//! Every recipient gets a fresh temporary directory seeded with the template's
//! static assets. Stages write into it under fixed, reserved member names, and
//! the directory is deleted once the archive has been written.

use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Rendered pass description document.
pub const PASS_JSON: &str = "pass.json";

/// Serialized digest map covered by the signature.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Detached DER signature over [`MANIFEST_FILE`].
pub const SIGNATURE_FILE: &str = "signature";

/// Base-resolution thumbnail slot.
pub const THUMBNAIL: &str = "thumbnail.png";

/// High-density thumbnail slot.
pub const THUMBNAIL_2X: &str = "thumbnail@2x.png";

/// Members produced by the pipeline itself; never seeded from the template.
pub const GENERATED_MEMBERS: [&str; 5] =
    [PASS_JSON, THUMBNAIL, THUMBNAIL_2X, MANIFEST_FILE, SIGNATURE_FILE];

/// Returns true for operating-system metadata files that must never be bundled.
pub fn is_platform_junk(file_name: &str) -> bool {
    matches!(file_name, ".DS_Store" | "Thumbs.db" | "desktop.ini") || file_name.starts_with("._")
}

/// Returns true if a member is excluded from the manifest.
///
/// Takes the root-relative member name: only the top-level `manifest.json` and
/// `signature` are reserved, so an asset such as `en.lproj/signature` is hashed
/// like any other file.
pub fn is_manifest_excluded(member: &str) -> bool {
    let file_name = member.rsplit('/').next().unwrap_or(member);
    member == MANIFEST_FILE || member == SIGNATURE_FILE || is_platform_junk(file_name)
}

/// Converts a path relative to the staging root into a member name.
///
/// Member names use `/` separators and never start with `./`, so manifest keys
/// and archive entry names share one namespace.
pub fn member_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Working root holding one recipient's in-progress bundle.
///
/// Owned by the pipeline for the duration of a single recipient; dropping it
/// removes the directory and everything in it.
pub struct StagingDirectory {
    dir: TempDir,
}

impl StagingDirectory {
    /// Creates an empty staging directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pkpass-").tempdir()?;
        Ok(Self { dir })
    }

    /// Creates a staging directory seeded with the template's static assets.
    ///
    /// Generated members and platform junk found in the template are skipped,
    /// so a stale thumbnail or signature can never leak into a new bundle.
    pub fn prepare(template_dir: impl AsRef<Path>) -> Result<Self> {
        let template_dir = template_dir.as_ref();
        if !template_dir.is_dir() {
            return Err(Error::Template(format!(
                "template directory not found: {}",
                template_dir.display()
            )));
        }

        let staging = Self::new()?;

        for entry in WalkDir::new(template_dir)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1)
        {
            let entry = entry.map_err(|e| io::Error::other(format!("Failed to walk template: {}", e)))?;
            let relative = entry
                .path()
                .strip_prefix(template_dir)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Failed to compute relative path"))?;
            let name = entry.file_name().to_string_lossy();

            if entry.file_type().is_dir() {
                fs::create_dir_all(staging.path().join(relative))?;
                continue;
            }
            if !entry.file_type().is_file() || is_platform_junk(&name) {
                continue;
            }
            if relative.parent().map_or(true, |p| p.as_os_str().is_empty())
                && GENERATED_MEMBERS.contains(&name.as_ref())
            {
                continue;
            }

            fs::copy(entry.path(), staging.path().join(relative))?;
        }

        tracing::debug!(path = %staging.path().display(), "staging directory prepared");
        Ok(staging)
    }

    /// Root of the staging directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a member inside the staging directory.
    pub fn member(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes a member under a fixed name, replacing any previous content.
    pub fn write_member(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.member(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Removes a member if present.
    pub fn remove_member(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.member(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
