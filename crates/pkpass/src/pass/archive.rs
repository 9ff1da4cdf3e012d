//! Pass archive creation.
//!
//! Packages a staged bundle into a `.pkpass` (ZIP) archive whose member names
//! are exactly the manifest keys, plus `manifest.json` and `signature`.
//!
//! # Features
//!
//! - Configurable compression via [`CompressionLevel`]
//! - Deterministic member order and timestamps
//! - Atomic output: the archive only appears under its final name once complete
//!
//! # Examples
//!
//! ```no_run
//! use pkpass::pass::{create_pkpass, CompressionLevel};
//!
//! create_pkpass("staging", "BenElfvin.pkpass", CompressionLevel::DEFAULT)?;
//! # Ok::<(), pkpass::Error>(())
//! ```

use crate::bundle::staging::{is_platform_junk, member_name};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// ZIP compression level for pass creation.
///
/// # Examples
///
/// ```
/// use pkpass::pass::CompressionLevel;
///
/// let custom = CompressionLevel::new(3);
/// assert_eq!(custom.level(), 3);
/// assert_eq!(CompressionLevel::new(42).level(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// No compression (level 0), members are stored.
    pub const NONE: CompressionLevel = CompressionLevel(0);

    /// Default deflate level (6).
    pub const DEFAULT: CompressionLevel = CompressionLevel(6);

    /// Maximum deflate level (9).
    pub const MAX: CompressionLevel = CompressionLevel(9);

    /// Creates a compression level from 0-9.
    ///
    /// Values greater than 9 are clamped to 9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        CompressionLevel(level.min(9))
    }

    /// Returns the compression level value (0-9).
    #[must_use]
    pub fn level(&self) -> u32 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for CompressionLevel {
    fn from(level: u32) -> Self {
        CompressionLevel::new(level)
    }
}

/// Creates a pass archive from a staged bundle directory.
///
/// Members are named by their path relative to `staging_dir`, with `/`
/// separators and no leading directory. Only regular files are stored;
/// platform junk is skipped, as is `output_path` if it lies inside the
/// staging directory.
///
/// The archive is written to `<output>.partial` and renamed on success.
///
/// # Errors
///
/// Returns [`Error::Io`] if the staging directory doesn't exist or any file
/// cannot be read, and [`Error::Zip`] if the archive cannot be written.
pub fn create_pkpass(
    staging_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    compression_level: CompressionLevel,
) -> Result<PathBuf> {
    let staging_dir = staging_dir.as_ref();
    let output_path = output_path.as_ref();

    if !staging_dir.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Staging directory not found: {}", staging_dir.display()),
        )));
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let partial_path = partial_path(output_path);
    let result = write_archive(staging_dir, output_path, &partial_path, compression_level);

    match result {
        Ok(()) => {
            fs::rename(&partial_path, output_path)?;
            Ok(output_path.to_path_buf())
        }
        Err(e) => {
            let _ = fs::remove_file(&partial_path);
            Err(e)
        }
    }
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

fn write_archive(
    staging_dir: &Path,
    output_path: &Path,
    partial_path: &Path,
    compression_level: CompressionLevel,
) -> Result<()> {
    let file = File::create(partial_path)?;
    let mut zip = ZipWriter::new(file);

    let skip: Vec<PathBuf> = [output_path, partial_path]
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    let options = if compression_level.level() == 0 {
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
    } else {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level.level() as i64))
    };
    let options = options.last_modified_time(DateTime::default());

    for entry in WalkDir::new(staging_dir)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = entry.map_err(|e| io::Error::other(format!("Failed to walk directory: {}", e)))?;

        if !entry.file_type().is_file() || is_platform_junk(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        if let Ok(canonical) = path.canonicalize() {
            if skip.contains(&canonical) {
                continue;
            }
        }

        let relative = path.strip_prefix(staging_dir).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Failed to compute relative path",
            ))
        })?;

        zip.start_file(member_name(relative), options)?;
        let data = fs::read(path)?;
        zip.write_all(&data)?;
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    /// Create a staged bundle with nested members.
    fn create_test_bundle(dir: &Path) -> PathBuf {
        let staging = dir.join("staging");
        fs::create_dir_all(staging.join("en.lproj")).unwrap();
        fs::write(staging.join("pass.json"), b"{}").unwrap();
        fs::write(staging.join("icon.png"), b"PNG_DATA").unwrap();
        fs::write(staging.join("manifest.json"), b"{}").unwrap();
        fs::write(staging.join("signature"), b"DER").unwrap();
        fs::write(staging.join("en.lproj/pass.strings"), b"strings").unwrap();
        fs::write(staging.join(".DS_Store"), b"junk").unwrap();
        staging
    }

    fn member_names(path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_create_pkpass_member_names() {
        let temp_dir = TempDir::new().unwrap();
        let staging = create_test_bundle(temp_dir.path());
        let output = temp_dir.path().join("out/BenElfvin.pkpass");

        let written = create_pkpass(&staging, &output, CompressionLevel::DEFAULT).unwrap();

        assert_eq!(written, output);
        assert_eq!(
            member_names(&output),
            vec!["en.lproj/pass.strings", "icon.png", "manifest.json", "pass.json", "signature"]
        );
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn test_create_pkpass_uses_deflate() {
        let temp_dir = TempDir::new().unwrap();
        let staging = create_test_bundle(temp_dir.path());
        let output = temp_dir.path().join("deflate.pkpass");

        create_pkpass(&staging, &output, CompressionLevel::DEFAULT).unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mut entry = archive.by_name("icon.png").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"PNG_DATA");
    }

    #[test]
    fn test_create_pkpass_no_compression() {
        let temp_dir = TempDir::new().unwrap();
        let staging = create_test_bundle(temp_dir.path());
        let output = temp_dir.path().join("stored.pkpass");

        create_pkpass(&staging, &output, CompressionLevel::NONE).unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.by_name("pass.json").unwrap().compression(), CompressionMethod::Stored);
    }

    #[test]
    fn test_create_pkpass_is_reproducible() {
        let temp_dir = TempDir::new().unwrap();
        let staging = create_test_bundle(temp_dir.path());
        let a = temp_dir.path().join("a.pkpass");
        let b = temp_dir.path().join("b.pkpass");

        create_pkpass(&staging, &a, CompressionLevel::DEFAULT).unwrap();
        create_pkpass(&staging, &b, CompressionLevel::DEFAULT).unwrap();

        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }

    #[test]
    fn test_output_inside_staging_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let staging = create_test_bundle(temp_dir.path());
        let output = staging.join("self.pkpass");

        create_pkpass(&staging, &output, CompressionLevel::DEFAULT).unwrap();
        // Second run sees the first archive on disk and must still skip it.
        create_pkpass(&staging, &output, CompressionLevel::DEFAULT).unwrap();

        let names = member_names(&output);
        assert!(!names.iter().any(|n| n.ends_with(".pkpass") || n.ends_with(".partial")));
    }

    #[test]
    fn test_create_pkpass_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("output.pkpass");

        let result = create_pkpass("/nonexistent/staging", &output, CompressionLevel::DEFAULT);
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_compression_level() {
        assert_eq!(CompressionLevel::NONE.level(), 0);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
        assert_eq!(CompressionLevel::MAX.level(), 9);
        assert_eq!(CompressionLevel::new(15).level(), 9); // Clamped
        assert_eq!(CompressionLevel::from(5).level(), 5);
    }
}
