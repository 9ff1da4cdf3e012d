//! Staged pass bundle handling.
//!
//! This module provides functionality to:
//! - Prepare an isolated staging directory per recipient
//! - Walk the staged bundle and hash every member
//! - Serialize the `manifest.json` that the signature covers
//!
//! # Reserved Members
//!
//! | Name | Produced by |
//! |------|-------------|
//! | `pass.json` | template rendering |
//! | `thumbnail.png`, `thumbnail@2x.png` | [`crate::thumbnail`] |
//! | `manifest.json` | [`ManifestBuilder`] |
//! | `signature` | [`crate::crypto::sign_manifest`] |
//!
//! # Examples
//!
//! ```no_run
//! use pkpass::bundle::{ManifestBuilder, StagingDirectory};
//!
//! let staging = StagingDirectory::prepare("wallet_pass")?;
//! let manifest = ManifestBuilder::new(staging.path()).build()?;
//! println!("{} members", manifest.len());
//! # Ok::<(), pkpass::Error>(())
//! ```

pub mod manifest;
pub mod staging;

pub use manifest::{Manifest, ManifestBuilder, ManifestDigest};
pub use staging::StagingDirectory;
