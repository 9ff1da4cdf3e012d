//! Error types for pass generation.
//!
//! This module defines the [`enum@Error`] enum covering every failure that can
//! stop a pass run: precondition problems found while configuring the run
//! (credentials, template), and the stage-fatal failures raised while a
//! recipient is being generated, reported through [`Error::Stage`].
//!
//! Recoverable photo problems are modelled separately by [`ImageError`] and are
//! handled inside the thumbnail stage; only the fatal kinds are lifted into
//! [`enum@Error`].
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use crate::pass::Stage;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error type for pass generation.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
///
/// # Examples
///
/// ```no_run
/// use pkpass::{Error, PassBuilder};
///
/// let result = PassBuilder::new()
///     .template_dir("wallet_pass")
///     .private_key("certificates/key.pem")
///     .certificate("certificates/certificate.pem")
///     .authority_certificate("certificates/wwdr.pem")
///     .build();
/// match result {
///     Ok(_) => println!("Ready"),
///     Err(Error::MissingCredentials(msg)) => eprintln!("{msg}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Occurs when reading staged members, writing the manifest, signature or
    /// archive, or preparing a staging directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive operation failed.
    ///
    /// See the [`crate::pass::archive`] module.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Credential files are missing or were never configured.
    ///
    /// The message names every missing path and how to fix it.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The pass template is missing or lacks a required key path.
    #[error("Template error: {0}")]
    Template(String),

    /// The staged bundle cannot be described by a manifest.
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// The signing operation failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The external signing process did not exit in time and was killed.
    #[error("Signing timed out after {}s", .0.as_secs())]
    SigningTimeout(Duration),

    /// Invalid or malformed certificate or private key.
    #[error("Invalid certificate: {0}")]
    Certificate(String),

    /// Invalid builder configuration or recipient record.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Thumbnail processing failed in a way that cannot be degraded.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// A pipeline stage failed while generating one recipient's pass.
    ///
    /// Always stage-fatal, whatever the kind of the underlying error.
    #[error("{filename}: {stage} stage failed: {source}")]
    Stage {
        filename: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification of an [`enum@Error`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Detected before any recipient was processed.
    Precondition,
    /// Raised by a pipeline stage; aborts the whole run.
    StageFatal,
}

impl Error {
    /// Returns whether this error was raised before processing started.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::MissingCredentials(_) | Error::Template(_) | Error::Config(_) => {
                ErrorClass::Precondition
            }
            _ => ErrorClass::StageFatal,
        }
    }

    /// The innermost error, looking through [`Error::Stage`] wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Failure while normalizing a recipient photo.
///
/// Only [`ImageError::Undecodable`] is eligible for the raw-copy fallback;
/// [`ImageError::SourceMissing`] means no thumbnail is produced at all.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The source photo does not exist.
    #[error("photo not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The source photo exists but cannot be decoded as an image.
    #[error("cannot decode {}: {source}", .path.display())]
    Undecodable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// PNG encoding of the normalized thumbnail failed.
    #[error("cannot encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    /// Reading the source or writing a thumbnail slot failed.
    #[error("thumbnail I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class() {
        assert_eq!(
            Error::MissingCredentials("x".into()).class(),
            ErrorClass::Precondition
        );
        assert_eq!(Error::Template("x".into()).class(), ErrorClass::Precondition);
        assert_eq!(Error::Signing("x".into()).class(), ErrorClass::StageFatal);
        assert_eq!(
            Error::SigningTimeout(Duration::from_secs(5)).class(),
            ErrorClass::StageFatal
        );
    }

    #[test]
    fn test_stage_wrapper_is_fatal() {
        let err = Error::Stage {
            filename: "BenElfvin".into(),
            stage: Stage::Render,
            source: Box::new(Error::Template("missing key path generic.primaryFields".into())),
        };
        assert_eq!(err.class(), ErrorClass::StageFatal);
        assert!(matches!(err.root_cause(), Error::Template(_)));
        assert_eq!(
            err.to_string(),
            "BenElfvin: render stage failed: Template error: missing key path generic.primaryFields"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::SigningTimeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "Signing timed out after 60s");
    }
}
