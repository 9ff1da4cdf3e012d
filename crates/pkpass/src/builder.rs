//! PassBuilder API
//!
//! Provides a builder pattern interface for configuring pass generation.
//! [`PassBuilder::build`] runs the preflight checks and returns a ready
//! [`PassPipeline`].

use crate::bundle::ManifestDigest;
#[cfg(feature = "pure-rust")]
use crate::crypto::CmsSigner;
#[cfg(feature = "openssl-backend")]
use crate::crypto::OpensslSigner;
use crate::crypto::{Signer, SignerCredentials, SmimeProcessSigner, DEFAULT_SIGNING_TIMEOUT};
use crate::pass::{CompressionLevel, PassPipeline, PassTemplate};
use crate::thumbnail::DEFAULT_THUMBNAIL_SIDE;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which implementation produces the manifest signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerBackend {
    /// In-process OpenSSL (`openssl-backend` feature).
    Native,
    /// External `openssl smime` process.
    Smime,
    /// cryptographic-message-syntax (`pure-rust` feature).
    PureRust,
}

impl Default for SignerBackend {
    fn default() -> Self {
        if cfg!(feature = "openssl-backend") {
            SignerBackend::Native
        } else {
            SignerBackend::Smime
        }
    }
}

impl FromStr for SignerBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" | "openssl" => Ok(SignerBackend::Native),
            "smime" => Ok(SignerBackend::Smime),
            "pure-rust" | "pure" => Ok(SignerBackend::PureRust),
            other => Err(Error::Config(format!("unknown signer backend: {}", other))),
        }
    }
}

/// Pass generation configured with builder pattern API.
///
/// # Example
///
/// ```no_run
/// use pkpass::pass::Roster;
/// use pkpass::PassBuilder;
///
/// let pipeline = PassBuilder::new()
///     .template_dir("wallet_pass")
///     .output_dir("passes")
///     .private_key("certificates/key.pem")
///     .certificate("certificates/certificate.pem")
///     .authority_certificate("certificates/wwdr.pem")
///     .password("secret")
///     .build()?;
///
/// let roster = Roster::load("recipients.json")?;
/// for path in pipeline.generate_all(&roster)? {
///     println!("Created {}", path.display());
/// }
/// # Ok::<(), pkpass::Error>(())
/// ```
pub struct PassBuilder {
    template_dir: PathBuf,
    output_dir: PathBuf,
    credentials: SignerCredentials,
    backend: SignerBackend,
    signer: Option<Box<dyn Signer>>,
    signing_timeout: Duration,
    digest: ManifestDigest,
    thumbnail_size: u32,
    compression_level: CompressionLevel,
    extension: String,
}

impl PassBuilder {
    /// Create a new builder with the conventional working-directory layout.
    pub fn new() -> Self {
        Self {
            template_dir: PathBuf::from("wallet_pass"),
            output_dir: PathBuf::from("."),
            credentials: SignerCredentials::new(
                "certificates/key.pem",
                "certificates/certificate.pem",
                "certificates/wwdr.pem",
            ),
            backend: SignerBackend::default(),
            signer: None,
            signing_timeout: DEFAULT_SIGNING_TIMEOUT,
            digest: ManifestDigest::default(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIDE,
            compression_level: CompressionLevel::DEFAULT,
            extension: "pkpass".into(),
        }
    }

    /// Set the template directory holding `pass.json` and static assets.
    pub fn template_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.template_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the directory archives are written to.
    pub fn output_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set private key file path (PEM format).
    pub fn private_key(mut self, path: impl AsRef<Path>) -> Self {
        self.credentials.private_key = path.as_ref().to_path_buf();
        self
    }

    /// Set signer certificate file path (PEM format).
    pub fn certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.credentials.certificate = path.as_ref().to_path_buf();
        self
    }

    /// Set the authority (WWDR) certificate file path (PEM format).
    pub fn authority_certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.credentials.authority_certificate = path.as_ref().to_path_buf();
        self
    }

    /// Set password for the private key.
    ///
    /// The password is stored securely and will be zeroized when dropped.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credentials = self.credentials.password(password);
        self
    }

    pub fn backend(mut self, backend: SignerBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Use a ready-made signer instead of loading credentials.
    ///
    /// Credential paths and the backend setting are then ignored.
    pub fn signer(mut self, signer: Box<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Bound on one external signing process (smime backend only).
    pub fn signing_timeout(mut self, timeout: Duration) -> Self {
        self.signing_timeout = timeout;
        self
    }

    pub fn digest(mut self, digest: ManifestDigest) -> Self {
        self.digest = digest;
        self
    }

    /// Set thumbnail side in pixels.
    pub fn thumbnail_size(mut self, side: u32) -> Self {
        self.thumbnail_size = side;
        self
    }

    /// Set ZIP compression level for the archive (0-9).
    ///
    /// 0 = stored, 9 = maximum compression. Default is 6.
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = CompressionLevel::new(level);
        self
    }

    /// Set the archive file extension, without the dot.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Validate the builder configuration.
    ///
    /// Returns an error if:
    /// - Any credential file is missing (unless a signer was supplied)
    /// - The template directory or its `pass.json` is missing or invalid
    /// - The thumbnail size or extension is unusable
    pub fn validate(&self) -> Result<()> {
        if self.signer.is_none() {
            self.credentials.validate()?;
        }
        if !self.template_dir.is_dir() {
            return Err(Error::Template(format!(
                "template directory not found: {}",
                self.template_dir.display()
            )));
        }
        PassTemplate::load(&self.template_dir)?;

        if self.thumbnail_size == 0 {
            return Err(Error::Config("thumbnail size must be at least 1 pixel".into()));
        }
        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(Error::Config(format!("invalid archive extension: {}", self.extension)));
        }
        Ok(())
    }

    fn load_signer(&self) -> Result<Box<dyn Signer>> {
        match self.backend {
            #[cfg(feature = "openssl-backend")]
            SignerBackend::Native => Ok(Box::new(OpensslSigner::from_credentials(&self.credentials)?)),
            #[cfg(not(feature = "openssl-backend"))]
            SignerBackend::Native => Err(Error::Config(
                "native signing requires the openssl-backend feature".into(),
            )),
            SignerBackend::Smime => Ok(Box::new(
                SmimeProcessSigner::new(self.credentials.clone()).timeout(self.signing_timeout),
            )),
            #[cfg(feature = "pure-rust")]
            SignerBackend::PureRust => Ok(Box::new(CmsSigner::from_credentials(&self.credentials)?)),
            #[cfg(not(feature = "pure-rust"))]
            SignerBackend::PureRust => Err(Error::Config(
                "pure-Rust signing requires the pure-rust feature".into(),
            )),
        }
    }

    /// Run the preflight checks and create the pipeline.
    ///
    /// Nothing is written until a recipient is generated.
    pub fn build(mut self) -> Result<PassPipeline> {
        self.validate()?;

        let template = PassTemplate::load(&self.template_dir)?;
        let signer = match self.signer.take() {
            Some(signer) => signer,
            None => self.load_signer()?,
        };

        tracing::debug!(
            template = %self.template_dir.display(),
            output = %self.output_dir.display(),
            backend = ?self.backend,
            digest = ?self.digest,
            "pipeline ready"
        );

        Ok(PassPipeline {
            template_dir: self.template_dir,
            template,
            output_dir: self.output_dir,
            signer,
            digest: self.digest,
            thumbnail_side: self.thumbnail_size,
            compression_level: self.compression_level,
            extension: self.extension.trim_start_matches('.').to_string(),
        })
    }
}

impl Default for PassBuilder {
    fn default() -> Self {
        Self::new()
    }
}
