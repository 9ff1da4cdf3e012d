//! Signing credential locations.
//!
//! Credentials are supplied as three PEM files: the pass signing private key,
//! the signer certificate, and the authority (WWDR) certificate that chains the
//! signer to the trusted root. The optional key passphrase is held as a
//! [`SecretString`] and is zeroized on drop.

use crate::{Error, Result};
use secrecy::SecretString;
use std::path::{Path, PathBuf};

/// Paths to the signing key material, plus an optional key passphrase.
///
/// # Security
///
/// The passphrase is never included in `Debug` output, log lines, error
/// messages or subprocess arguments.
#[derive(Clone)]
pub struct SignerCredentials {
    /// PEM private key.
    pub private_key: PathBuf,
    /// PEM signer certificate.
    pub certificate: PathBuf,
    /// PEM authority certificate appended to the signature's chain.
    pub authority_certificate: PathBuf,
    /// Passphrase for an encrypted private key.
    pub password: Option<SecretString>,
}

impl SignerCredentials {
    pub fn new(
        private_key: impl AsRef<Path>,
        certificate: impl AsRef<Path>,
        authority_certificate: impl AsRef<Path>,
    ) -> Self {
        Self {
            private_key: private_key.as_ref().to_path_buf(),
            certificate: certificate.as_ref().to_path_buf(),
            authority_certificate: authority_certificate.as_ref().to_path_buf(),
            password: None,
        }
    }

    /// Set the private key passphrase.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Check that every credential file exists.
    ///
    /// The error lists each missing file so the user can fix all of them at once.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> = [
            ("private key", &self.private_key),
            ("signer certificate", &self.certificate),
            ("authority certificate", &self.authority_certificate),
        ]
        .iter()
        .filter(|(_, path)| !path.is_file())
        .map(|(label, path)| format!("- {} ({})", path.display(), label))
        .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(Error::MissingCredentials(format!(
            "certificates not found. Place your signing material at:\n{}",
            missing.join("\n")
        )))
    }
}

impl std::fmt::Debug for SignerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerCredentials")
            .field("private_key", &self.private_key)
            .field("certificate", &self.certificate)
            .field("authority_certificate", &self.authority_certificate)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_validate_all_present() {
        let dir = tempdir().unwrap();
        for name in ["key.pem", "certificate.pem", "wwdr.pem"] {
            fs::write(dir.path().join(name), b"pem").unwrap();
        }
        let creds = SignerCredentials::new(
            dir.path().join("key.pem"),
            dir.path().join("certificate.pem"),
            dir.path().join("wwdr.pem"),
        );
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_validate_lists_every_missing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("key.pem"), b"pem").unwrap();
        let creds = SignerCredentials::new(
            dir.path().join("key.pem"),
            dir.path().join("certificate.pem"),
            dir.path().join("wwdr.pem"),
        );

        match creds.validate() {
            Err(Error::MissingCredentials(msg)) => {
                assert!(msg.contains("certificate.pem"));
                assert!(msg.contains("wwdr.pem"));
                assert!(!msg.contains("key.pem"));
            }
            other => panic!("expected missing credentials, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = SignerCredentials::new("k.pem", "c.pem", "w.pem").password("hunter2");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(creds.password.as_ref().unwrap().expose_secret(), "hunter2");
    }
}
