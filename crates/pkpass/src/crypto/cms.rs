//! Pure-Rust CMS signing.
//!
//! Uses the cryptographic-message-syntax crate, so no OpenSSL installation is
//! needed at build or run time. Only unencrypted PKCS#8 keys are supported.

use super::{Signer, SignerCredentials};
use crate::{Error, Result};
use cryptographic_message_syntax::{SignedDataBuilder, SignerBuilder};
use std::fs;
use x509_certificate::{CapturedX509Certificate, InMemorySigningKeyPair};

/// Signs with an in-memory key pair.
pub struct CmsSigner {
    key: InMemorySigningKeyPair,
    certificate: CapturedX509Certificate,
    chain: Vec<CapturedX509Certificate>,
}

impl CmsSigner {
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8], authority_pem: &[u8]) -> Result<Self> {
        let certificate = CapturedX509Certificate::from_pem(cert_pem)
            .map_err(|e| Error::Certificate(format!("Failed to load signer certificate: {}", e)))?;

        let key = InMemorySigningKeyPair::from_pkcs8_pem(key_pem)
            .map_err(|e| Error::Certificate(format!("Failed to load private key: {}", e)))?;

        let chain = CapturedX509Certificate::from_pem_multiple(authority_pem)
            .map_err(|e| Error::Certificate(format!("Failed to load authority certificate: {}", e)))?;
        if chain.is_empty() {
            return Err(Error::Certificate("Authority certificate file holds no certificate".into()));
        }

        Ok(Self {
            key,
            certificate,
            chain,
        })
    }

    pub fn from_credentials(credentials: &SignerCredentials) -> Result<Self> {
        if credentials.password.is_some() {
            return Err(Error::Certificate(
                "Encrypted private keys are not supported by the pure-Rust backend".into(),
            ));
        }
        let cert_pem = fs::read(&credentials.certificate)?;
        let key_pem = fs::read(&credentials.private_key)?;
        let authority_pem = fs::read(&credentials.authority_certificate)?;
        Self::from_pem(&cert_pem, &key_pem, &authority_pem)
    }
}

impl Signer for CmsSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signer = SignerBuilder::new(&self.key, self.certificate.clone());

        let mut builder = SignedDataBuilder::default()
            .content_external(data.to_vec())
            .signer(signer)
            .certificate(self.certificate.clone());

        for cert in &self.chain {
            builder = builder.certificate(cert.clone());
        }

        builder
            .build_der()
            .map_err(|e| Error::Signing(format!("Failed to build CMS signature: {}", e)))
    }
}
