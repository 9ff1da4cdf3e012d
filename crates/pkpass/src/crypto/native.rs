//! PKCS#7 detached signing through the OpenSSL bindings.

use super::{Signer, SignerCredentials};
use crate::{Error, Result};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::verify::X509VerifyFlags;
use openssl::x509::{X509PurposeId, X509};
use secrecy::{ExposeSecret, SecretString};
use std::fs;

/// Signs with an in-process OpenSSL key.
pub struct OpensslSigner {
    certificate: X509,
    private_key: PKey<Private>,
    chain: Vec<X509>,
}

impl OpensslSigner {
    /// Load from PEM bytes.
    ///
    /// `authority_pem` may hold several certificates; all of them are embedded
    /// in every signature.
    pub fn from_pem(
        cert_pem: &[u8],
        key_pem: &[u8],
        authority_pem: &[u8],
        key_password: Option<&SecretString>,
    ) -> Result<Self> {
        let certificate = X509::from_pem(cert_pem)
            .map_err(|e| Error::Certificate(format!("Failed to load signer certificate: {}", e)))?;

        // An empty passphrase keeps OpenSSL from prompting on the terminal.
        let passphrase = key_password.map(|p| p.expose_secret().as_bytes()).unwrap_or_default();
        let private_key = PKey::private_key_from_pem_passphrase(key_pem, passphrase)
            .map_err(|e| Error::Certificate(format!("Failed to load private key: {}", e)))?;

        let chain = X509::stack_from_pem(authority_pem)
            .map_err(|e| Error::Certificate(format!("Failed to load authority certificate: {}", e)))?;
        if chain.is_empty() {
            return Err(Error::Certificate("Authority certificate file holds no certificate".into()));
        }

        validate_key_pair(&certificate, &private_key)?;

        Ok(Self {
            certificate,
            private_key,
            chain,
        })
    }

    /// Load from the credential files.
    pub fn from_credentials(credentials: &SignerCredentials) -> Result<Self> {
        let cert_pem = fs::read(&credentials.certificate)?;
        let key_pem = fs::read(&credentials.private_key)?;
        let authority_pem = fs::read(&credentials.authority_certificate)?;
        Self::from_pem(&cert_pem, &key_pem, &authority_pem, credentials.password.as_ref())
    }
}

impl Signer for OpensslSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut certs: Stack<X509> = Stack::new().map_err(|e| Error::Signing(e.to_string()))?;
        for cert in &self.chain {
            certs.push(cert.clone()).map_err(|e| Error::Signing(e.to_string()))?;
        }

        let pkcs7 = Pkcs7::sign(
            &self.certificate,
            &self.private_key,
            &certs,
            data,
            Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY,
        )
        .map_err(|e| Error::Signing(format!("Failed to build PKCS#7 signature: {}", e)))?;

        pkcs7
            .to_der()
            .map_err(|e| Error::Signing(format!("Failed to encode signature: {}", e)))
    }
}

/// Validate that the private key matches the certificate's public key
fn validate_key_pair(cert: &X509, private_key: &PKey<Private>) -> Result<()> {
    let cert_public_key = cert
        .public_key()
        .map_err(|e| Error::Certificate(format!("Failed to extract public key from certificate: {}", e)))?;

    if !private_key.public_eq(&cert_public_key) {
        return Err(Error::Certificate(
            "Private key does not match certificate public key".into(),
        ));
    }

    Ok(())
}

/// Verify a detached DER signature over `data`.
///
/// Every certificate in `authority_pem` is trusted as a chain anchor, so an
/// intermediate such as the WWDR certificate is sufficient on its own.
pub fn verify_detached(signature: &[u8], data: &[u8], authority_pem: &[u8]) -> Result<()> {
    let pkcs7 = Pkcs7::from_der(signature)
        .map_err(|e| Error::Signing(format!("Signature is not valid DER PKCS#7: {}", e)))?;

    let anchors = X509::stack_from_pem(authority_pem)
        .map_err(|e| Error::Certificate(format!("Failed to load authority certificate: {}", e)))?;

    let store = (|| {
        let mut builder = X509StoreBuilder::new()?;
        for cert in anchors {
            builder.add_cert(cert)?;
        }
        builder.set_flags(X509VerifyFlags::PARTIAL_CHAIN)?;
        builder.set_purpose(X509PurposeId::ANY)?;
        Ok::<_, openssl::error::ErrorStack>(builder.build())
    })()
    .map_err(|e| Error::Certificate(format!("Failed to build trust store: {}", e)))?;

    let extra: Stack<X509> = Stack::new().map_err(|e| Error::Signing(e.to_string()))?;
    pkcs7
        .verify(&extra, &store, Some(data), None, Pkcs7Flags::BINARY)
        .map_err(|e| Error::Signing(format!("Signature verification failed: {}", e)))
}
