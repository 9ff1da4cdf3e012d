//! The signing seam between the pipeline and a cryptographic backend.

use crate::bundle::staging::{MANIFEST_FILE, SIGNATURE_FILE};
use crate::Result;
use std::fs;
use std::path::Path;

/// Produces a detached DER signature over a byte string.
///
/// Implementations must sign `data` exactly as given (binary mode, no
/// line-ending translation).
pub trait Signer {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(data)
    }
}

impl<S: Signer + ?Sized> Signer for &S {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(data)
    }
}

/// Sign the `manifest.json` in `bundle_dir` and write `signature` next to it.
///
/// Reads the manifest back from disk so the signature covers exactly the bytes
/// that will be archived.
pub fn sign_manifest(signer: &dyn Signer, bundle_dir: impl AsRef<Path>) -> Result<Vec<u8>> {
    let bundle_dir = bundle_dir.as_ref();
    let manifest = fs::read(bundle_dir.join(MANIFEST_FILE))?;
    let signature = signer.sign(&manifest)?;
    fs::write(bundle_dir.join(SIGNATURE_FILE), &signature)?;
    tracing::debug!(bytes = signature.len(), "signature written");
    Ok(signature)
}
