//! Consistency checks on a finished pass archive.
//!
//! Mirrors what the wallet does on import: every manifest entry must match the
//! digest of its member, no member may be unlisted, and the signature must
//! cover the manifest bytes exactly.

use crate::bundle::staging::{MANIFEST_FILE, SIGNATURE_FILE};
use crate::bundle::{Manifest, ManifestDigest};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// The signed parts of an archive whose digests have been checked.
#[derive(Debug)]
pub struct PassContents {
    pub manifest: Manifest,
    /// Exact `manifest.json` bytes the signature covers.
    pub manifest_bytes: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Check every digest and the member set of an archive.
///
/// The digest algorithm is inferred per entry from the hex length (40 for
/// SHA-1, 64 for SHA-256).
pub fn check_pkpass_contents(path: impl AsRef<Path>) -> Result<PassContents> {
    let mut archive = ZipArchive::new(File::open(path.as_ref())?)?;

    let manifest_bytes = read_member(&mut archive, MANIFEST_FILE)?;
    let signature = read_member(&mut archive, SIGNATURE_FILE)?;
    let manifest = Manifest::from_bytes(&manifest_bytes)?;

    let members: BTreeSet<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_string)
        .collect();

    let mut expected: BTreeSet<String> = manifest.entries().map(|(name, _)| name.to_string()).collect();
    expected.insert(MANIFEST_FILE.to_string());
    expected.insert(SIGNATURE_FILE.to_string());

    if let Some(extra) = members.difference(&expected).next() {
        return Err(Error::Manifest(format!("member {} is not listed in the manifest", extra)));
    }
    if let Some(missing) = expected.difference(&members).next() {
        return Err(Error::Manifest(format!("manifest lists {} but the archive lacks it", missing)));
    }

    for (name, recorded) in manifest.entries() {
        let digest = match recorded.len() {
            40 => ManifestDigest::Sha1,
            64 => ManifestDigest::Sha256,
            _ => return Err(Error::Manifest(format!("unrecognized digest for {}: {}", name, recorded))),
        };
        let data = read_member(&mut archive, name)?;
        if digest.hex(&data) != recorded {
            return Err(Error::Manifest(format!("digest mismatch for {}", name)));
        }
    }

    Ok(PassContents {
        manifest,
        manifest_bytes,
        signature,
    })
}

/// Check the archive contents and verify its signature against `authority_pem`.
#[cfg(feature = "openssl-backend")]
pub fn verify_pkpass(path: impl AsRef<Path>, authority_pem: &[u8]) -> Result<PassContents> {
    let contents = check_pkpass_contents(path)?;
    crate::crypto::verify_detached(&contents.signature, &contents.manifest_bytes, authority_pem)?;
    Ok(contents)
}

fn read_member(archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| Error::Manifest(format!("archive has no {}", name)))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}
