//! Wallet pass bundle generation.
//!
//! Renders one signed `.pkpass` archive per recipient from a template
//! directory: the template's `pass.json` is filled with the recipient's fields
//! and a vCard barcode, the recipient photo becomes a circular thumbnail, every
//! member is hashed into `manifest.json`, the manifest is signed, and the
//! bundle is zipped.
//!
//! Start with [`PassBuilder`].

pub mod builder;
pub mod bundle;
pub mod crypto;
pub mod error;
pub mod pass;
pub mod thumbnail;

pub use builder::{PassBuilder, SignerBackend};
pub use bundle::{Manifest, ManifestBuilder, ManifestDigest, StagingDirectory};
pub use crypto::{Signer, SignerCredentials};
pub use error::{Error, ErrorClass, ImageError};
pub use pass::{create_pkpass, CompressionLevel, PassPipeline, RecipientRecord, Roster, Stage, VcardProfile};

pub type Result<T> = std::result::Result<T, Error>;
