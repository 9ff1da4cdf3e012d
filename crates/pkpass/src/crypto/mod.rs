//! Manifest signing.
//!
//! [`Signer`] is the seam the pipeline signs through. Three backends are
//! available:
//!
//! | Backend | Type | Feature |
//! |---------|------|---------|
//! | OpenSSL bindings | [`OpensslSigner`] | `openssl-backend` (default) |
//! | `openssl smime` subprocess | [`SmimeProcessSigner`] | always |
//! | cryptographic-message-syntax | [`CmsSigner`] | `pure-rust` |

pub mod credentials;
#[cfg(feature = "pure-rust")]
pub mod cms;
#[cfg(feature = "openssl-backend")]
pub mod native;
pub mod signer;
pub mod smime;

pub use credentials::SignerCredentials;
#[cfg(feature = "pure-rust")]
pub use cms::CmsSigner;
#[cfg(feature = "openssl-backend")]
pub use native::{verify_detached, OpensslSigner};
pub use signer::{sign_manifest, Signer};
pub use smime::{SmimeProcessSigner, DEFAULT_SIGNING_TIMEOUT};
