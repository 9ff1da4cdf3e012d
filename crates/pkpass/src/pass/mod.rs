//! Pass generation module.
//!
//! Provides functionality for rendering recipient data into the pass template,
//! running the per-recipient pipeline, packaging the `.pkpass` archive and
//! checking a finished archive.

pub mod archive;
pub mod pipeline;
pub mod recipient;
pub mod template;
pub mod verify;

pub use archive::{create_pkpass, CompressionLevel};
pub use pipeline::{PassPipeline, Stage};
pub use recipient::{RecipientData, RecipientRecord, Roster, VcardProfile};
pub use template::PassTemplate;
#[cfg(feature = "openssl-backend")]
pub use verify::verify_pkpass;
pub use verify::{check_pkpass_contents, PassContents};
