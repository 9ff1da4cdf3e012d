//! Per-recipient bundle pipeline.
//!
//! Each recipient gets a fresh [`StagingDirectory`] and runs through the
//! stages in order:
//!
//! ```text
//! Render -> Normalize -> Manifest -> Sign -> Archive -> Done
//! ```
//!
//! Any stage error aborts the recipient; the staging directory is dropped with
//! it, so nothing from a failed recipient reaches the next one or the output
//! directory.

use super::archive::{create_pkpass, CompressionLevel};
use super::recipient::{RecipientRecord, Roster, VcardProfile};
use super::template::PassTemplate;
use crate::bundle::staging::PASS_JSON;
use crate::bundle::{ManifestBuilder, ManifestDigest, StagingDirectory};
use crate::crypto::{sign_manifest, Signer};
use crate::thumbnail::{write_thumbnails, ThumbnailOutcome};
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Render,
    Normalize,
    Manifest,
    Sign,
    Archive,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Render => "render",
            Stage::Normalize => "normalize",
            Stage::Manifest => "manifest",
            Stage::Sign => "sign",
            Stage::Archive => "archive",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Configured pipeline, created by [`crate::PassBuilder::build`].
pub struct PassPipeline {
    pub(crate) template_dir: PathBuf,
    pub(crate) template: PassTemplate,
    pub(crate) output_dir: PathBuf,
    pub(crate) signer: Box<dyn Signer>,
    pub(crate) digest: ManifestDigest,
    pub(crate) thumbnail_side: u32,
    pub(crate) compression_level: CompressionLevel,
    pub(crate) extension: String,
}

impl PassPipeline {
    /// Where the archive for `record` is written.
    pub fn output_path(&self, record: &RecipientRecord) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", record.filename, self.extension))
    }

    /// Build, sign and archive one recipient's pass.
    ///
    /// Returns the path of the finished archive.
    ///
    /// Every failure is returned as [`Error::Stage`], naming the recipient and
    /// the stage that stopped it.
    pub fn generate(&self, record: &RecipientRecord, profile: &VcardProfile) -> Result<PathBuf> {
        let span = tracing::info_span!("recipient", filename = %record.filename);
        let _enter = span.enter();
        let filename = record.filename.as_str();

        let staging = run_stage(Stage::Render, filename, || {
            record.validate()?;
            let staging = StagingDirectory::prepare(&self.template_dir)?;
            let pass_json = self.template.render_bytes(&record.data, profile)?;
            staging.write_member(PASS_JSON, pass_json)?;
            Ok(staging)
        })?;

        let outcome = run_stage(Stage::Normalize, filename, || {
            write_thumbnails(&record.data.photo, &staging, self.thumbnail_side)
        })?;
        if outcome != ThumbnailOutcome::Written {
            tracing::debug!(?outcome, "thumbnail not normalized");
        }

        let manifest = run_stage(Stage::Manifest, filename, || {
            ManifestBuilder::new(staging.path()).digest(self.digest).build()
        })?;

        run_stage(Stage::Sign, filename, || sign_manifest(self.signer.as_ref(), staging.path()))?;

        let output = self.output_path(record);
        let path = run_stage(Stage::Archive, filename, || {
            create_pkpass(staging.path(), &output, self.compression_level)
        })?;

        tracing::info!(stage = %Stage::Done, path = %path.display(), entries = manifest.len(), "pass created");
        Ok(path)
    }

    /// Generate every recipient of `roster` in order.
    ///
    /// Stops at the first fatal error; archives already written are kept.
    pub fn generate_all(&self, roster: &Roster) -> Result<Vec<PathBuf>> {
        let mut created = Vec::with_capacity(roster.recipients.len());
        for record in &roster.recipients {
            created.push(self.generate(record, &roster.vcard)?);
        }
        tracing::info!(count = created.len(), "all passes created");
        Ok(created)
    }
}

fn run_stage<T>(stage: Stage, filename: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::debug!(stage = %stage, "entering stage");
    f().map_err(|e| {
        tracing::error!(stage = %stage, error = %e, "stage failed");
        Error::Stage {
            filename: filename.to_string(),
            stage,
            source: Box::new(e),
        }
    })
}
