//! Recipient records and the vCard payload encoded in each pass barcode.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One pass to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    /// Output basename, without extension.
    pub filename: String,
    pub data: RecipientData,
}

/// Per-recipient fields substituted into the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientData {
    pub name: String,
    pub phone: String,
    pub email: String,
    /// Structured name in `Last;First;;;` form.
    pub vcard_n: String,
    /// Formatted name.
    pub vcard_fn: String,
    /// Source photo path, relative to the roster file when not absolute.
    pub photo: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RecipientRecord {
    /// Reject filenames that would escape the output directory.
    pub fn validate(&self) -> Result<()> {
        let name = self.filename.trim();
        if name.is_empty() {
            return Err(Error::Config(format!(
                "recipient '{}' has an empty filename",
                self.data.name
            )));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::Config(format!(
                "recipient filename must be a plain basename: {}",
                self.filename
            )));
        }
        Ok(())
    }
}

/// Organization-wide values of the vCard payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcardProfile {
    /// `ORG:` value, `;`-separated organization units.
    pub organization: String,
    /// Prefixed to every recipient title in the `TITLE:` line.
    pub title_prefix: String,
    pub url: String,
    /// Used when a recipient has no title.
    pub fallback_title: String,
}

impl Default for VcardProfile {
    fn default() -> Self {
        Self {
            organization: "T-Mobile;T-Fiber".into(),
            title_prefix: "T-Fiber".into(),
            url: "https://www.t-mobile.com/fiber".into(),
            fallback_title: "Territory Manager".into(),
        }
    }
}

impl VcardProfile {
    /// The recipient's title, or the fallback.
    pub fn title<'a>(&'a self, data: &'a RecipientData) -> &'a str {
        data.title.as_deref().unwrap_or(&self.fallback_title)
    }

    /// vCard 3.0 payload for the barcode message.
    pub fn vcard(&self, data: &RecipientData) -> String {
        let title = self.title(data);
        let title_line = if self.title_prefix.is_empty() {
            title.to_string()
        } else {
            format!("{} {}", self.title_prefix, title)
        };

        [
            "BEGIN:VCARD".to_string(),
            "VERSION:3.0".to_string(),
            format!("N:{}", data.vcard_n),
            format!("FN:{}", data.vcard_fn),
            format!("ORG:{}", self.organization),
            format!("TITLE:{}", title_line),
            format!("TEL;TYPE=CELL:{}", data.phone),
            format!("EMAIL:{}", data.email),
            format!("URL:{}", self.url),
            "END:VCARD".to_string(),
        ]
        .join("\n")
    }
}

/// Recipients plus the organization profile, as read from a roster file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub vcard: VcardProfile,
    pub recipients: Vec<RecipientRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RosterFile {
    Full(Roster),
    Bare(Vec<RecipientRecord>),
}

impl Roster {
    /// Parse a roster from JSON; a bare array of recipients is also accepted.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let roster = match serde_json::from_slice::<RosterFile>(data)? {
            RosterFile::Full(roster) => roster,
            RosterFile::Bare(recipients) => Roster {
                vcard: VcardProfile::default(),
                recipients,
            },
        };

        for recipient in &roster.recipients {
            recipient.validate()?;
        }
        Ok(roster)
    }

    /// Load a roster file, resolving relative photo paths against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|e| Error::Config(format!("cannot read roster {}: {}", path.display(), e)))?;
        let mut roster = Self::from_json(&data)?;

        if let Some(base) = path.parent() {
            for recipient in &mut roster.recipients {
                if recipient.data.photo.is_relative() {
                    recipient.data.photo = base.join(&recipient.data.photo);
                }
            }
        }
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ben() -> RecipientData {
        RecipientData {
            name: "Ben Elfvin".into(),
            phone: "515-664-5937".into(),
            email: "belfvin@gmail.com".into(),
            vcard_n: "Elfvin;Ben;;;".into(),
            vcard_fn: "Ben Elfvin".into(),
            photo: "ben_headshot.jpg".into(),
            title: Some("TV Technician".into()),
        }
    }

    #[test]
    fn test_vcard_exact_payload() {
        let vcard = VcardProfile::default().vcard(&ben());
        assert_eq!(
            vcard,
            "BEGIN:VCARD\nVERSION:3.0\nN:Elfvin;Ben;;;\nFN:Ben Elfvin\nORG:T-Mobile;T-Fiber\nTITLE:T-Fiber TV Technician\nTEL;TYPE=CELL:515-664-5937\nEMAIL:belfvin@gmail.com\nURL:https://www.t-mobile.com/fiber\nEND:VCARD"
        );
    }

    #[test]
    fn test_vcard_fallback_title() {
        let mut data = ben();
        data.title = None;
        let vcard = VcardProfile::default().vcard(&data);
        assert!(vcard.contains("\nTITLE:T-Fiber Territory Manager\n"));
    }

    #[test]
    fn test_roster_object_form() {
        let json = br#"{
            "vcard": { "organization": "Acme", "title_prefix": "", "url": "https://acme.test" },
            "recipients": [
                { "filename": "BenElfvin",
                  "data": { "name": "Ben Elfvin", "phone": "1", "email": "b@x",
                            "vcard_n": "Elfvin;Ben;;;", "vcard_fn": "Ben Elfvin",
                            "photo": "ben.jpg" } }
            ]
        }"#;
        let roster = Roster::from_json(json).unwrap();
        assert_eq!(roster.vcard.organization, "Acme");
        assert_eq!(roster.vcard.fallback_title, "Territory Manager");
        assert_eq!(roster.recipients.len(), 1);
        assert!(roster.recipients[0].data.title.is_none());

        let vcard = roster.vcard.vcard(&roster.recipients[0].data);
        assert!(vcard.contains("\nTITLE:Territory Manager\n"));
    }

    #[test]
    fn test_roster_bare_array_form() {
        let json = br#"[{ "filename": "A", "data": { "name": "A", "phone": "1", "email": "a@x",
            "vcard_n": "A;;;;", "vcard_fn": "A", "photo": "a.png", "title": "Lead" } }]"#;
        let roster = Roster::from_json(json).unwrap();
        assert_eq!(roster.vcard, VcardProfile::default());
        assert_eq!(roster.recipients[0].data.title.as_deref(), Some("Lead"));
    }

    #[test]
    fn test_roster_rejects_path_filenames() {
        let json = br#"[{ "filename": "../evil", "data": { "name": "A", "phone": "1", "email": "a@x",
            "vcard_n": "A;;;;", "vcard_fn": "A", "photo": "a.png" } }]"#;
        assert!(matches!(Roster::from_json(json), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_resolves_photo_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roster.json");
        fs::write(
            &path,
            br#"[{ "filename": "A", "data": { "name": "A", "phone": "1", "email": "a@x",
                "vcard_n": "A;;;;", "vcard_fn": "A", "photo": "photos/a.png" } }]"#,
        )
        .unwrap();

        let roster = Roster::load(&path).unwrap();
        assert_eq!(roster.recipients[0].data.photo, dir.path().join("photos/a.png"));
    }

    #[test]
    fn test_load_missing_roster() {
        assert!(matches!(Roster::load("/nonexistent/roster.json"), Err(Error::Config(_))));
    }
}
