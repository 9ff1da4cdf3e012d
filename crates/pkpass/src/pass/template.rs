//! `pass.json` template rendering.
//!
//! The template is an ordinary pass description with placeholder values at a
//! fixed set of key paths; rendering assigns recipient values into those paths
//! and leaves everything else untouched.

use super::recipient::{RecipientData, VcardProfile};
use crate::bundle::staging::PASS_JSON;
use crate::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Step in a key path: an object key or an array index.
#[derive(Debug, Clone, Copy)]
enum Seg {
    Key(&'static str),
    Index(usize),
}

const PRIMARY_NAME: &[Seg] = &[Seg::Key("generic"), Seg::Key("primaryFields"), Seg::Index(0), Seg::Key("value")];
const AUX_PHONE: &[Seg] = &[Seg::Key("generic"), Seg::Key("auxiliaryFields"), Seg::Index(0), Seg::Key("value")];
const AUX_EMAIL: &[Seg] = &[Seg::Key("generic"), Seg::Key("auxiliaryFields"), Seg::Index(1), Seg::Key("value")];
const SECONDARY_TITLE: &[Seg] = &[Seg::Key("generic"), Seg::Key("secondaryFields"), Seg::Index(0), Seg::Key("value")];
const BARCODE_MESSAGE: &[Seg] = &[Seg::Key("barcode"), Seg::Key("message")];

fn describe(path: &[Seg]) -> String {
    let mut out = String::new();
    for seg in path {
        match seg {
            Seg::Key(k) if out.is_empty() => out.push_str(k),
            Seg::Key(k) => {
                out.push('.');
                out.push_str(k);
            }
            Seg::Index(i) => out.push_str(&format!("[{}]", i)),
        }
    }
    out
}

/// Assign `value` at `path`; every container on the way must already exist.
///
/// Paths always end in an object key, which is inserted if absent.
fn assign(doc: &mut Value, path: &[Seg], value: &str) -> Result<()> {
    let missing = || Error::Template(format!("template has no {}", describe(path)));

    let (Seg::Key(last), parents) = path.split_last().ok_or_else(missing)? else {
        return Err(missing());
    };
    let mut node = doc;
    for seg in parents {
        node = match *seg {
            Seg::Key(k) => node.get_mut(k),
            Seg::Index(i) => node.get_mut(i),
        }
        .ok_or_else(missing)?;
    }

    let obj = node.as_object_mut().ok_or_else(missing)?;
    obj.insert(last.to_string(), Value::String(value.to_string()));
    Ok(())
}

/// A loaded `pass.json` template.
#[derive(Debug, Clone)]
pub struct PassTemplate {
    document: Value,
}

impl PassTemplate {
    /// Load `pass.json` from a template directory.
    pub fn load(template_dir: impl AsRef<Path>) -> Result<Self> {
        let path = template_dir.as_ref().join(PASS_JSON);
        let data = fs::read(&path).map_err(|e| {
            Error::Template(format!(
                "cannot read {}: {}. Place the pass template at that path.",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&data)
    }

    /// Parse a template document.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(data)
            .map_err(|e| Error::Template(format!("pass.json is not valid JSON: {}", e)))?;
        if !document.is_object() {
            return Err(Error::Template("pass.json must be a JSON object".into()));
        }
        Ok(Self { document })
    }

    /// Fill the recipient fields and barcode payload into a copy of the template.
    pub fn render(&self, data: &RecipientData, profile: &VcardProfile) -> Result<Value> {
        let mut doc = self.document.clone();
        let vcard = profile.vcard(data);

        assign(&mut doc, PRIMARY_NAME, &data.name)?;
        assign(&mut doc, AUX_PHONE, &data.phone)?;
        assign(&mut doc, AUX_EMAIL, &data.email)?;
        assign(&mut doc, SECONDARY_TITLE, profile.title(data))?;
        assign(&mut doc, BARCODE_MESSAGE, &vcard)?;

        // Newer wallet versions read the `barcodes` array instead.
        if let Some(barcodes) = doc.get_mut("barcodes").and_then(Value::as_array_mut) {
            for barcode in barcodes.iter_mut().filter_map(Value::as_object_mut) {
                barcode.insert("message".into(), Value::String(vcard.clone()));
            }
        }

        Ok(doc)
    }

    /// Render to pretty-printed `pass.json` bytes.
    pub fn render_bytes(&self, data: &RecipientData, profile: &VcardProfile) -> Result<Vec<u8>> {
        let doc = self.render(data, profile)?;
        Ok(serde_json::to_vec_pretty(&doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template_json() -> Value {
        json!({
            "formatVersion": 1,
            "passTypeIdentifier": "pass.com.example.card",
            "generic": {
                "primaryFields": [{ "key": "name", "value": "NAME" }],
                "secondaryFields": [{ "key": "title", "value": "TITLE" }],
                "auxiliaryFields": [
                    { "key": "phone", "value": "PHONE" },
                    { "key": "email", "value": "EMAIL" }
                ]
            },
            "barcode": { "format": "PKBarcodeFormatQR", "message": "", "messageEncoding": "iso-8859-1" }
        })
    }

    fn data() -> RecipientData {
        RecipientData {
            name: "Ben Elfvin".into(),
            phone: "515-664-5937".into(),
            email: "belfvin@gmail.com".into(),
            vcard_n: "Elfvin;Ben;;;".into(),
            vcard_fn: "Ben Elfvin".into(),
            photo: "ben.jpg".into(),
            title: Some("TV Technician".into()),
        }
    }

    #[test]
    fn test_render_assigns_key_paths() {
        let template = PassTemplate::from_json(&serde_json::to_vec(&template_json()).unwrap()).unwrap();
        let doc = template.render(&data(), &VcardProfile::default()).unwrap();

        assert_eq!(doc["generic"]["primaryFields"][0]["value"], "Ben Elfvin");
        assert_eq!(doc["generic"]["auxiliaryFields"][0]["value"], "515-664-5937");
        assert_eq!(doc["generic"]["auxiliaryFields"][1]["value"], "belfvin@gmail.com");
        assert_eq!(doc["generic"]["secondaryFields"][0]["value"], "TV Technician");
        assert_eq!(
            doc["barcode"]["message"],
            VcardProfile::default().vcard(&data()).as_str()
        );
        assert_eq!(doc["passTypeIdentifier"], "pass.com.example.card");
        assert_eq!(doc["barcode"]["format"], "PKBarcodeFormatQR");
    }

    #[test]
    fn test_render_fallback_title() {
        let template = PassTemplate::from_json(&serde_json::to_vec(&template_json()).unwrap()).unwrap();
        let mut d = data();
        d.title = None;
        let doc = template.render(&d, &VcardProfile::default()).unwrap();
        assert_eq!(doc["generic"]["secondaryFields"][0]["value"], "Territory Manager");
    }

    #[test]
    fn test_render_fills_barcodes_array() {
        let mut tpl = template_json();
        tpl["barcodes"] = json!([{ "format": "PKBarcodeFormatQR", "message": "" }]);
        let template = PassTemplate::from_json(&serde_json::to_vec(&tpl).unwrap()).unwrap();

        let doc = template.render(&data(), &VcardProfile::default()).unwrap();
        assert_eq!(doc["barcodes"][0]["message"], doc["barcode"]["message"]);
    }

    #[test]
    fn test_render_does_not_mutate_template() {
        let template = PassTemplate::from_json(&serde_json::to_vec(&template_json()).unwrap()).unwrap();
        template.render(&data(), &VcardProfile::default()).unwrap();
        assert_eq!(template.document["generic"]["primaryFields"][0]["value"], "NAME");
    }

    #[test]
    fn test_missing_key_path() {
        let mut tpl = template_json();
        tpl["generic"]["auxiliaryFields"] = json!([{ "key": "phone", "value": "" }]);
        let template = PassTemplate::from_json(&serde_json::to_vec(&tpl).unwrap()).unwrap();

        let err = template.render(&data(), &VcardProfile::default()).unwrap_err();
        match err {
            Error::Template(msg) => assert!(msg.contains("generic.auxiliaryFields[1].value"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_bytes_is_pretty() {
        let template = PassTemplate::from_json(&serde_json::to_vec(&template_json()).unwrap()).unwrap();
        let bytes = template.render_bytes(&data(), &VcardProfile::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("{\n  \""));
    }

    #[test]
    fn test_render_keeps_template_key_order() {
        let raw = br#"{"formatVersion":1,"serialNumber":"001","description":"Business card","generic":{"primaryFields":[{"key":"name","value":""}],"secondaryFields":[{"key":"title","value":""}],"auxiliaryFields":[{"key":"phone","value":""},{"key":"email","value":""}]},"barcode":{"message":"","format":"PKBarcodeFormatQR","messageEncoding":"iso-8859-1"}}"#;
        let template = PassTemplate::from_json(raw).unwrap();

        let doc = template.render(&data(), &VcardProfile::default()).unwrap();

        let top: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(top, ["formatVersion", "serialNumber", "description", "generic", "barcode"]);
        let barcode: Vec<&str> = doc["barcode"].as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(barcode, ["message", "format", "messageEncoding"]);
    }

    #[test]
    fn test_load_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(PassTemplate::load(dir.path()), Err(Error::Template(_))));
    }

    #[test]
    fn test_non_object_template() {
        assert!(matches!(PassTemplate::from_json(b"[1, 2]"), Err(Error::Template(_))));
    }
}
