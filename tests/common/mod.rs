//! Fixture builders shared by the integration test binaries.

#![allow(dead_code)]

use acrofill::FormConfig;
use lopdf::{
    dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
};
use std::path::Path;
use tempfile::TempDir;

/// A scratch workspace with the three configured roots inside it.
pub struct Workspace {
    pub root: TempDir,
    pub config: FormConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = FormConfig {
            form_root: root.path().join("form-volt"),
            work_root: root.path().join("temp-process"),
            output_root: root.path().join("filled-forms"),
            purge_intermediate: false,
        };
        Self { root, config }
    }

    /// Place `bytes` as `filename` in `username`'s form directory.
    pub fn upload(&self, username: &str, filename: &str, bytes: &[u8]) {
        let dir = self.config.form_root.join(username);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(filename), bytes).unwrap();
    }

    /// Write the finalized field → value map for `base`.
    pub fn finalize(&self, username: &str, base: &str, json: &str) {
        let dir = self.config.work_root.join(username);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{base}-final-acro.json")), json).unwrap();
    }
}

/// Widgets of one page: `(field name, initial value)`.
pub type PageFields<'a> = &'a [(&'a str, Option<&'a str>)];

/// Build a PDF whose pages carry the given text fields.
///
/// `xfa` adds an `/XFA` stream to the AcroForm; `with_acroform = false`
/// leaves the catalog without any AcroForm at all.
pub fn build_form(pages: &[PageFields<'_>], xfa: bool, with_acroform: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut page_ids: Vec<Object> = Vec::new();
    let mut fields: Vec<Object> = Vec::new();

    for widgets in pages {
        let page_id = doc.new_object_id();
        let mut annots: Vec<Object> = Vec::new();
        for (slot, (name, value)) in widgets.iter().enumerate() {
            let top = 720 - 30 * slot as i64;
            let mut field = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal(*name),
                "Rect" => vec![50.into(), (top - 20).into(), 250.into(), top.into()],
                "P" => page_id,
            };
            if let Some(value) = value {
                field.set("V", Object::string_literal(*value));
            }
            let id = doc.add_object(field);
            annots.push(id.into());
            fields.push(id.into());
        }

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        if !annots.is_empty() {
            page.set("Annots", annots);
        }
        doc.objects.insert(page_id, Object::Dictionary(page));
        page_ids.push(page_id.into());
    }

    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => count,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if with_acroform {
        let mut acroform = dictionary! { "Fields" => fields };
        if xfa {
            let packet = doc.add_object(Stream::new(dictionary! {}, b"<xdp:xdp/>".to_vec()));
            acroform.set("XFA", packet);
        }
        let acroform_id = doc.add_object(acroform);
        catalog.set("AcroForm", acroform_id);
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Re-save `bytes` encrypted with an owner password and an empty user
/// password, so any reader can open it without prompting.
pub fn encrypt_form(bytes: &[u8], permissions: Permissions) -> Vec<u8> {
    let mut doc = Document::load_mem(bytes).unwrap();
    let id = Object::string_literal(b"0123456789abcdef".to_vec());
    doc.trailer.set("ID", vec![id.clone(), id]);
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password: "",
        key_length: 128,
        permissions,
    };
    let state = EncryptionState::try_from(version).unwrap();
    doc.encrypt(&state).unwrap();

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Read back `(name, value)` for every widget of the PDF at `path`.
pub fn read_fields(path: &Path) -> Vec<(String, Option<String>)> {
    use acrofill::{FormDocument, PdfDocument};
    PdfDocument::open(path)
        .unwrap()
        .widgets()
        .into_iter()
        .map(|w| (w.name, w.value))
        .collect()
}
