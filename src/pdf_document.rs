use crate::document::{FormDocument, Widget, WidgetRef, FULL_ACCESS_MASK};
use crate::pdf_utils::{
    self, encode_text_string, extract_text_from_dict, resolve_array, resolve_dict,
};
use crate::{FormError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;
use tracing::debug;

/// Field hierarchies deeper than this are treated as malformed (and guard
/// against `/Parent` cycles).
const MAX_FIELD_DEPTH: usize = 32;

/// Low 16 bits of a `/P` value. Bits 1 and 2 are reserved and always clear
/// in `/P`, so they are forced on to compare against [`FULL_ACCESS_MASK`].
fn normalize_permissions(p: u32) -> u32 {
    (p | 0b11) & FULL_ACCESS_MASK
}

// ── PdfDocument ──────────────────────────────────────────────────────────────

/// [`FormDocument`] backed by a [`lopdf::Document`].
///
/// ```no_run
/// use acrofill::{FormDocument, PdfDocument};
/// use std::path::Path;
///
/// let doc = PdfDocument::open(Path::new("form.pdf")).unwrap();
/// for widget in doc.widgets() {
///     println!("p{} {} = {:?}", widget.page, widget.name, widget.value);
/// }
/// ```
pub struct PdfDocument {
    document: Document,
}

impl PdfDocument {
    /// Wrap an already parsed document.
    pub fn from_document(document: Document) -> Self {
        Self { document }
    }

    /// Parse a PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            document: Document::load_mem(data)?,
        })
    }

    /// Returns a reference to the underlying [`lopdf::Document`].
    pub fn document(&self) -> &Document {
        &self.document
    }

    // ── Private: field hierarchy ─────────────────────────────────────────────

    /// Iterate `id` and its `/Parent` ancestors, nearest first.
    fn lineage(&self, id: ObjectId) -> Vec<(ObjectId, &Dictionary)> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            if chain.len() >= MAX_FIELD_DEPTH {
                break;
            }
            let Ok(dict) = self.document.get_dictionary(id) else {
                break;
            };
            chain.push((id, dict));
            current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
        }
        chain
    }

    /// Fully qualified field name: every partial `/T` from the root field
    /// down to the widget, joined with `.`.
    fn field_name(&self, widget_id: ObjectId) -> Option<String> {
        let mut parts: Vec<String> = self
            .lineage(widget_id)
            .into_iter()
            .filter_map(|(_, dict)| extract_text_from_dict(&self.document, dict, b"T"))
            .collect();
        if parts.is_empty() {
            return None;
        }
        parts.reverse();
        Some(parts.join("."))
    }

    /// The nearest dictionary in the hierarchy that defines `key`.
    fn inherited(&self, widget_id: ObjectId, key: &[u8]) -> Option<&Object> {
        self.lineage(widget_id)
            .into_iter()
            .find_map(|(_, dict)| dict.get(key).ok())
    }

    fn field_value(&self, widget_id: ObjectId) -> Option<String> {
        match pdf_utils::resolve(&self.document, self.inherited(widget_id, b"V")?)? {
            Object::String(bytes, _) => Some(pdf_utils::decode_text_string(bytes)),
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }

    /// The terminal field dictionary holding the widget's value: the widget
    /// itself when it is merged with its field, otherwise its named parent.
    fn field_owner(&self, widget_id: ObjectId) -> Option<ObjectId> {
        self.lineage(widget_id)
            .into_iter()
            .find(|(_, dict)| dict.has(b"T"))
            .map(|(id, _)| id)
    }

    fn is_button(&self, widget_id: ObjectId) -> bool {
        self.inherited(widget_id, b"FT")
            .and_then(|ft| ft.as_name().ok())
            .map(|ft| ft == b"Btn")
            .unwrap_or(false)
    }

    /// Whether the widget's normal appearance dictionary has a `state` entry.
    fn has_appearance_state(&self, widget_id: ObjectId, state: &[u8]) -> bool {
        let Ok(widget) = self.document.get_dictionary(widget_id) else {
            return false;
        };
        widget
            .get(b"AP")
            .ok()
            .and_then(|ap| resolve_dict(&self.document, ap))
            .and_then(|ap| ap.get(b"N").ok())
            .and_then(|n| resolve_dict(&self.document, n))
            .map(|n| n.has(state))
            .unwrap_or(false)
    }

    /// Flag the AcroForm so viewers rebuild widget appearances from `/V`.
    fn request_appearance_regeneration(&mut self) {
        let Ok(acroform) = self
            .document
            .catalog()
            .and_then(|c| c.get(b"AcroForm"))
            .cloned()
        else {
            debug!("no AcroForm dictionary; NeedAppearances not set");
            return;
        };
        match acroform {
            Object::Reference(id) => {
                if let Ok(form) = self.document.get_dictionary_mut(id) {
                    form.set("NeedAppearances", Object::Boolean(true));
                }
            }
            Object::Dictionary(_) => {
                let Ok(root) = self
                    .document
                    .trailer
                    .get(b"Root")
                    .and_then(|r| r.as_reference())
                else {
                    return;
                };
                if let Ok(catalog) = self.document.get_dictionary_mut(root) {
                    if let Ok(Object::Dictionary(form)) = catalog.get_mut(b"AcroForm") {
                        form.set("NeedAppearances", Object::Boolean(true));
                    }
                }
            }
            _ => {}
        }
    }

    fn page_widgets(&self, page_number: u32, page_id: ObjectId) -> Vec<Widget> {
        let Ok(page) = self.document.get_dictionary(page_id) else {
            return Vec::new();
        };
        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .and_then(|a| resolve_array(&self.document, a))
        else {
            return Vec::new();
        };

        let mut widgets = Vec::new();
        for annot in annots {
            // Inline annotations cannot be addressed for writing back.
            let Ok(id) = annot.as_reference() else {
                continue;
            };
            let Ok(dict) = self.document.get_dictionary(id) else {
                continue;
            };
            let is_widget = dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .map(|s| s == b"Widget")
                .unwrap_or(false);
            if !is_widget {
                continue;
            }
            match self.field_name(id) {
                Some(name) => widgets.push(Widget {
                    reference: WidgetRef(id),
                    page: page_number,
                    name,
                    value: self.field_value(id),
                }),
                None => debug!(page = page_number, widget = ?id, "skipping unnamed widget"),
            }
        }
        widgets
    }
}

impl FormDocument for PdfDocument {
    fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening PDF");
        Ok(Self {
            document: Document::load(path)?,
        })
    }

    /// lopdf decrypts empty-user-password documents on load and drops
    /// `/Encrypt` from the trailer, so both states count.
    fn is_encrypted(&self) -> bool {
        self.document.is_encrypted() || self.document.was_encrypted()
    }

    fn permission_bitmask(&self) -> u32 {
        // Still carrying /Encrypt: lopdf could not authenticate the document.
        if let Ok(encrypt) = self.document.trailer.get(b"Encrypt") {
            let p = resolve_dict(&self.document, encrypt)
                .and_then(|dict| dict.get(b"P").ok())
                .and_then(|p| p.as_i64().ok())
                .unwrap_or(0);
            return normalize_permissions(p as u32);
        }
        match self.document.encryption_state.as_ref() {
            Some(state) if state.permissions().is_all() => FULL_ACCESS_MASK,
            Some(state) => normalize_permissions(state.permissions().bits() as u32),
            None => FULL_ACCESS_MASK,
        }
    }

    fn acroform_has_xfa(&self) -> Result<bool> {
        let catalog = self.document.catalog()?;
        let acroform = match catalog.get(b"AcroForm")? {
            Object::Reference(id) => self.document.get_dictionary(*id)?,
            inline => inline.as_dict()?,
        };
        Ok(acroform.has(b"XFA"))
    }

    fn widgets(&self) -> Vec<Widget> {
        self.document
            .get_pages()
            .into_iter()
            .flat_map(|(number, id)| self.page_widgets(number, id))
            .collect()
    }

    fn set_widget_value(&mut self, widget: WidgetRef, value: &str) -> Result<()> {
        let WidgetRef(widget_id) = widget;
        let owner = self
            .field_owner(widget_id)
            .ok_or(FormError::InvalidWidget(widget_id))?;

        if self.is_button(widget_id) {
            let state = value.as_bytes().to_vec();
            let appearance = if self.has_appearance_state(widget_id, &state) {
                state.clone()
            } else {
                b"Off".to_vec()
            };
            self.document
                .get_dictionary_mut(owner)?
                .set("V", Object::Name(state));
            self.document
                .get_dictionary_mut(widget_id)?
                .set("AS", Object::Name(appearance));
        } else {
            self.document
                .get_dictionary_mut(owner)?
                .set("V", encode_text_string(value));
        }

        self.request_appearance_regeneration();
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // Stage next to the destination so the final rename is atomic and a
        // failed write never leaves a partial document behind.
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        self.document.save_to(&mut staged)?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), "saved PDF");
        Ok(())
    }
}
