//! The capability contract the classifier and processor need from a PDF
//! engine.
//!
//! [`crate::PdfDocument`] implements it on top of lopdf; tests implement it
//! in memory to cover document shapes that are awkward to build as real
//! files (encrypted or permission-restricted documents).

use crate::Result;
use std::path::Path;

/// Permission bitmask value of a document that grants every right.
pub const FULL_ACCESS_MASK: u32 = 0xFFFF;

/// Opaque handle to one widget annotation inside an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetRef(pub lopdf::ObjectId);

/// A single interactive form field instance on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    /// Handle used to write this widget's value back.
    pub reference: WidgetRef,

    /// 1-based page number the widget sits on.
    pub page: u32,

    /// Fully qualified field name.
    pub name: String,

    /// Current field value, if any.
    pub value: Option<String>,
}

/// An opened PDF form.
///
/// The document is owned by whoever opened it and released on drop, so every
/// exit path (including `?` propagation) closes it.
pub trait FormDocument: Sized {
    /// Open the document at `path`.
    fn open(path: &Path) -> Result<Self>;

    /// Whether the document carries an encryption dictionary.
    fn is_encrypted(&self) -> bool;

    /// The document's permission bits; [`FULL_ACCESS_MASK`] when unrestricted.
    fn permission_bitmask(&self) -> u32;

    /// Whether the catalog's AcroForm dictionary has an `/XFA` entry.
    ///
    /// Errors mean the AcroForm could not be inspected at all (absent,
    /// malformed, unresolvable).
    fn acroform_has_xfa(&self) -> Result<bool>;

    /// Every widget, pages in order and widgets in their per-page order.
    fn widgets(&self) -> Vec<Widget>;

    /// Assign `value` to the widget's field and commit it in place.
    fn set_widget_value(&mut self, widget: WidgetRef, value: &str) -> Result<()>;

    /// Write the document to `path`. The source file is never touched.
    fn save_as(&mut self, path: &Path) -> Result<()>;

    /// Whether the document has any permission restriction.
    fn is_restricted(&self) -> bool {
        self.is_encrypted() || self.permission_bitmask() != FULL_ACCESS_MASK
    }
}
