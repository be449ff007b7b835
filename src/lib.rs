//! # acrofill
//!
//! Inspect and fill PDF AcroForm documents for a per-user workflow.
//!
//! ## What this crate does
//!
//! 1. **Classify** — decides whether an uploaded PDF is usable (`OK`), carries
//!    access restrictions (`RESTRICTED`), uses the XFA form technology
//!    (`XFA_FOUND`), or does not exist at all (`MISSING`).
//! 2. **Extract** — on the first run for a form, lists every widget's field
//!    name into an intermediate JSON artifact for an outside actor to map.
//! 3. **Fill** — once the finalized field → value map exists, writes the
//!    values into the matching widgets, saves a new `-filled.pdf`, and
//!    consumes the finalized map.
//!
//! Which of the two processing phases runs is decided solely by whether the
//! finalized artifact exists when the processor starts.
//!
//! ## Quick example
//!
//! ```no_run
//! use acrofill::{Classifier, FormConfig, FormProcessor, PdfDocument, ProcessOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FormConfig::default();
//!
//! let label = Classifier::<PdfDocument>::classify_user_file(&config, "alice", "visa.pdf")?;
//! println!("{label}");
//!
//! match FormProcessor::<PdfDocument>::new(config).run("alice", "visa.pdf")? {
//!     ProcessOutcome::Extracted { artifact, field_count } => {
//!         println!("{field_count} field names written to {}", artifact.display());
//!     }
//!     ProcessOutcome::Filled { output, .. } => println!("filled form at {}", output.display()),
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use thiserror::Error;

mod artifacts;
mod classifier;
mod document;
mod paths;
mod pdf_document;
mod pdf_utils;
mod processor;

pub use artifacts::{write_field_names, ClaimedArtifact, FieldValueMap};
pub use classifier::{Classification, Classifier};
pub use document::{FormDocument, Widget, WidgetRef, FULL_ACCESS_MASK};
pub use paths::FormPaths;
pub use pdf_document::PdfDocument;
pub use processor::{FormProcessor, ProcessOutcome, ProcessState, ProcessStatus};

// ── Configuration ────────────────────────────────────────────────────────────

/// Directory layout shared by the classifier and the form processor.
///
/// Every per-user path is derived from these three roots; see [`FormPaths`].
#[derive(Debug, Clone)]
pub struct FormConfig {
    /// Root holding the uploaded source forms, one sub-directory per user.
    pub form_root: PathBuf,

    /// Root for the intermediate and finalized JSON artifacts.
    pub work_root: PathBuf,

    /// Root for the filled output documents.
    pub output_root: PathBuf,

    /// When `true`, a successful fill also removes the intermediate
    /// field-name artifact, leaving the user's work directory clean.
    pub purge_intermediate: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            form_root: PathBuf::from("form-volt"),
            work_root: PathBuf::from("temp-process"),
            output_root: PathBuf::from("filled-forms"),
            purge_intermediate: false,
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
#[derive(Error, Debug)]
pub enum FormError {
    /// A filesystem I/O error occurred (e.g. when creating directories or
    /// moving an artifact).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying lopdf parser or writer returned an error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// A JSON artifact could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A username or filename is not a plain, single path component.
    #[error("Invalid {kind} '{value}': must be a single non-empty path component")]
    InvalidName { kind: &'static str, value: String },

    /// The source form for a processing run does not exist.
    #[error("Form not found: {0}")]
    MissingForm(PathBuf),

    /// The finalized artifact disappeared between the state check and the
    /// claim, i.e. another invocation is consuming it.
    #[error("Finalized artifact already claimed: {0}")]
    AlreadyClaimed(PathBuf),

    /// A widget handle no longer resolves to a field dictionary.
    #[error("Widget {0:?} is not a form field")]
    InvalidWidget(lopdf::ObjectId),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, FormError>;
