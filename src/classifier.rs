use crate::document::FormDocument;
use crate::paths::FormPaths;
use crate::{FormConfig, Result};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, info};

// ── Classification ───────────────────────────────────────────────────────────

/// Verdict on whether a candidate PDF can go through the fill pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The source path does not exist.
    Missing,
    /// The AcroForm carries an `/XFA` entry; simple field fill-in won't work.
    XfaFound,
    /// The document is encrypted or withholds some permission.
    Restricted,
    /// Plain AcroForm document with full access.
    Ok,
}

impl Classification {
    /// Combine the two inspection results. XFA wins over restriction.
    pub fn decide(has_xfa: bool, restricted: bool) -> Self {
        if has_xfa {
            Classification::XfaFound
        } else if restricted {
            Classification::Restricted
        } else {
            Classification::Ok
        }
    }

    /// The label reported to callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Missing => "MISSING",
            Classification::XfaFound => "XFA_FOUND",
            Classification::Restricted => "RESTRICTED",
            Classification::Ok => "OK",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Classifier ───────────────────────────────────────────────────────────────

/// Read-only inspection of candidate forms, generic over the PDF engine.
///
/// ```no_run
/// use acrofill::{Classification, Classifier, PdfDocument};
/// use std::path::Path;
///
/// let verdict = Classifier::<PdfDocument>::classify(Path::new("upload.pdf")).unwrap();
/// if verdict == Classification::Ok {
///     println!("ready to extract fields");
/// }
/// ```
pub struct Classifier<D> {
    _engine: PhantomData<fn() -> D>,
}

impl<D: FormDocument> Classifier<D> {
    /// Classify the document at `path`.
    ///
    /// A missing path yields [`Classification::Missing`] without opening
    /// anything. The only error surfaced is a failure to open an existing
    /// file; everything after that folds into the verdict.
    pub fn classify(path: &Path) -> Result<Classification> {
        if !path.exists() {
            info!(path = %path.display(), "classification: source missing");
            return Ok(Classification::Missing);
        }

        let document = D::open(path)?;
        let verdict = Self::inspect(&document);
        info!(path = %path.display(), %verdict, "classification complete");
        Ok(verdict)
    }

    /// Classify the source form stored for `username` under `filename`.
    pub fn classify_user_file(
        config: &FormConfig,
        username: &str,
        filename: &str,
    ) -> Result<Classification> {
        let paths = FormPaths::resolve(config, username, filename)?;
        Self::classify(&paths.form)
    }

    /// Classify an already opened document.
    pub fn inspect(document: &D) -> Classification {
        let restricted = document.is_restricted();
        let has_xfa = match document.acroform_has_xfa() {
            Ok(found) => found,
            Err(e) => {
                // Documents without a readable AcroForm are common; they
                // simply aren't XFA forms.
                debug!(error = %e, "AcroForm not inspectable; treating as no XFA");
                false
            }
        };
        Classification::decide(has_xfa, restricted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xfa_takes_precedence_over_restriction() {
        assert_eq!(Classification::decide(true, true), Classification::XfaFound);
        assert_eq!(Classification::decide(true, false), Classification::XfaFound);
        assert_eq!(Classification::decide(false, true), Classification::Restricted);
        assert_eq!(Classification::decide(false, false), Classification::Ok);
    }

    #[test]
    fn labels() {
        let labels: Vec<String> = [
            Classification::Missing,
            Classification::XfaFound,
            Classification::Restricted,
            Classification::Ok,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(labels, ["MISSING", "XFA_FOUND", "RESTRICTED", "OK"]);
    }
}
