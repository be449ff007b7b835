use crate::artifacts::{write_field_names, ClaimedArtifact};
use crate::document::FormDocument;
use crate::paths::FormPaths;
use crate::{FormConfig, FormError, Result};
use std::collections::HashSet;
use std::fmt;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::{debug, info, warn};

// ── ProcessState ─────────────────────────────────────────────────────────────

/// Which half of the extract/fill cycle an invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// No finalized artifact yet: list the field names.
    Extract,
    /// A finalized artifact is waiting: fill the form from it.
    Fill,
}

impl ProcessState {
    /// Decide the state from a single existence check of the finalized
    /// artifact. Evaluated fresh on every invocation.
    pub fn detect(paths: &FormPaths) -> Self {
        if paths.finalized.exists() {
            ProcessState::Fill
        } else {
            ProcessState::Extract
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Extract => "EXTRACT",
            ProcessState::Fill => "FILL",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The field-name list was written to `artifact`.
    Extracted { artifact: PathBuf, field_count: usize },
    /// The filled document was saved to `output`.
    ///
    /// `filled` counts widgets that received a value; `unmatched` lists map
    /// entries that named no widget and were dropped.
    Filled {
        output: PathBuf,
        filled: usize,
        unmatched: Vec<String>,
    },
}

/// Read-only snapshot of where a `(username, filename)` pair stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    /// The state the next [`FormProcessor::run`] would enter.
    pub state: ProcessState,
    pub paths: FormPaths,
    pub form_exists: bool,
    pub intermediate_exists: bool,
    pub output_exists: bool,
    /// A claimed finalized artifact is on disk: a fill is in progress, or one
    /// was killed before it could release its claim.
    pub claim_pending: bool,
}

// ── FormProcessor ────────────────────────────────────────────────────────────

/// Runs the two-phase extract/fill protocol, generic over the PDF engine.
pub struct FormProcessor<D> {
    config: FormConfig,
    _engine: PhantomData<fn() -> D>,
}

impl<D: FormDocument> FormProcessor<D> {
    pub fn new(config: FormConfig) -> Self {
        Self {
            config,
            _engine: PhantomData,
        }
    }

    /// Run one phase for `filename` uploaded by `username`.
    ///
    /// The per-user work and output directories are created first; then the
    /// presence of the finalized artifact selects [`ProcessState::Extract`]
    /// or [`ProcessState::Fill`]. Exactly one phase runs per call.
    pub fn run(&self, username: &str, filename: &str) -> Result<ProcessOutcome> {
        let paths = FormPaths::resolve(&self.config, username, filename)?;
        paths.ensure_directories()?;

        let state = ProcessState::detect(&paths);
        info!(username, filename, %state, "processing form");

        match state {
            ProcessState::Extract => self.extract(&paths),
            ProcessState::Fill => self.fill(&paths),
        }
    }

    /// Report the pair's state without touching the filesystem.
    pub fn status(&self, username: &str, filename: &str) -> Result<ProcessStatus> {
        let paths = FormPaths::resolve(&self.config, username, filename)?;
        Ok(ProcessStatus {
            state: ProcessState::detect(&paths),
            form_exists: paths.form.exists(),
            intermediate_exists: paths.intermediate.exists(),
            output_exists: paths.output.exists(),
            claim_pending: ClaimedArtifact::claim_path(&paths.finalized).exists(),
            paths,
        })
    }

    /// EXTRACT: write every widget's field name, in page-then-widget order,
    /// to the intermediate artifact.
    pub fn extract(&self, paths: &FormPaths) -> Result<ProcessOutcome> {
        let document = open_form::<D>(paths)?;
        let names: Vec<String> = document.widgets().into_iter().map(|w| w.name).collect();

        write_field_names(&paths.intermediate, &names)?;
        info!(
            artifact = %paths.intermediate.display(),
            fields = names.len(),
            "field names extracted"
        );

        Ok(ProcessOutcome::Extracted {
            artifact: paths.intermediate.clone(),
            field_count: names.len(),
        })
    }

    /// FILL: apply the finalized field → value map, save the filled copy and
    /// consume the map.
    ///
    /// The map is only deleted once the save has completed. Any earlier
    /// failure (unparsable map, unreadable form, failed save) leaves it in
    /// place for the next invocation.
    pub fn fill(&self, paths: &FormPaths) -> Result<ProcessOutcome> {
        let claim = ClaimedArtifact::claim(&paths.finalized)?;
        let values = claim.load()?;

        let mut document = open_form::<D>(paths)?;
        let mut matched: HashSet<String> = HashSet::new();
        let mut filled = 0;

        for widget in document.widgets() {
            let Some(value) = values.get(&widget.name) else {
                continue;
            };
            debug!(field = %widget.name, page = widget.page, "filling widget");
            document.set_widget_value(widget.reference, value)?;
            matched.insert(widget.name);
            filled += 1;
        }

        let unmatched: Vec<String> = values
            .names()
            .filter(|name| !matched.contains(*name))
            .map(str::to_string)
            .collect();
        if !unmatched.is_empty() {
            debug!(?unmatched, "map entries without a matching widget ignored");
        }

        document.save_as(&paths.output)?;
        drop(document);
        claim.consume()?;

        if self.config.purge_intermediate {
            // The fill itself is committed at this point; a leftover list is
            // only clutter.
            match std::fs::remove_file(&paths.intermediate) {
                Err(e) if e.kind() != ErrorKind::NotFound => warn!(
                    path = %paths.intermediate.display(),
                    error = %e,
                    "could not purge intermediate artifact"
                ),
                _ => {}
            }
        }

        info!(
            output = %paths.output.display(),
            filled,
            unmatched = unmatched.len(),
            "form filled"
        );
        Ok(ProcessOutcome::Filled {
            output: paths.output.clone(),
            filled,
            unmatched,
        })
    }
}

fn open_form<D: FormDocument>(paths: &FormPaths) -> Result<D> {
    if !paths.form.exists() {
        return Err(FormError::MissingForm(paths.form.clone()));
    }
    D::open(&paths.form)
}
