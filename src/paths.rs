use crate::{FormConfig, FormError, Result};
use std::path::{Component, Path, PathBuf};

const INTERMEDIATE_SUFFIX: &str = "-acro.json";
const FINALIZED_SUFFIX: &str = "-final-acro.json";
const OUTPUT_SUFFIX: &str = "-filled.pdf";

// ── FormPaths ────────────────────────────────────────────────────────────────

/// Every location one `(username, filename)` pair touches.
///
/// Resolution is a pure function of the configuration and the two names:
///
/// ```text
/// <form_root>/<user>/<file>                   source form
/// <work_root>/<user>/<base>-acro.json         intermediate field names
/// <work_root>/<user>/<base>-final-acro.json   finalized field values
/// <output_root>/<user>/<base>-filled.pdf      filled output
/// ```
///
/// where `base` is `file` without its final extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPaths {
    pub form: PathBuf,
    pub intermediate: PathBuf,
    pub finalized: PathBuf,
    pub output: PathBuf,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl FormPaths {
    /// Resolve the paths for `filename` uploaded by `username`.
    ///
    /// Both names must be a single, non-empty path component so that no
    /// user can address another user's directory.
    pub fn resolve(config: &FormConfig, username: &str, filename: &str) -> Result<Self> {
        check_component("username", username)?;
        check_component("filename", filename)?;

        let base = file_base(filename);
        let work_dir = config.work_root.join(username);
        let output_dir = config.output_root.join(username);

        Ok(Self {
            form: config.form_root.join(username).join(filename),
            intermediate: work_dir.join(format!("{base}{INTERMEDIATE_SUFFIX}")),
            finalized: work_dir.join(format!("{base}{FINALIZED_SUFFIX}")),
            output: output_dir.join(format!("{base}{OUTPUT_SUFFIX}")),
            work_dir,
            output_dir,
        })
    }

    /// Create the per-user work and output directories. Already existing
    /// directories are not an error.
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }
}

/// `filename` without its final extension (`"a.b.pdf"` → `"a.b"`).
fn file_base(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

fn check_component(kind: &'static str, value: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if value.is_empty() || !single_normal || value.contains(['/', '\\']) {
        return Err(FormError::InvalidName {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}
