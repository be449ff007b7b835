//! The JSON hand-off files between the two processing phases.
//!
//! The intermediate artifact is a pretty-printed array of field names; the
//! finalized artifact is an object mapping field names to values, produced
//! by an outside actor and consumed by exactly one successful fill.

use crate::{FormError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CLAIM_SUFFIX: &str = ".claimed";

/// Write `names` to `path` as an indented UTF-8 JSON array.
///
/// The file is staged in the same directory and renamed into place, so a
/// reader never observes a half-written list.
pub fn write_field_names(path: &Path, names: &[String]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut staged, names)?;
    staged.flush()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ── FieldValueMap ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl RawValue {
    fn into_text(self) -> String {
        match self {
            RawValue::Text(text) => text,
            RawValue::Number(n) => n.to_string(),
            RawValue::Flag(b) => b.to_string(),
        }
    }
}

/// Field name → value mapping read from the finalized artifact.
///
/// Strings are taken verbatim, numbers and booleans are written in their JSON
/// spelling, and `null` entries are dropped. Nested arrays or objects make
/// the whole map invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValueMap {
    values: BTreeMap<String, String>,
}

impl FieldValueMap {
    /// Parse a map from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, Option<RawValue>> = serde_json::from_str(text)?;
        Ok(raw
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v.into_text())))
            .collect())
    }

    /// Read and parse the map stored at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Field names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ── ClaimedArtifact ──────────────────────────────────────────────────────────

/// Exclusive hold on a finalized artifact for the duration of one fill.
///
/// Claiming renames `<finalized>` to `<finalized>.claimed`; a second
/// invocation racing for the same file finds it gone and fails with
/// [`FormError::AlreadyClaimed`]. Unless [`consume`](Self::consume) succeeds,
/// dropping the claim renames the file back, leaving the artifact exactly as
/// the outside actor wrote it. If a new artifact appeared in the meantime the
/// claimed copy stays where it is.
#[derive(Debug)]
pub struct ClaimedArtifact {
    original: PathBuf,
    claimed: PathBuf,
    settled: bool,
}

impl ClaimedArtifact {
    /// Path a claimed copy of `finalized` is moved to.
    pub fn claim_path(finalized: &Path) -> PathBuf {
        let mut name = finalized.as_os_str().to_os_string();
        name.push(CLAIM_SUFFIX);
        PathBuf::from(name)
    }

    pub fn claim(finalized: &Path) -> Result<Self> {
        let claimed = Self::claim_path(finalized);
        match std::fs::rename(finalized, &claimed) {
            Ok(()) => {
                debug!(path = %finalized.display(), "claimed finalized artifact");
                Ok(Self {
                    original: finalized.to_path_buf(),
                    claimed,
                    settled: false,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FormError::AlreadyClaimed(finalized.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Where the claimed content currently lives.
    pub fn path(&self) -> &Path {
        &self.claimed
    }

    pub fn load(&self) -> Result<FieldValueMap> {
        FieldValueMap::load(&self.claimed)
    }

    /// Delete the artifact: the fill it fed has been saved.
    pub fn consume(mut self) -> Result<()> {
        std::fs::remove_file(&self.claimed)?;
        self.settled = true;
        debug!(path = %self.original.display(), "consumed finalized artifact");
        Ok(())
    }
}

impl Drop for ClaimedArtifact {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // A fresh map written while the claim was held must not be clobbered.
        if self.original.exists() {
            warn!(
                path = %self.original.display(),
                claimed = %self.claimed.display(),
                "finalized artifact was rewritten during the claim; leaving claimed copy"
            );
            return;
        }
        match std::fs::rename(&self.claimed, &self.original) {
            Ok(()) => debug!(path = %self.original.display(), "released finalized artifact"),
            Err(e) => warn!(
                path = %self.claimed.display(),
                error = %e,
                "could not restore finalized artifact"
            ),
        }
    }
}
