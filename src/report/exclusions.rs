use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::violation::Violation;

/// The set of defects a user has reviewed and waived, keyed by the
/// violations' stable serialization keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExclusionSet {
    entries: HashMap<String, Option<String>>,
}

impl ExclusionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Waive a violation, optionally with a reviewer comment.
    pub fn record(&mut self, violation: &Violation, comment: Option<&str>) {
        self.entries
            .insert(violation.serialize_key(), comment.map(str::to_owned));
    }

    /// Snapshot the waived state of a finished run: rebuild the set
    /// from every violation currently marked excluded, carrying its
    /// comment. Previous contents are replaced wholesale, so entries
    /// whose violations no longer exist drop out.
    pub fn record_all(&mut self, violations: &[Violation]) {
        self.entries.clear();
        for v in violations.iter().filter(|v| v.excluded) {
            self.entries.insert(v.serialize_key(), v.comment.clone());
        }
    }

    pub fn remove(&mut self, violation: &Violation) -> bool {
        self.entries.remove(&violation.serialize_key()).is_some()
    }

    #[must_use]
    pub fn contains(&self, violation: &Violation) -> bool {
        self.entries.contains_key(&violation.serialize_key())
    }

    /// Mark every matching violation excluded and copy the stored
    /// comment onto it. Violations keep their full record either way;
    /// exclusion is presentation state, not deletion.
    pub fn resolve(&self, violations: &mut [Violation]) {
        for v in violations {
            if let Some(comment) = self.entries.get(&v.serialize_key()) {
                v.excluded = true;
                v.comment.clone_from(comment);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExclusionStoreError {
    #[error("reading exclusions: {0}")]
    Io(#[from] io::Error),
    #[error("decoding exclusions: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence seam for exclusions. The engine only ever sees an
/// `ExclusionSet`; where it lives is the store's business.
pub trait ExclusionStore {
    fn load(&self) -> Result<ExclusionSet, ExclusionStoreError>;
    fn save(&mut self, set: &ExclusionSet) -> Result<(), ExclusionStoreError>;
}

/// In-memory store, for tests and transient sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    set: ExclusionSet,
}

impl ExclusionStore for MemoryStore {
    fn load(&self) -> Result<ExclusionSet, ExclusionStoreError> {
        Ok(self.set.clone())
    }

    fn save(&mut self, set: &ExclusionSet) -> Result<(), ExclusionStoreError> {
        self.set = set.clone();
        Ok(())
    }
}

/// JSON file store. A missing file loads as the empty set so a fresh
/// project needs no setup step.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExclusionStore for JsonFileStore {
    fn load(&self) -> Result<ExclusionSet, ExclusionStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ExclusionSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, set: &ExclusionSet) -> Result<(), ExclusionStoreError> {
        let text = serde_json::to_string_pretty(set)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}
