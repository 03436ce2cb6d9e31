//! Violation records and the exclusion model.

mod exclusions;
mod violation;

pub use exclusions::{ExclusionSet, ExclusionStore, ExclusionStoreError, JsonFileStore, MemoryStore};
pub use violation::{ErrorKind, Violation};
