//! Knowledge base of laws and government schemes.
//!
//! - `records`: raw law/scheme records as stored in snapshot files
//! - `entry`: the uniform [`KnowledgeEntry`] and read-only [`Corpus`]
//! - `loader`: snapshot loading with degraded-mode support

mod entry;
mod loader;
mod records;

pub use entry::{Corpus, EntryKind, KnowledgeEntry};
pub use loader::{load, KnowledgeBaseError, SourceConfig, SourceKind};
#[cfg(test)]
pub use loader::load_sources;
pub use records::{LawRecord, SchemeRecord, SourceRecord};
