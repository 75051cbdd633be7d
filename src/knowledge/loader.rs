//! Knowledge base loading.
//!
//! Reads the law/scheme snapshot files produced offline and folds them into a
//! single [`Corpus`]. A missing file refuses to load unless the caller opted
//! into a degraded empty corpus.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::{Corpus, EntryKind, KnowledgeEntry};
use super::records::SourceRecord;
use crate::config::KnowledgeBaseConfig;

/// What kind of records a source file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Law,
    Scheme,
    /// Every record carries its own `type`
    Mixed,
}

/// One snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Errors that can occur while loading the knowledge base.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeBaseError {
    #[error("knowledge base file not found: {}", .path.display())]
    KnowledgeBaseMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("knowledge base file {} is malformed: {source}", .path.display())]
    KnowledgeBaseMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-load counters, logged once when loading finishes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped_records: usize,
    pub missing_embeddings: usize,
    pub dimension_mismatches: usize,
}

/// Load the knowledge base described by `config`.
///
/// Relative source paths are resolved against `base_path`.
pub fn load(config: &KnowledgeBaseConfig, base_path: &Path) -> Result<Corpus, KnowledgeBaseError> {
    let sources: Vec<SourceConfig> = config
        .sources
        .iter()
        .map(|source| SourceConfig {
            path: base_path.join(&source.path),
            kind: source.kind,
        })
        .collect();

    match load_sources(&sources, config.dimensions) {
        Ok((corpus, _)) => Ok(corpus),
        Err(err @ KnowledgeBaseError::KnowledgeBaseMissing { .. }) if config.allow_missing => {
            log::error!("{err}; running with an empty knowledge base, searches will return no results");
            Ok(Corpus::degraded())
        }
        Err(err) => Err(err),
    }
}

/// Load and merge sources in order.
pub fn load_sources(
    sources: &[SourceConfig],
    dimensions: Option<usize>,
) -> Result<(Corpus, LoadReport), KnowledgeBaseError> {
    let mut report = LoadReport::default();
    let mut entries = Vec::new();

    for source in sources {
        let records = read_records(&source.path)?;
        let before = entries.len();

        for (idx, value) in records.into_iter().enumerate() {
            match parse_record(source.kind, value) {
                Some(record) => entries.push(record.into_entry()),
                None => {
                    log::debug!("{}: skipping unreadable record #{}", source.path.display(), idx);
                    report.skipped_records += 1;
                }
            }
        }

        log::info!(
            "Loaded {} records from {}",
            entries.len() - before,
            source.path.display()
        );
    }

    let dimensions = dimensions.or_else(|| first_dimension(&entries));
    report.loaded = entries.len();
    report.missing_embeddings = entries.iter().filter(|e| e.embedding.is_none()).count();
    report.dimension_mismatches = count_mismatches(&entries, dimensions);

    if report.skipped_records > 0 {
        log::warn!("Skipped {} unreadable knowledge base records", report.skipped_records);
    }
    if report.missing_embeddings > 0 {
        log::warn!(
            "{} entries have no usable embedding and are excluded from search",
            report.missing_embeddings
        );
    }
    if report.dimension_mismatches > 0 {
        log::warn!(
            "{} entries have embeddings of the wrong dimension (expected {}) and will never match",
            report.dimension_mismatches,
            dimensions.unwrap_or_default()
        );
    }

    Ok((Corpus::new(entries, dimensions), report))
}

fn read_records(path: &Path) -> Result<Vec<Value>, KnowledgeBaseError> {
    let data = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => KnowledgeBaseError::KnowledgeBaseMissing {
            path: path.to_path_buf(),
            source,
        },
        _ => KnowledgeBaseError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_json::from_slice(&data).map_err(|source| KnowledgeBaseError::KnowledgeBaseMalformed {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_record(kind: SourceKind, value: Value) -> Option<SourceRecord> {
    let kind = match kind {
        SourceKind::Law => EntryKind::Law,
        SourceKind::Scheme => EntryKind::Scheme,
        SourceKind::Mixed => SourceRecord::kind_of(&value)?,
    };
    SourceRecord::parse(kind, value).ok()
}

fn first_dimension(entries: &[KnowledgeEntry]) -> Option<usize> {
    entries.iter().find_map(|e| e.embedding.as_ref().map(Vec::len))
}

fn count_mismatches(entries: &[KnowledgeEntry], dimensions: Option<usize>) -> usize {
    let Some(dimensions) = dimensions else {
        return 0;
    };
    entries
        .iter()
        .filter_map(|e| e.embedding.as_ref())
        .filter(|embedding| embedding.len() != dimensions)
        .count()
}
