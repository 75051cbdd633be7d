//! Uniform corpus entry shared by both ranking paths.

use serde::{Deserialize, Serialize};

/// Source category of a knowledge entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Law,
    Scheme,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Law => write!(f, "law"),
            EntryKind::Scheme => write!(f, "scheme"),
        }
    }
}

/// One law or scheme, renamed onto the common schema.
///
/// Scheme-only attributes are carried through untouched and never take part
/// in scoring. The embedding is not serialized: callers get the record,
/// not the vector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    /// Position in the corpus
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_link: Option<String>,
    /// `None` when the snapshot held no usable vector for this entry
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl KnowledgeEntry {
    /// Display body: `description`, falling back to `details`, then empty.
    pub fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .or(self.details.as_deref())
            .unwrap_or_default()
    }

    pub fn is_searchable(&self) -> bool {
        self.embedding.is_some()
    }
}

/// Read-only in-memory knowledge base.
///
/// Built once per process and never patched; a new snapshot means a new
/// `Corpus`.
#[derive(Debug, Default)]
pub struct Corpus {
    entries: Vec<KnowledgeEntry>,
    dimensions: Option<usize>,
    degraded: bool,
}

impl Corpus {
    /// Build a corpus, renumbering ids to match positions.
    pub fn new(mut entries: Vec<KnowledgeEntry>, dimensions: Option<usize>) -> Self {
        for (id, entry) in entries.iter_mut().enumerate() {
            entry.id = id;
        }
        Self {
            entries,
            dimensions,
            degraded: false,
        }
    }

    /// Empty corpus standing in for a knowledge base that failed to load.
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn get(&self, id: usize) -> Option<&KnowledgeEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries carrying an embedding.
    pub fn searchable_len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_searchable()).count()
    }

    /// Expected embedding dimensionality, if known.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}
