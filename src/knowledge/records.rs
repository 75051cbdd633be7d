//! Raw source records as they appear in the law and scheme files.
//!
//! Laws and schemes use different field names; both are mapped onto
//! [`KnowledgeEntry`] here.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::entry::{EntryKind, KnowledgeEntry};
use crate::semantic::{normalize, RawEmbedding};

/// A law record. Fields with several spellings in the source files are
/// resolved with a fixed precedence, so a record carrying more than one
/// spelling still parses.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "LawFields")]
pub struct LawRecord {
    pub title: String,
    pub description: Option<String>,
    pub details: Option<String>,
    pub tags: Vec<String>,
    pub reference_link: Option<String>,
    pub embedding: Option<Value>,
}

#[derive(Deserialize)]
struct LawFields {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: Vec<String>,
    #[serde(default, rename = "referenceLink")]
    reference_link_camel: Option<String>,
    #[serde(default)]
    reference_link: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    embedding: Option<Value>,
}

impl From<LawFields> for LawRecord {
    fn from(fields: LawFields) -> Self {
        Self {
            title: fields.title,
            description: fields.description,
            details: fields.details,
            tags: fields.tags,
            reference_link: fields
                .reference_link_camel
                .or(fields.reference_link)
                .or(fields.link),
            embedding: fields.embedding,
        }
    }
}

/// A government scheme record, see [`LawRecord`] for field resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SchemeFields")]
pub struct SchemeRecord {
    pub name: String,
    pub details: Option<String>,
    pub benefits: Option<String>,
    pub eligibility: Option<String>,
    pub application: Option<String>,
    pub documents: Option<String>,
    pub level: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub reference_link: Option<String>,
    pub embedding: Option<Value>,
}

#[derive(Deserialize)]
struct SchemeFields {
    #[serde(default)]
    scheme_name: Option<String>,
    #[serde(default, rename = "schemeName")]
    scheme_name_camel: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    benefits: Option<String>,
    #[serde(default)]
    eligibility: Option<String>,
    #[serde(default)]
    application: Option<String>,
    #[serde(default)]
    documents: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default, rename = "schemeCategory")]
    scheme_category_camel: Option<String>,
    #[serde(default)]
    scheme_category: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: Vec<String>,
    #[serde(default, rename = "referenceLink")]
    reference_link_camel: Option<String>,
    #[serde(default)]
    reference_link: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    embedding: Option<Value>,
}

impl TryFrom<SchemeFields> for SchemeRecord {
    type Error = String;

    fn try_from(fields: SchemeFields) -> Result<Self, Self::Error> {
        let name = fields
            .scheme_name
            .or(fields.scheme_name_camel)
            .or(fields.title)
            .or(fields.name)
            .ok_or("missing field `scheme_name`")?;

        Ok(Self {
            name,
            details: fields.details.or(fields.description),
            benefits: fields.benefits,
            eligibility: fields.eligibility,
            application: fields.application,
            documents: fields.documents,
            level: fields.level,
            category: fields
                .scheme_category_camel
                .or(fields.scheme_category)
                .or(fields.category),
            tags: fields.tags,
            reference_link: fields
                .reference_link_camel
                .or(fields.reference_link)
                .or(fields.link),
            embedding: fields.embedding,
        })
    }
}

/// A record of either kind.
#[derive(Debug, Clone)]
pub enum SourceRecord {
    Law(LawRecord),
    Scheme(SchemeRecord),
}

impl SourceRecord {
    /// Parse a record of a known kind.
    pub fn parse(kind: EntryKind, value: Value) -> Result<Self, serde_json::Error> {
        match kind {
            EntryKind::Law => serde_json::from_value(value).map(SourceRecord::Law),
            EntryKind::Scheme => serde_json::from_value(value).map(SourceRecord::Scheme),
        }
    }

    /// Read the `type` discriminator of a record in a mixed snapshot.
    pub fn kind_of(value: &Value) -> Option<EntryKind> {
        match value.get("type")?.as_str()? {
            "law" => Some(EntryKind::Law),
            "scheme" => Some(EntryKind::Scheme),
            _ => None,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            SourceRecord::Law(_) => EntryKind::Law,
            SourceRecord::Scheme(_) => EntryKind::Scheme,
        }
    }

    fn raw_embedding(&self) -> Option<&Value> {
        match self {
            SourceRecord::Law(law) => law.embedding.as_ref(),
            SourceRecord::Scheme(scheme) => scheme.embedding.as_ref(),
        }
    }

    /// Map onto the common schema. The id is assigned by the corpus.
    pub fn into_entry(self) -> KnowledgeEntry {
        let embedding = self.raw_embedding().and_then(parse_embedding);

        match self {
            SourceRecord::Law(law) => KnowledgeEntry {
                id: 0,
                kind: EntryKind::Law,
                title: law.title,
                description: law.description,
                details: law.details,
                tags: law.tags,
                reference_link: law.reference_link,
                embedding,
                benefits: None,
                eligibility: None,
                application: None,
                documents: None,
                level: None,
                category: None,
            },
            SourceRecord::Scheme(scheme) => KnowledgeEntry {
                id: 0,
                kind: EntryKind::Scheme,
                title: scheme.name,
                description: None,
                details: scheme.details,
                tags: scheme.tags,
                reference_link: scheme.reference_link,
                embedding,
                benefits: scheme.benefits,
                eligibility: scheme.eligibility,
                application: scheme.application,
                documents: scheme.documents,
                level: scheme.level,
                category: scheme.category,
            },
        }
    }
}

/// Accept both `["a", "b"]` and `"a, b"`.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tags::List(tags)) => tags,
        Some(Tags::Joined(tags)) => parse_tags(&tags),
    })
}

/// Split a comma-separated tag string, keeping the original case.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a stored embedding.
///
/// Entries written straight from provider output may hold a batch of one or
/// a `{"data": [...]}` wrapper; these go through the same normalization as
/// query vectors. Anything that does not reduce to a non-empty vector of
/// finite numbers is treated as corrupt.
pub fn parse_embedding(value: &Value) -> Option<Vec<f32>> {
    let raw = RawEmbedding::from_json(value).ok()?;
    let vector = normalize(raw).ok()?;
    (!vector.is_empty() && vector.iter().all(|x| x.is_finite())).then_some(vector)
}
