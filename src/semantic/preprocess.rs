//! Document text preparation for embedding generation.
//!
//! Serializes a law or scheme record into the single string that gets
//! embedded:
//! 1. Pick the designated fields in a fixed order
//! 2. Render tag lists as `", "`-joined text
//! 3. Render missing fields as empty strings
//! 4. Join everything with `". "`
//!
//! The output only depends on the record, so re-running the snapshot build
//! produces the same text for the same input.

use sha2::{Digest, Sha256};

use crate::knowledge::{LawRecord, SchemeRecord, SourceRecord};

/// Separator between fields
const FIELD_SEPARATOR: &str = ". ";

/// Separator between tags
const TAG_SEPARATOR: &str = ", ";

/// Text for a law: title, description, tags.
pub fn law_text(law: &LawRecord) -> String {
    let tags = law.tags.join(TAG_SEPARATOR);
    join_fields(&[
        Some(law.title.as_str()),
        law.description.as_deref(),
        Some(tags.as_str()),
    ])
}

/// Text for a scheme: name, details, benefits, eligibility, category.
pub fn scheme_text(scheme: &SchemeRecord) -> String {
    join_fields(&[
        Some(scheme.name.as_str()),
        scheme.details.as_deref(),
        scheme.benefits.as_deref(),
        scheme.eligibility.as_deref(),
        scheme.category.as_deref(),
    ])
}

/// Text for a record of either kind.
pub fn document_text(record: &SourceRecord) -> String {
    match record {
        SourceRecord::Law(law) => law_text(law),
        SourceRecord::Scheme(scheme) => scheme_text(scheme),
    }
}

fn join_fields(fields: &[Option<&str>]) -> String {
    fields
        .iter()
        .map(|field| field.unwrap_or_default())
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

/// SHA-256 of the document text, hex encoded.
/// Used to check that a rebuilt snapshot embedded the same text.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
