//! Offline snapshot builder.
//!
//! Reads raw law and scheme records, embeds the document text of each, and
//! writes a mixed snapshot: the original record fields plus `type` and
//! `embedding`. The result is loadable as a `mixed` knowledge base source.

use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::knowledge::{EntryKind, SourceRecord};
use crate::semantic::{content_hash, document_text, normalize, EmbedOptions, Embedder};

/// Texts per embedding call.
const BATCH_SIZE: usize = 32;

/// A raw input file and the kind of records it holds.
#[derive(Debug, Clone)]
pub struct BuildInput {
    pub path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub written: usize,
    pub skipped: usize,
    pub dimensions: Option<usize>,
    /// SHA-256 over every document text in order; equal digests mean the
    /// same inputs were embedded.
    pub text_digest: String,
}

/// Embed every record of `inputs` and write the snapshot to `output`.
///
/// Records that do not parse are skipped, an embedding failure aborts the
/// build so a partial snapshot is never written.
pub fn build(
    inputs: &[BuildInput],
    embedder: &dyn Embedder,
    output: &Path,
    show_progress: bool,
) -> anyhow::Result<BuildReport> {
    let mut records = Vec::new();
    let mut report = BuildReport::default();

    for input in inputs {
        let data = std::fs::read(&input.path)
            .with_context(|| format!("failed to read {}", input.path.display()))?;
        let values: Vec<Value> = serde_json::from_slice(&data)
            .with_context(|| format!("{} is not a JSON array", input.path.display()))?;

        for (idx, value) in values.into_iter().enumerate() {
            match SourceRecord::parse(input.kind, value.clone()) {
                Ok(record) => records.push((record, value)),
                Err(err) => {
                    log::warn!("{} record #{idx} skipped: {err}", input.path.display());
                    report.skipped += 1;
                }
            }
        }
    }

    let progress = if show_progress {
        ProgressBar::new(records.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let options = EmbedOptions::default();
    let mut snapshot = Vec::with_capacity(records.len());
    let mut all_texts = String::new();

    for chunk in records.chunks(BATCH_SIZE) {
        let texts: Vec<String> = chunk.iter().map(|(record, _)| document_text(record)).collect();
        let raw = embedder
            .embed_batch(&texts, &options)
            .with_context(|| format!("failed to embed batch starting at {:?}", short(&texts[0])))?;
        if raw.len() != texts.len() {
            anyhow::bail!("expected {} embeddings, got {}", texts.len(), raw.len());
        }

        for (((record, value), text), raw) in chunk.iter().zip(&texts).zip(raw) {
            let embedding = normalize(raw)
                .with_context(|| format!("failed to embed {:?}", short(text)))?;

            match report.dimensions {
                None => report.dimensions = Some(embedding.len()),
                Some(dim) if dim != embedding.len() => anyhow::bail!(
                    "embedding dimension changed mid-build: {} then {}",
                    dim,
                    embedding.len()
                ),
                Some(_) => {}
            }

            let mut value = value.clone();
            if let Value::Object(map) = &mut value {
                map.insert("type".into(), Value::String(record.kind().to_string()));
                map.insert("embedding".into(), serde_json::to_value(&embedding)?);
            }
            snapshot.push(value);

            all_texts.push_str(text);
            all_texts.push('\n');
        }
        progress.inc(chunk.len() as u64);
    }
    progress.finish_and_clear();

    let body = serde_json::to_vec_pretty(&snapshot)?;
    std::fs::write(output, body).with_context(|| format!("failed to write {}", output.display()))?;

    report.written = snapshot.len();
    report.text_digest = content_hash(&all_texts);
    log::info!(
        "Wrote {} entries to {} ({} skipped)",
        report.written,
        output.display(),
        report.skipped
    );
    Ok(report)
}

fn short(text: &str) -> String {
    text.chars().take(60).collect()
}
