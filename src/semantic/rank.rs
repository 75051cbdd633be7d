//! Similarity ranking of a corpus against a query vector.

use serde::{Deserialize, Serialize};

use super::similarity::cosine_similarity;
use crate::knowledge::KnowledgeEntry;

/// Default relevance floor. Scores at or below it are noise.
pub const DEFAULT_MIN_SCORE: f32 = 0.1;

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    /// Exclusive lower bound on the score
    pub min_score: f32,
    pub limit: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// A search result as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub title: String,
    pub description: String,
    pub reference_link: Option<String>,
    pub score: f32,
}

impl SearchHit {
    fn new(entry: &KnowledgeEntry, score: f32) -> Self {
        Self {
            title: entry.title.clone(),
            description: entry.display_description().to_string(),
            reference_link: entry.reference_link.clone(),
            score,
        }
    }
}

/// Score every entry against `query` and return the best matches.
///
/// Entries without an embedding, or with one of the wrong length, score the
/// mismatch sentinel and fall below any floor. Ties keep corpus order.
pub fn rank_by_similarity(
    entries: &[KnowledgeEntry],
    query: &[f32],
    options: &RankOptions,
) -> Vec<SearchHit> {
    let mut scored: Vec<(&KnowledgeEntry, f32)> = entries
        .iter()
        .map(|entry| (entry, cosine_similarity(Some(query), entry.embedding.as_deref())))
        .filter(|(_, score)| *score > options.min_score)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(options.limit);

    scored
        .into_iter()
        .map(|(entry, score)| SearchHit::new(entry, score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{law, unit_at};

    const QUERY: [f32; 2] = [1.0, 0.0];

    #[test]
    fn test_threshold_and_order() {
        let entries = vec![
            law("low", &[], Some(unit_at(0.05))),
            law("mid", &[], Some(unit_at(0.5))),
            law("high", &[], Some(unit_at(0.9))),
        ];

        let hits = rank_by_similarity(&entries, &QUERY, &RankOptions::default());

        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "mid"]);
        assert!((hits[0].score - 0.9).abs() < 1e-5);
        assert!((hits[1].score - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_floor_is_exclusive() {
        let entries = vec![law("edge", &[], Some(vec![1.0, 0.0]))];
        let options = RankOptions { min_score: 1.0, limit: 10 };

        assert!(rank_by_similarity(&entries, &QUERY, &options).is_empty());
    }

    #[test]
    fn test_top_k_truncation() {
        let entries: Vec<_> = (0..15)
            .map(|i| law(&format!("e{i}"), &[], Some(unit_at(0.2 + i as f32 * 0.05))))
            .collect();

        let hits = rank_by_similarity(&entries, &QUERY, &RankOptions::default());

        assert_eq!(hits.len(), 10);
        let titles: Vec<String> = hits.iter().map(|h| h.title.clone()).collect();
        let expected: Vec<String> = (5..15).rev().map(|i| format!("e{i}")).collect();
        assert_eq!(titles, expected);
        assert!(hits.windows(2).all(|w| w[0].score > w[1].score));
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let entries = vec![
            law("first", &[], Some(vec![1.0, 1.0])),
            law("second", &[], Some(vec![1.0, 1.0])),
            law("third", &[], Some(vec![1.0, 1.0])),
        ];

        let hits = rank_by_similarity(&entries, &QUERY, &RankOptions::default());
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_bad_entries_silently_excluded() {
        let entries = vec![
            law("missing", &[], None),
            law("wrong dims", &[], Some(vec![1.0, 0.0, 0.0])),
            law("zero", &[], Some(vec![0.0, 0.0])),
            law("good", &[], Some(vec![1.0, 0.0])),
        ];

        let hits = rank_by_similarity(&entries, &QUERY, &RankOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "good");
    }

    #[test]
    fn test_description_falls_back_to_details() {
        let mut with_details = law("scheme-like", &[], Some(vec![1.0, 0.0]));
        with_details.details = Some("scheme details".to_string());
        let bare = law("bare", &[], Some(vec![1.0, 0.0]));

        let hits = rank_by_similarity(&[with_details, bare], &QUERY, &RankOptions::default());
        assert_eq!(hits[0].description, "scheme details");
        assert_eq!(hits[1].description, "");
    }

    #[test]
    fn test_hit_serializes_camel_case() {
        let mut entry = law("RTI", &[], Some(vec![1.0, 0.0]));
        entry.reference_link = Some("https://example.org".to_string());

        let hits = rank_by_similarity(&[entry], &QUERY, &RankOptions::default());
        let json = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(json["referenceLink"], "https://example.org");
        assert_eq!(json["description"], "");
    }
}
