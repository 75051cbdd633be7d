//! Tag-overlap recommendations for a user profile.
//!
//! Independent of embeddings: an entry is relevant to a user when its tags
//! mention the user's role or interests.

use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeEntry;

/// Default number of recommendations.
pub const DEFAULT_RECOMMEND_LIMIT: usize = 5;

/// Points for a tag equal to the profile role (case-sensitive).
const ROLE_POINTS: u32 = 2;

/// Points per interest found among the tags (case-insensitive).
const INTEREST_POINTS: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub entry: KnowledgeEntry,
    pub score: u32,
}

/// Tag-overlap score of one entry.
pub fn profile_score(entry: &KnowledgeEntry, profile: &UserProfile) -> u32 {
    let role = profile
        .role
        .as_deref()
        .filter(|role| entry.tags.iter().any(|tag| tag == role))
        .map_or(0, |_| ROLE_POINTS);

    let interests = profile
        .interests
        .iter()
        .filter(|interest| {
            let interest = interest.to_lowercase();
            entry.tags.iter().any(|tag| tag.to_lowercase() == interest)
        })
        .count() as u32;

    role + interests * INTEREST_POINTS
}

/// Rank entries by tag overlap with `profile`.
///
/// Zero-score entries are dropped; ties keep corpus order.
pub fn recommend(
    entries: &[KnowledgeEntry],
    profile: &UserProfile,
    limit: usize,
) -> Vec<Recommendation> {
    let mut scored: Vec<(&KnowledgeEntry, u32)> = entries
        .iter()
        .map(|entry| (entry, profile_score(entry, profile)))
        .filter(|(_, score)| *score > 0)
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(entry, score)| Recommendation {
            entry: entry.clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::law;

    fn student() -> UserProfile {
        UserProfile {
            role: Some("student".to_string()),
            interests: vec!["Education".to_string()],
        }
    }

    #[test]
    fn test_role_and_interest_scoring() {
        let both = law("both", &["student", "education"], None);
        let interest_only = law("interest", &["Education"], None);

        assert_eq!(profile_score(&both, &student()), 3);
        assert_eq!(profile_score(&interest_only, &student()), 1);
    }

    #[test]
    fn test_role_match_is_case_sensitive() {
        let entry = law("shouty", &["STUDENT"], None);
        assert_eq!(profile_score(&entry, &student()), 0);
    }

    #[test]
    fn test_each_interest_counts_once() {
        let entry = law("dup", &["education", "EDUCATION", "health"], None);
        let profile = UserProfile {
            role: None,
            interests: vec!["education".to_string(), "Health".to_string()],
        };
        assert_eq!(profile_score(&entry, &profile), 2);
    }

    #[test]
    fn test_recommend_orders_and_excludes_zero() {
        let entries = vec![
            law("none", &["farmer"], None),
            law("interest", &["Education"], None),
            law("both", &["student", "education"], None),
        ];

        let recs = recommend(&entries, &student(), DEFAULT_RECOMMEND_LIMIT);
        let titles: Vec<&str> = recs.iter().map(|r| r.entry.title.as_str()).collect();
        assert_eq!(titles, vec!["both", "interest"]);
        assert_eq!(recs[0].score, 3);
        assert_eq!(recs[1].score, 1);
    }

    #[test]
    fn test_recommend_truncates_and_keeps_ties_stable() {
        let entries: Vec<_> = (0..8)
            .map(|i| law(&format!("e{i}"), &["education"], None))
            .collect();

        let recs = recommend(&entries, &student(), DEFAULT_RECOMMEND_LIMIT);
        let titles: Vec<&str> = recs.iter().map(|r| r.entry.title.as_str()).collect();
        assert_eq!(titles, vec!["e0", "e1", "e2", "e3", "e4"]);
    }

    #[test]
    fn test_recommend_ignores_embeddings() {
        let entries = vec![law("vectorless", &["student"], None)];
        let recs = recommend(&entries, &student(), 5);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].score, 2);
    }

    #[test]
    fn test_empty_profile_recommends_nothing() {
        let entries = vec![law("a", &["student"], None)];
        assert!(recommend(&entries, &UserProfile::default(), 5).is_empty());
    }

    #[test]
    fn test_recommendation_serializes_flat() {
        let entries = vec![law("a", &["student"], Some(vec![1.0]))];
        let recs = recommend(&entries, &student(), 5);
        let json = serde_json::to_value(&recs[0]).unwrap();

        assert_eq!(json["title"], "a");
        assert_eq!(json["score"], 2);
        assert!(json.get("embedding").is_none());
    }
}
