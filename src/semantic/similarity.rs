//! Cosine similarity between embedding vectors.

/// Score given to a pair that cannot be compared. It is the lowest possible
/// similarity, so any relevance floor drops it.
pub const MISMATCH_SCORE: f32 = -1.0;

/// Cosine similarity in `[-1, 1]`.
///
/// Returns [`MISMATCH_SCORE`] when either vector is absent, the lengths
/// differ, or either norm is zero. Dot product and norms are accumulated in
/// a single pass in `f64`.
pub fn cosine_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
    let (Some(a), Some(b)) = (a, b) else {
        return MISMATCH_SCORE;
    };
    if a.len() != b.len() || a.is_empty() {
        return MISMATCH_SCORE;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return MISMATCH_SCORE;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !score.is_finite() {
        return MISMATCH_SCORE;
    }
    score.clamp(-1.0, 1.0) as f32
}
