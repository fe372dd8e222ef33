//! Vector post-processing shared by the inference and index crates.

/// Arithmetic per-dimension mean over token-level embeddings.
///
/// Returns an empty vector for empty input. Rows are assumed to share the
/// first row's dimension; shorter rows contribute zeros for the missing
/// trailing dimensions.
pub fn mean_pool(token_embeddings: &[Vec<f32>]) -> Vec<f32> {
    let rows = token_embeddings.len();
    if rows == 0 {
        return Vec::new();
    }
    let dim = token_embeddings[0].len();
    let mut pooled = vec![0.0f32; dim];
    for row in token_embeddings {
        for (i, v) in row.iter().take(dim).enumerate() {
            pooled[i] += v;
        }
    }
    for v in &mut pooled {
        *v /= rows as f32;
    }
    pooled
}

/// L2-normalize a vector in place and return it.
///
/// A zero norm is treated as 1.0, so an all-zero vector passes through
/// unchanged instead of dividing by zero.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    for v in &mut vector {
        *v /= norm;
    }
    vector
}

/// Cosine similarity between two vectors.
///
/// Zero-norm inputs score 0.0. Dimension mismatches compare the common
/// prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
