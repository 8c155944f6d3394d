/// Similarity primitives for hybrid scoring
use std::collections::HashSet;

/// Cosine similarity between two vectors
///
/// Defined as 0 when either vector is all-zero, and 0 on a length mismatch
/// (a malformed embedding should never dominate a ranking).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Jaccard similarity of two tag sets: |A∩B| / |A∪B|, 0 when both are empty
pub fn jaccard<'a, A, B>(a: A, b: B) -> f64
where
    A: IntoIterator<Item = &'a str>,
    B: IntoIterator<Item = &'a str>,
{
    let set_a: HashSet<&str> = a.into_iter().collect();
    let set_b: HashSet<&str> = b.into_iter().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = [1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard_both_empty_is_zero() {
        let empty: [&str; 0] = [];
        assert_eq!(jaccard(empty, empty), 0.0);
    }

    #[test]
    fn test_jaccard_disjoint_sets() {
        assert_eq!(jaccard(["sweet"], ["savory"]), 0.0);
    }

    #[test]
    fn test_jaccard_overlap() {
        // {sweet, spicy} vs {spicy, savory}: 1 shared of 3 total
        let sim = jaccard(["sweet", "spicy"], ["spicy", "savory"]);
        assert!((sim - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard_identical_sets() {
        assert_eq!(jaccard(["fried", "grilled"], ["grilled", "fried"]), 1.0);
    }
}
