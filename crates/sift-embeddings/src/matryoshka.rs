//! Matryoshka dimension management.
//!
//! Matryoshka-trained models front-load information, so a prefix of the
//! vector is a usable lower-dimensional embedding once renormalized.

use sift_core::errors::EmbeddingError;

/// Scale to unit length in place. Zero vectors are left alone.
pub fn renormalize(embedding: &mut [f32]) {
    sift_core::vector::normalize(embedding);
}

/// Truncate an embedding to the target dimension count and renormalize.
///
/// # Errors
/// Returns `DimensionMismatch` if `target_dims > embedding.len()`.
pub fn truncate(embedding: &[f32], target_dims: usize) -> Result<Vec<f32>, EmbeddingError> {
    if target_dims > embedding.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: target_dims,
            actual: embedding.len(),
        });
    }
    let mut truncated = embedding[..target_dims].to_vec();
    renormalize(&mut truncated);
    Ok(truncated)
}

/// Validate that an embedding has the expected dimensions.
pub fn validate_dimensions(embedding: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if embedding.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

/// Bring a provider vector to exactly `dims`: truncate longer ones,
/// reject shorter ones.
pub fn fit_to(embedding: Vec<f32>, dims: usize) -> Result<Vec<f32>, EmbeddingError> {
    match embedding.len().cmp(&dims) {
        std::cmp::Ordering::Equal => Ok(embedding),
        std::cmp::Ordering::Greater => truncate(&embedding, dims),
        std::cmp::Ordering::Less => Err(EmbeddingError::DimensionMismatch {
            expected: dims,
            actual: embedding.len(),
        }),
    }
}

/// Cosine over the shared prefix of two vectors of possibly different length.
///
/// Both prefixes are renormalized before the dot product.
pub fn overlap_cosine(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    sift_core::vector::cosine_similarity(&a[..n], &b[..n])
}
