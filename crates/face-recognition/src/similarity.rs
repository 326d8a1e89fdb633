//! Embedding normalization and similarity scoring

use crate::template::FaceTemplate;
use crate::FaceRecognitionError;

const MIN_NORM: f32 = 1e-12;

/// Euclidean norm
#[inline]
#[must_use]
pub fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `vector` to unit length in place; a zero vector is left unchanged
pub fn normalize(vector: &mut [f32]) {
    let n = norm(vector);
    if n > 0.0 {
        let inv = 1.0 / n;
        for x in vector.iter_mut() {
            *x *= inv;
        }
    }
}

/// Cosine similarity in `[-1, 1]`; 0 when either vector has no length
#[inline]
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Embeddings must have same dimension");

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = norm(a);
    let norm_b = norm(b);

    if norm_a > MIN_NORM && norm_b > MIN_NORM {
        dot_product / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// Map cosine similarity onto the `[0, 1]` score range
#[inline]
#[must_use]
pub fn similarity_score(cosine: f32) -> f32 {
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Score `query` against each candidate, in candidate order
pub fn compare_one<'a, I>(query: &[f32], candidates: I) -> Result<Vec<f32>, FaceRecognitionError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    candidates
        .into_iter()
        .map(|candidate| {
            if candidate.len() != query.len() {
                return Err(FaceRecognitionError::TemplateDimensionMismatch {
                    expected: query.len(),
                    actual: candidate.len(),
                });
            }
            Ok(similarity_score(cosine_similarity(query, candidate)))
        })
        .collect()
}

/// Score `template` against each of `templates`
pub fn compare_templates(
    templates: &[FaceTemplate],
    template: &FaceTemplate,
) -> Result<Vec<f32>, FaceRecognitionError> {
    compare_one(&template.data, templates.iter().map(|t| t.data.as_slice()))
}
