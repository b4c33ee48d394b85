//! Primitive vector arithmetic over fixed-dimension `f32` vectors.
//!
//! All accumulation happens in `f64` so that long vectors do not lose
//! precision when summing many small products.

use hotelsearch_core::error::{HotelSearchError, Result};

/// Fail unless both vectors have the same dimensionality.
pub fn check_dimensions(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(HotelSearchError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Dot product accumulated in double precision.
///
/// Callers must ensure equal lengths; see [`cosine_similarity`].
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Euclidean (L2) norm accumulated in double precision.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| {
            let x = f64::from(*x);
            x * x
        })
        .sum::<f64>()
        .sqrt()
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. Mismatched lengths are a
/// `DimensionMismatch` error: they mean embeddings from different models met.
/// The result is clamped to [-1, 1] to absorb rounding.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    check_dimensions(a.len(), b.len())?;

    let mag_a = l2_norm(a);
    let mag_b = l2_norm(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot(a, b) / (mag_a * mag_b)).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0f32; 100];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0f32; 16];
        let b = vec![-1.0f32; 16];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let mut a = vec![0.0f32; 100];
        let mut b = vec![0.0f32; 100];
        a[0] = 1.0;
        b[1] = 1.0;
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_magnitude_invariant() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![10.0f32, 20.0, 30.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let zero = vec![0.0f32; 100];
        let v = vec![1.0f32; 100];
        assert_eq!(cosine_similarity(&zero, &v).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&v, &zero).unwrap(), 0.0);
        let both = cosine_similarity(&zero, &zero).unwrap();
        assert_eq!(both, 0.0);
        assert!(!both.is_nan());
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        let a = vec![1.0f32; 10];
        let b = vec![1.0f32; 20];
        let err = cosine_similarity(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            HotelSearchError::DimensionMismatch {
                expected: 10,
                actual: 20
            }
        ));
    }

    #[test]
    fn test_cosine_similarity_high_dimension_precision() {
        // Many tiny components: f32 accumulation would drift here.
        let a = vec![1e-3f32; 4096];
        let mut b = a.clone();
        b[0] = 2e-3;
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim > 0.0 && sim <= 1.0);
        assert!((sim - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_dot_and_norm() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(l2_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(l2_norm(&[]), 0.0);
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(512, 512).is_ok());
        assert!(check_dimensions(512, 384).is_err());
    }
}
