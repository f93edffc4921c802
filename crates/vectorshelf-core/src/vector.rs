//! Similarity kernel: unit normalization and cosine similarity.
//!
//! All three index implementations operate on already-normalized vectors,
//! so cosine similarity reduces to a plain dot product (see [`cosine`]).
//! [`normalize`] is the only place a zero vector is rejected.

use crate::error::{CoreError, CoreResult};

/// Tolerance used for "is this unit-length" and "is this tied" checks
/// throughout the crate.
pub const EPS: f32 = 1e-6;

pub type Vector = Vec<f32>;

/// L2 norm of `v`.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Returns `v / ||v||_2`. Fails with [`CoreError::DegenerateVector`] if `v`
/// has (near-)zero magnitude.
pub fn normalize(v: &[f32]) -> CoreResult<Vector> {
    let mag = magnitude(v);
    if mag < EPS {
        return Err(CoreError::DegenerateVector);
    }
    Ok(v.iter().map(|x| x / mag).collect())
}

/// `true` if `v` is unit-length within [`EPS`].
pub fn is_normalized(v: &[f32]) -> bool {
    let mag = magnitude(v);
    (mag - 1.0).abs() <= EPS
}

/// Dot product of two equal-length vectors.
///
/// Inputs are assumed already unit-normalized, so this *is* cosine
/// similarity; callers outside the index family should normalize first.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "cosine: dimension mismatch");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_vector_is_noop() {
        let v = normalize(&[1.0, 0.0, 0.0]).unwrap();
        assert!((magnitude(&v) - 1.0).abs() < EPS);
        assert_eq!(v, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn normalize_scales_to_unit_length() {
        let v = normalize(&[3.0, 4.0]).unwrap();
        assert!((magnitude(&v) - 1.0).abs() < EPS);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector_fails() {
        let err = normalize(&[0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateVector));
    }

    #[test]
    fn normalize_near_zero_vector_fails() {
        let err = normalize(&[1e-8, -1e-8]).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateVector));
    }

    #[test]
    fn cosine_identical_normalized_vectors_is_one() {
        let a = normalize(&[1.0, 2.0, 3.0]).unwrap();
        assert!((cosine(&a, &a) - 1.0).abs() < EPS);
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        let a = normalize(&[1.0, 0.0]).unwrap();
        let b = normalize(&[0.0, 1.0]).unwrap();
        assert!(cosine(&a, &b).abs() < EPS);
    }

    #[test]
    fn cosine_diagonal_pair_matches_known_value() {
        let a = normalize(&[1.0, 0.0]).unwrap();
        let b = normalize(&[1.0, 1.0]).unwrap();
        assert!((cosine(&a, &b) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }
}
