use std::f64::consts::PI;

use ndarray::{Array1, Array2};

use crate::error::{Result, RlError};
use crate::features::StateFeatures;

/// Cosine basis `cos(pi * c . x)` over the state scaled into the unit box,
/// with one coefficient vector `c` per point of `{0, ..., order}^d`.
pub struct FourierBasis<S> {
    lower: Array1<f64>,
    range: Array1<f64>,
    coefficients: Array2<f64>,
    to_vec: fn(&S) -> Vec<f64>,
}

impl<S> FourierBasis<S> {
    pub fn new(lower: &[f64], upper: &[f64], order: usize, to_vec: fn(&S) -> Vec<f64>) -> Result<Self> {
        let (lower, range) = unit_box(lower, upper)?;
        let dims = lower.len();
        let n_terms = (order + 1).pow(dims as u32);
        // row i spells i in base order + 1
        let coefficients = Array2::from_shape_fn((n_terms, dims), |(i, d)| {
            ((i / (order + 1).pow(d as u32)) % (order + 1)) as f64
        });
        Ok(Self {
            lower,
            range,
            coefficients,
            to_vec,
        })
    }

    pub fn coefficients(&self) -> &Array2<f64> {
        &self.coefficients
    }
}

impl<S> StateFeatures<S> for FourierBasis<S> {
    fn dim(&self) -> usize {
        self.coefficients.nrows()
    }

    fn features(&self, s: &S) -> Array1<f64> {
        let x = normalize(&(self.to_vec)(s), &self.lower, &self.range);
        self.coefficients.dot(&x).mapv(|v| (PI * v).cos())
    }
}

/// Lower corner and side lengths of a bounding box.
pub(crate) fn unit_box(lower: &[f64], upper: &[f64]) -> Result<(Array1<f64>, Array1<f64>)> {
    if lower.len() != upper.len() || lower.is_empty() {
        return Err(RlError::InvalidParameter(
            "feature bounds must have the same non-zero length".to_string(),
        ));
    }
    if lower.iter().zip(upper).any(|(l, u)| u <= l) {
        return Err(RlError::InvalidParameter(
            "feature upper bounds must exceed lower bounds".to_string(),
        ));
    }
    let lower = Array1::from(lower.to_vec());
    let range = Array1::from(upper.to_vec()) - &lower;
    Ok((lower, range))
}

pub(crate) fn normalize(x: &[f64], lower: &Array1<f64>, range: &Array1<f64>) -> Array1<f64> {
    ((Array1::from(x.to_vec()) - lower) / range).mapv(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(s: &(f64, f64)) -> Vec<f64> {
        vec![s.0, s.1]
    }

    #[test]
    fn order_zero_is_a_constant() {
        let fb = FourierBasis::new(&[0.0, 0.0], &[1.0, 1.0], 0, pair).unwrap();
        assert_eq!(fb.dim(), 1);
        assert_eq!(fb.features(&(0.3, 0.7)).to_vec(), vec![1.0]);
    }

    #[test]
    fn corners_of_the_box_give_signed_ones() {
        let fb = FourierBasis::new(&[-1.0, 0.0], &[1.0, 10.0], 2, pair).unwrap();
        assert_eq!(fb.dim(), 9);
        assert!(fb.features(&(-1.0, 0.0)).iter().all(|f| (f - 1.0).abs() < 1e-12));
        let upper = fb.features(&(1.0, 10.0));
        for (row, f) in fb.coefficients().rows().into_iter().zip(upper.iter()) {
            let sign = if row.sum() as usize % 2 == 0 { 1.0 } else { -1.0 };
            assert!((f - sign).abs() < 1e-12);
        }
    }

    #[test]
    fn every_coefficient_vector_appears_once() {
        let fb = FourierBasis::new(&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0], 3, |s: &[f64; 3]| s.to_vec()).unwrap();
        let mut rows: Vec<Vec<u64>> = fb
            .coefficients()
            .rows()
            .into_iter()
            .map(|r| r.iter().map(|c| *c as u64).collect())
            .collect();
        rows.sort();
        rows.dedup();
        assert_eq!(rows.len(), 64);
    }

    #[test]
    fn bad_bounds_are_rejected() {
        assert!(FourierBasis::new(&[0.0], &[0.0], 1, |s: &f64| vec![*s]).is_err());
        assert!(FourierBasis::new(&[0.0, 1.0], &[1.0], 1, |s: &f64| vec![*s]).is_err());
    }
}
