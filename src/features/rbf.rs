use ndarray::{Array1, Array2};

use crate::error::{Result, RlError};
use crate::features::fourier::{normalize, unit_box};
use crate::features::StateFeatures;

/// Constant offset followed by one Gaussian `exp(-(d / epsilon)^2)` per
/// center, measured on the state scaled into the unit box.
pub struct RbfFeatures<S> {
    lower: Array1<f64>,
    range: Array1<f64>,
    centers: Array2<f64>,
    epsilon: f64,
    to_vec: fn(&S) -> Vec<f64>,
}

impl<S> RbfFeatures<S> {
    /// Centers on a regular grid of `points_per_dim` per dimension, corners
    /// included.
    pub fn grid(
        lower: &[f64],
        upper: &[f64],
        points_per_dim: usize,
        epsilon: f64,
        to_vec: fn(&S) -> Vec<f64>,
    ) -> Result<Self> {
        if points_per_dim < 2 || epsilon <= 0.0 {
            return Err(RlError::InvalidParameter(format!(
                "rbf grid needs two points per dimension and a positive width, got {} and {}",
                points_per_dim, epsilon
            )));
        }
        let (lower, range) = unit_box(lower, upper)?;
        let dims = lower.len();
        let n_centers = points_per_dim.pow(dims as u32);
        let step = 1.0 / (points_per_dim - 1) as f64;
        let centers = Array2::from_shape_fn((n_centers, dims), |(i, d)| {
            ((i / points_per_dim.pow(d as u32)) % points_per_dim) as f64 * step
        });
        Ok(Self {
            lower,
            range,
            centers,
            epsilon,
            to_vec,
        })
    }
}

impl<S> StateFeatures<S> for RbfFeatures<S> {
    fn dim(&self) -> usize {
        self.centers.nrows() + 1
    }

    fn features(&self, s: &S) -> Array1<f64> {
        let x = normalize(&(self.to_vec)(s), &self.lower, &self.range);
        let mut fv = Array1::ones(self.dim());
        for (i, c) in self.centers.rows().into_iter().enumerate() {
            let d2 = (&c - &x).mapv(|v| v * v).sum();
            fv[i + 1] = (-d2 / (self.epsilon * self.epsilon)).exp();
        }
        fv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_centers_peak_at_their_own_location() {
        let rbf = RbfFeatures::grid(&[-1.2, -0.07], &[0.6, 0.07], 5, 0.2, |s: &(f64, f64)| {
            vec![s.0, s.1]
        })
        .unwrap();
        assert_eq!(rbf.dim(), 26);
        let fv = rbf.features(&(-1.2, -0.07));
        assert_eq!(fv[0], 1.0);
        assert_eq!(fv[1], 1.0);
        // the neighbour one grid step away sits at distance 0.25
        assert!((fv[2] - (-(0.25f64 / 0.2).powi(2)).exp()).abs() < 1e-12);
        assert!(fv.iter().skip(2).all(|f| *f < 1.0));
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        assert!(RbfFeatures::grid(&[0.0], &[1.0], 1, 0.2, |s: &f64| vec![*s]).is_err());
        assert!(RbfFeatures::grid(&[0.0], &[1.0], 3, 0.0, |s: &f64| vec![*s]).is_err());
    }
}
