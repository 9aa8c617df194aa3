use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, RlError};

/// How the tilings are shifted against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilingArrangement {
    /// Every tiling gets a random offset in each dimension.
    RandomJitter,
    /// Offsets spread evenly over one tile width.
    Uniform,
}

/// Sparse binary features from overlapping grids over a bounded box.
/// Exactly one tile per tiling is active for any input.
#[derive(Debug, Clone)]
pub struct TileCoding {
    lower: Vec<f64>,
    widths: Vec<f64>,
    tiles_per_dim: usize,
    // fraction of a tile width, one row per tiling
    offsets: Array2<f64>,
}

impl TileCoding {
    pub fn new(
        lower: &[f64],
        upper: &[f64],
        resolution: usize,
        n_tilings: usize,
        arrangement: TilingArrangement,
        seed: u64,
    ) -> Result<Self> {
        if lower.len() != upper.len() || lower.is_empty() {
            return Err(RlError::InvalidParameter(
                "tile coding bounds must have the same non-zero length".to_string(),
            ));
        }
        if resolution == 0 || n_tilings == 0 {
            return Err(RlError::InvalidParameter(
                "tile coding needs at least one tiling and one tile".to_string(),
            ));
        }
        if lower.iter().zip(upper).any(|(l, u)| u <= l) {
            return Err(RlError::InvalidParameter(
                "tile coding upper bounds must exceed lower bounds".to_string(),
            ));
        }
        let dims = lower.len();
        let widths = lower
            .iter()
            .zip(upper)
            .map(|(l, u)| (u - l) / resolution as f64)
            .collect();
        let offsets = match arrangement {
            TilingArrangement::RandomJitter => {
                let mut rng = StdRng::seed_from_u64(seed);
                Array2::random_using((n_tilings, dims), Uniform::new(0.0, 1.0), &mut rng)
            }
            TilingArrangement::Uniform => {
                Array2::from_shape_fn((n_tilings, dims), |(t, _)| t as f64 / n_tilings as f64)
            }
        };
        Ok(Self {
            lower: lower.to_vec(),
            widths,
            tiles_per_dim: resolution + 1,
            offsets,
        })
    }

    pub fn n_tilings(&self) -> usize {
        self.offsets.nrows()
    }

    fn tiles_per_tiling(&self) -> usize {
        self.tiles_per_dim.pow(self.lower.len() as u32)
    }

    pub fn n_features(&self) -> usize {
        self.n_tilings() * self.tiles_per_tiling()
    }

    /// Index of the active tile of every tiling. Inputs outside the box
    /// fall into the border tiles.
    pub fn active_tiles(&self, x: &[f64]) -> Vec<usize> {
        let per_tiling = self.tiles_per_tiling();
        (0..self.n_tilings())
            .map(|t| {
                let mut index = 0usize;
                for d in 0..self.lower.len() {
                    let value = x.get(d).copied().unwrap_or(self.lower[d]);
                    let coord = ((value - self.lower[d]) / self.widths[d] + self.offsets[[t, d]])
                        .floor()
                        .clamp(0.0, (self.tiles_per_dim - 1) as f64) as usize;
                    index = index * self.tiles_per_dim + coord;
                }
                t * per_tiling + index
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_active_tile_per_tiling() {
        let tc = TileCoding::new(&[0.0, 0.0], &[1.0, 1.0], 4, 3, TilingArrangement::RandomJitter, 5)
            .unwrap();
        assert_eq!(tc.n_features(), 3 * 25);
        let tiles = tc.active_tiles(&[0.3, 0.9]);
        assert_eq!(tiles.len(), 3);
        for (t, tile) in tiles.iter().enumerate() {
            assert!(*tile >= t * 25 && *tile < (t + 1) * 25);
        }
    }

    #[test]
    fn nearby_points_share_tiles_and_far_points_do_not() {
        let tc = TileCoding::new(&[-1.0], &[1.0], 10, 4, TilingArrangement::Uniform, 0).unwrap();
        let a = tc.active_tiles(&[0.50]);
        let b = tc.active_tiles(&[0.51]);
        let c = tc.active_tiles(&[-0.9]);
        assert!(a.iter().zip(&b).filter(|(x, y)| x == y).count() >= 3);
        assert!(a.iter().zip(&c).all(|(x, y)| x != y));
    }

    #[test]
    fn rejects_empty_boxes() {
        let result = TileCoding::new(&[1.0], &[1.0], 4, 1, TilingArrangement::Uniform, 0);
        assert!(matches!(result, Err(RlError::InvalidParameter(_))));
    }
}
