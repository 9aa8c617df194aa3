use ndarray::Array1;

use crate::env::{GridState, Location};
use crate::features::StateFeatures;

/// One-hot encoding of the type of location under the agent.
/// Untyped cells map to the zero vector.
#[derive(Debug, Clone)]
pub struct LocationFeatures {
    locations: Vec<Location>,
    n_types: usize,
}

impl LocationFeatures {
    pub fn new(locations: &[Location], n_types: usize) -> Self {
        Self {
            locations: locations.to_vec(),
            n_types,
        }
    }

    fn active_type(&self, s: &GridState) -> Option<usize> {
        self.locations
            .iter()
            .find(|l| l.x == s.x && l.y == s.y)
            .map(|l| l.kind)
            .filter(|kind| *kind < self.n_types)
    }
}

impl StateFeatures<GridState> for LocationFeatures {
    fn dim(&self) -> usize {
        self.n_types
    }

    fn features(&self, s: &GridState) -> Array1<f64> {
        let mut fv = Array1::zeros(self.n_types);
        if let Some(kind) = self.active_type(s) {
            fv[kind] = 1.0;
        }
        fv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_on_typed_cells_only() {
        let features = LocationFeatures::new(&[Location::new(1, 1, 2), Location::new(0, 1, 7)], 3);
        assert_eq!(features.features(&GridState::new(1, 1)).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(features.features(&GridState::new(0, 0)).to_vec(), vec![0.0; 3]);
        // types beyond the feature range are ignored
        assert_eq!(features.features(&GridState::new(0, 1)).to_vec(), vec![0.0; 3]);
    }
}
