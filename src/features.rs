mod fourier;
mod location;
mod rbf;
mod tile_coding;

use ndarray::Array1;

pub use fourier::FourierBasis;
pub use location::LocationFeatures;
pub use rbf::RbfFeatures;
pub use tile_coding::{TileCoding, TilingArrangement};

/// Dense feature vector of a state.
pub trait StateFeatures<S> {
    fn dim(&self) -> usize;

    fn features(&self, s: &S) -> Array1<f64>;
}
