use std::rc::Rc;

use ndarray::Array1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::env::RewardFunction;
use crate::error::{Result, RlError};
use crate::features::StateFeatures;

/// Reward `theta . phi(s')` of the state being entered, differentiable in `theta`.
#[derive(Clone)]
pub struct LinearStateRewardFunction<S> {
    features: Rc<dyn StateFeatures<S>>,
    parameters: Array1<f64>,
}

impl<S> LinearStateRewardFunction<S> {
    pub fn new(features: Rc<dyn StateFeatures<S>>, parameters: Array1<f64>) -> Result<Self> {
        if parameters.len() != features.dim() {
            return Err(RlError::InvalidParameter(format!(
                "{} parameters for {} features",
                parameters.len(),
                features.dim()
            )));
        }
        Ok(Self {
            features,
            parameters,
        })
    }

    /// Small random parameters drawn uniformly from `[-0.1, 0.1)`.
    pub fn random(features: Rc<dyn StateFeatures<S>>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let parameters = Array1::random_using(features.dim(), Uniform::new(-0.1, 0.1), &mut rng);
        Self {
            features,
            parameters,
        }
    }

    pub fn parameters(&self) -> &Array1<f64> {
        &self.parameters
    }

    pub fn n_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn set_parameters(&mut self, parameters: Array1<f64>) -> Result<()> {
        if parameters.len() != self.parameters.len() {
            return Err(RlError::InvalidParameter(format!(
                "expected {} parameters, got {}",
                self.parameters.len(),
                parameters.len()
            )));
        }
        self.parameters = parameters;
        Ok(())
    }

    pub fn state_reward(&self, next: &S) -> f64 {
        self.parameters.dot(&self.features.features(next))
    }

    /// Reward of entering `next` and its gradient with respect to the parameters.
    pub fn reward_and_gradient(&self, next: &S) -> (f64, Array1<f64>) {
        let phi = self.features.features(next);
        (self.parameters.dot(&phi), phi)
    }
}

impl<S, A> RewardFunction<S, A> for LinearStateRewardFunction<S> {
    fn reward(&self, _s: &S, _a: &A, next: &S) -> f64 {
        self.state_reward(next)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::env::{GridState, Location};
    use crate::features::LocationFeatures;

    #[test]
    fn reward_is_the_parameter_of_the_active_type() {
        let features: Rc<dyn StateFeatures<GridState>> =
            Rc::new(LocationFeatures::new(&[Location::new(0, 0, 1)], 2));
        let rf = LinearStateRewardFunction::new(features, array![-1.0, 2.0]).unwrap();
        assert_eq!(rf.state_reward(&GridState::new(0, 0)), 2.0);
        assert_eq!(rf.state_reward(&GridState::new(1, 0)), 0.0);
        let (_, grad) = rf.reward_and_gradient(&GridState::new(0, 0));
        assert_eq!(grad.to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn random_parameters_are_small() {
        let features: Rc<dyn StateFeatures<GridState>> = Rc::new(LocationFeatures::new(&[], 5));
        let rf = LinearStateRewardFunction::random(features, 0);
        assert_eq!(rf.n_parameters(), 5);
        assert!(rf.parameters().iter().all(|p| (-0.1..0.1).contains(p)));
    }
}
