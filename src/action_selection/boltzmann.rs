use std::fmt::Debug;
use std::hash::Hash;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, RlError};
use crate::utils::{categorical_sample, softmax};

use super::ActionSelection;

/// Softmax over the action values scaled by `1 / temperature`.
#[derive(Debug, Clone)]
pub struct Boltzmann {
    temperature: f64,
    rng: StdRng,
}

impl Boltzmann {
    /// The temperature must be a positive finite number.
    pub fn new(temperature: f64, seed: u64) -> Result<Self> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(RlError::InvalidParameter(format!(
                "Boltzmann temperature must be positive, got {}",
                temperature
            )));
        }
        Ok(Self {
            temperature,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl<T: Hash + PartialEq + Eq + Clone> ActionSelection<T> for Boltzmann {
    fn get_action(&mut self, obs: &T, values: &[f64]) -> usize {
        let probs = self.get_exploration_probs(obs, values);
        categorical_sample(&probs, self.rng.gen::<f64>())
    }

    fn update(&mut self) {}

    fn get_exploration_probs(&mut self, _obs: &T, values: &[f64]) -> Vec<f64> {
        softmax(values, 1.0 / self.temperature)
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_temperature_is_almost_greedy() {
        let mut selection = Boltzmann::new(0.01, 3).unwrap();
        let probs = ActionSelection::<u8>::get_exploration_probs(&mut selection, &0, &[0.0, 1.0]);
        assert!(probs[1] > 0.999);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_temperatures_are_rejected() {
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Boltzmann::new(t, 0),
                Err(RlError::InvalidParameter(_))
            ));
        }
        assert_eq!(Boltzmann::new(0.5, 0).unwrap().temperature(), 0.5);
    }

    #[test]
    fn samples_follow_the_distribution() {
        let mut selection = Boltzmann::new(1.0, 3).unwrap();
        let values = [0.0, 2.0_f64.ln()];
        let picks = (0..3000)
            .filter(|_| ActionSelection::<u8>::get_action(&mut selection, &0, &values) == 1)
            .count();
        // p(1) = 2/3
        assert!(picks > 1800 && picks < 2200, "{}", picks);
    }
}
