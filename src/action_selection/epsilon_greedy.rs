use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use rand::distributions::Uniform;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::utils::argmax;

use super::ActionSelection;

/// Uniformly random action with probability epsilon, greedy otherwise.
#[derive(Clone)]
pub struct EpsilonGreedy {
    exploration_decider: Uniform<f64>,
    pub initial_epsilon: f64,
    pub epsilon: f64,
    epsilon_decay: Rc<dyn Fn(f64) -> f64>,
    final_epsilon: f64,
    rng: StdRng,
}

impl Debug for EpsilonGreedy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpsilonGreedy")
            .field("initial_epsilon", &self.initial_epsilon)
            .field("epsilon", &self.epsilon)
            .field("final_epsilon", &self.final_epsilon)
            .finish()
    }
}

impl EpsilonGreedy {
    /// Constant epsilon.
    pub fn new(epsilon: f64, seed: u64) -> Self {
        Self {
            exploration_decider: Uniform::from(0.0..1.0),
            initial_epsilon: epsilon,
            epsilon,
            epsilon_decay: Rc::new(|e: f64| e),
            final_epsilon: epsilon,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Applies `epsilon_decay` after every episode, never going below `final_epsilon`.
    pub fn with_decay(mut self, epsilon_decay: Rc<dyn Fn(f64) -> f64>, final_epsilon: f64) -> Self {
        self.epsilon_decay = epsilon_decay;
        self.final_epsilon = final_epsilon;
        self
    }

    fn decay_epsilon(&mut self) {
        let new_epsilon: f64 = (self.epsilon_decay)(self.epsilon);
        self.epsilon = new_epsilon.max(self.final_epsilon.min(self.epsilon));
    }

    fn should_explore(&mut self) -> bool {
        self.epsilon != 0.0 && self.exploration_decider.sample(&mut self.rng) < self.epsilon
    }
}

impl<T: Hash + PartialEq + Eq + Clone> ActionSelection<T> for EpsilonGreedy {
    fn get_action(&mut self, _obs: &T, values: &[f64]) -> usize {
        if values.len() > 1 && self.should_explore() {
            self.rng.gen_range(0..values.len())
        } else {
            argmax(values.iter().copied())
        }
    }

    fn update(&mut self) {
        self.decay_epsilon();
    }

    fn get_exploration_probs(&mut self, _obs: &T, values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return vec![];
        }
        let mut policy_probs: Vec<f64> = vec![self.epsilon / values.len() as f64; values.len()];
        policy_probs[argmax(values.iter().copied())] += 1.0 - self.epsilon;
        policy_probs
    }

    fn reset(&mut self) {
        self.epsilon = self.initial_epsilon;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_epsilon_is_greedy() {
        let mut selection = EpsilonGreedy::new(0.0, 1);
        for _ in 0..50 {
            assert_eq!(ActionSelection::<u8>::get_action(&mut selection, &0, &[0.0, 3.0, 1.0]), 1);
        }
    }

    #[test]
    fn exploration_probs_sum_to_one() {
        let mut selection = EpsilonGreedy::new(0.2, 1);
        let probs = ActionSelection::<u8>::get_exploration_probs(&mut selection, &0, &[0.0, 3.0, 1.0, 2.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((probs[1] - 0.85).abs() < 1e-12);
    }

    #[test]
    fn decay_stops_at_final_epsilon_and_reset_restores() {
        let mut selection = EpsilonGreedy::new(0.5, 1).with_decay(Rc::new(|e: f64| e * 0.5), 0.1);
        for _ in 0..10 {
            ActionSelection::<u8>::update(&mut selection);
        }
        assert!((selection.epsilon - 0.1).abs() < 1e-12);
        ActionSelection::<u8>::reset(&mut selection);
        assert_eq!(selection.epsilon, 0.5);
    }
}
