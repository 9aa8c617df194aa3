mod boltzmann;
mod epsilon_greedy;
mod upper_confidence_bound;

use std::hash::Hash;

use enum_dispatch::enum_dispatch;

pub use boltzmann::Boltzmann;
pub use epsilon_greedy::EpsilonGreedy;
pub use upper_confidence_bound::UpperConfidenceBound;

/// Turns the values of the actions applicable in `obs` into a choice.
/// `values` is never empty when an agent asks for an action.
#[enum_dispatch]
pub trait ActionSelection<T: Hash + PartialEq + Eq + Clone> {
    fn get_action(&mut self, obs: &T, values: &[f64]) -> usize;
    /// Called once at the end of every episode.
    fn update(&mut self);
    fn get_exploration_probs(&mut self, obs: &T, values: &[f64]) -> Vec<f64>;
    fn reset(&mut self);
}

#[derive(Debug, Clone)]
#[enum_dispatch(ActionSelection<T>)]
pub enum EnumActionSelection<T: Hash + PartialEq + Eq + Clone> {
    EpsilonGreedy(EpsilonGreedy),
    UpperConfidenceBound(UpperConfidenceBound<T>),
    Boltzmann(Boltzmann),
}
