use std::hash::Hash;

use fxhash::FxHashMap;

use crate::utils::argmax;

use super::ActionSelection;

#[derive(Debug, Clone)]
pub struct UpperConfidenceBound<T: Hash + PartialEq + Eq + Clone> {
    action_counter: FxHashMap<T, Vec<u128>>,
    t: u128,
    confidence_level: f64,
}

impl<T: Hash + PartialEq + Eq + Clone> UpperConfidenceBound<T> {
    pub fn new(confidence_level: f64) -> Self {
        Self {
            action_counter: FxHashMap::default(),
            t: 1,
            confidence_level,
        }
    }

    fn ucbs(&mut self, obs: &T, values: &[f64]) -> Vec<f64> {
        let obs_actions: &mut Vec<u128> = self.action_counter.entry(obs.clone()).or_default();
        if obs_actions.len() < values.len() {
            obs_actions.resize(values.len(), 0);
        }
        let t = self.t as f64;
        values
            .iter()
            .zip(obs_actions.iter())
            .map(|(v, n)| {
                v + self.confidence_level * (t.ln() / (*n as f64 + f64::MIN_POSITIVE)).sqrt()
            })
            .collect()
    }
}

impl<T: Hash + PartialEq + Eq + Clone> ActionSelection<T> for UpperConfidenceBound<T> {
    fn get_action(&mut self, obs: &T, values: &[f64]) -> usize {
        let action = argmax(self.ucbs(obs, values));
        if let Some(count) = self
            .action_counter
            .get_mut(obs)
            .and_then(|counts| counts.get_mut(action))
        {
            *count += 1;
        }
        self.t += 1;
        action
    }

    fn update(&mut self) {}

    // the choice is deterministic given the counts
    fn get_exploration_probs(&mut self, obs: &T, values: &[f64]) -> Vec<f64> {
        let mut probs = vec![0.0; values.len()];
        if !values.is_empty() {
            probs[argmax(self.ucbs(obs, values))] = 1.0;
        }
        probs
    }

    fn reset(&mut self) {
        self.action_counter = FxHashMap::default();
        self.t = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untried_actions_come_first() {
        let mut ucb: UpperConfidenceBound<u8> = UpperConfidenceBound::new(1.0);
        let values = [5.0, 0.0, 0.0];
        let mut seen = vec![];
        for _ in 0..3 {
            seen.push(ucb.get_action(&0, &values));
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2]);
        // afterwards the clearly better action dominates
        assert_eq!(ucb.get_action(&0, &values), 0);
    }
}
