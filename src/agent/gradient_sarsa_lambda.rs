use std::fmt::Debug;

use ndarray::Array2;

use crate::action_selection::{ActionSelection, EnumActionSelection};
use crate::agent::LearningAgent;
use crate::env::Env;
use crate::episode::Episode;
use crate::error::{Result, RlError};
use crate::features::TileCoding;

/// Gradient-descent SARSA(lambda) with a linear Q-function per action over
/// tile-coded features and accumulating traces.
pub struct GradientSarsaLambda<S, A> {
    actions: Vec<A>,
    obs_to_vec: fn(&S) -> Vec<f64>,
    tiles: TileCoding,
    weights: Array2<f64>,
    trace: Array2<f64>,
    initial_weight: f64,
    learning_rate: f64,
    discount_factor: f64,
    lambda_factor: f64,
    // keyed by the active tiles
    action_selection: EnumActionSelection<Vec<usize>>,
}

impl<S: Clone + Debug, A: Clone + Debug> GradientSarsaLambda<S, A> {
    /// `default_q` is spread over the tilings so every state starts with that value.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actions: Vec<A>,
        obs_to_vec: fn(&S) -> Vec<f64>,
        tiles: TileCoding,
        default_q: f64,
        discount_factor: f64,
        learning_rate: f64,
        lambda_factor: f64,
        action_selection: EnumActionSelection<Vec<usize>>,
    ) -> Self {
        let shape = (actions.len(), tiles.n_features());
        let initial_weight = default_q / tiles.n_tilings() as f64;
        Self {
            actions,
            obs_to_vec,
            tiles,
            weights: Array2::from_elem(shape, initial_weight),
            trace: Array2::zeros(shape),
            initial_weight,
            learning_rate,
            discount_factor,
            lambda_factor,
            action_selection,
        }
    }

    fn active_tiles(&self, obs: &S) -> Vec<usize> {
        self.tiles.active_tiles(&(self.obs_to_vec)(obs))
    }

    fn q(&self, tiles: &[usize], action: usize) -> f64 {
        tiles.iter().map(|f| self.weights[[action, *f]]).sum()
    }

    pub fn q_values(&self, obs: &S) -> Vec<f64> {
        let tiles = self.active_tiles(obs);
        (0..self.actions.len()).map(|a| self.q(&tiles, a)).collect()
    }

    fn get_action(&mut self, tiles: &Vec<usize>) -> usize {
        let values: Vec<f64> = (0..self.actions.len()).map(|a| self.q(tiles, a)).collect();
        self.action_selection.get_action(tiles, &values)
    }
}

impl<S: Clone + Debug, A: Clone + Debug> LearningAgent<S, A> for GradientSarsaLambda<S, A> {
    fn run_learning_episode(
        &mut self,
        env: &mut dyn Env<S, A>,
        max_steps: Option<usize>,
    ) -> Result<Episode<S, A>> {
        if self.actions.is_empty() {
            return Err(RlError::NoApplicableActions(
                "gradient SARSA has no actions".to_string(),
            ));
        }
        let curr_obs = env.reset();
        let mut episode = Episode::new(curr_obs.clone());
        let mut terminated = env.is_terminal();
        let mut curr_tiles = self.active_tiles(&curr_obs);
        let mut curr_action = self.get_action(&curr_tiles);

        while !terminated && max_steps.map_or(true, |m| episode.max_time_step() < m) {
            let action = self.actions[curr_action].clone();
            let (next_obs, reward, done) = env.step(action.clone())?;
            episode.record(action, reward, next_obs.clone());

            let curr_q = self.q(&curr_tiles, curr_action);
            let next_tiles = self.active_tiles(&next_obs);
            // a cut off episode still bootstraps from the next state
            let (next_action, future_q_value) = if env.is_terminal() {
                (0, 0.0)
            } else {
                let next_action = self.get_action(&next_tiles);
                (next_action, self.q(&next_tiles, next_action))
            };
            let temporal_difference = reward + self.discount_factor * future_q_value - curr_q;

            for f in &curr_tiles {
                self.trace[[curr_action, *f]] += 1.0;
            }
            self.weights
                .scaled_add(self.learning_rate * temporal_difference, &self.trace);
            self.trace *= self.discount_factor * self.lambda_factor;

            curr_tiles = next_tiles;
            curr_action = next_action;
            terminated = done;
        }
        self.trace.fill(0.0);
        self.action_selection.update();
        Ok(episode)
    }

    fn reset(&mut self) {
        self.weights.fill(self.initial_weight);
        self.trace.fill(0.0);
        self.action_selection.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_selection::EpsilonGreedy;
    use crate::env::{MountainCarAction, MountainCarEnv, MountainCarObservation};
    use crate::features::TilingArrangement;

    fn agent() -> GradientSarsaLambda<MountainCarObservation, MountainCarAction> {
        let tiles = TileCoding::new(
            &[MountainCarEnv::MIN_POSITION, -MountainCarEnv::MAX_SPEED],
            &[MountainCarEnv::MAX_POSITION, MountainCarEnv::MAX_SPEED],
            10,
            5,
            TilingArrangement::RandomJitter,
            0,
        )
        .unwrap();
        GradientSarsaLambda::new(
            MountainCarAction::ALL.to_vec(),
            MountainCarObservation::as_vec,
            tiles,
            0.5,
            0.99,
            0.02,
            0.5,
            EpsilonGreedy::new(0.0, 0).into(),
        )
    }

    #[test]
    fn default_q_is_spread_over_tilings() {
        let ag = agent();
        let q = ag.q_values(&MountainCarObservation::new(-0.5, 0.0));
        assert!(q.iter().all(|v| (v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn step_costs_lower_the_visited_values() {
        let mut ag = agent();
        let mut env = MountainCarEnv::in_valley(50, 0);
        let start = MountainCarObservation::new(MountainCarEnv::valley_position(), 0.0);
        let before: f64 = ag.q_values(&start).iter().sum();
        let e = ag.run_learning_episode(&mut env, Some(20)).unwrap();
        assert_eq!(e.max_time_step(), 20);
        let after: f64 = ag.q_values(&start).iter().sum();
        assert!(after < before);
        ag.reset();
        let reset: f64 = ag.q_values(&start).iter().sum();
        assert!((reset - before).abs() < 1e-12);
    }

    #[test]
    fn episodes_cut_off_by_the_env_still_bootstrap() {
        let mut ag = agent();
        let mut env = MountainCarEnv::in_valley(1, 0);
        let start = MountainCarObservation::new(MountainCarEnv::valley_position(), 0.0);
        let e = ag.run_learning_episode(&mut env, None).unwrap();
        assert_eq!(e.max_time_step(), 1);
        assert!(!env.is_terminal());
        // five active tiles, each moved by learning_rate * td
        let td = -1.0 + 0.99 * 0.5 - 0.5;
        let expected = 0.5 + 5.0 * 0.02 * td;
        assert!((ag.q_values(&start)[0] - expected).abs() < 1e-9);
    }
}
