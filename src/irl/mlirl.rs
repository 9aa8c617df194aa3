use ndarray::Array1;

use crate::episode::Episode;
use crate::error::{Result, RlError};
use crate::irl::DifferentiableValueIteration;
use crate::model::Model;

/// Maximum-likelihood IRL: gradient ascent on the log-likelihood of the
/// demonstrated actions under the planner's Boltzmann policy.
pub struct Mlirl<M: Model> {
    planner: DifferentiableValueIteration<M>,
    episodes: Vec<Episode<M::State, M::Action>>,
    learning_rate: f64,
    max_likelihood_change: f64,
    max_steps: usize,
}

impl<M: Model> Mlirl<M> {
    pub fn new(
        planner: DifferentiableValueIteration<M>,
        episodes: Vec<Episode<M::State, M::Action>>,
        learning_rate: f64,
        max_likelihood_change: f64,
        max_steps: usize,
    ) -> Result<Self> {
        if episodes.iter().all(|e| e.max_time_step() == 0) {
            return Err(RlError::InvalidParameter(
                "IRL needs at least one demonstrated step".to_string(),
            ));
        }
        Ok(Self {
            planner,
            episodes,
            learning_rate,
            max_likelihood_change,
            max_steps,
        })
    }

    pub fn planner(&self) -> &DifferentiableValueIteration<M> {
        &self.planner
    }

    pub fn parameters(&self) -> &Array1<f64> {
        self.planner.reward_function().parameters()
    }

    fn plan_for_demonstrations(&mut self) {
        for episode in &self.episodes {
            if let Some(s) = episode.states.first() {
                self.planner.plan_from_state(s);
            }
        }
    }

    pub fn log_likelihood(&mut self) -> Result<f64> {
        Ok(self.log_likelihood_and_gradient()?.0)
    }

    /// Sum over every demonstrated step of `log pi(a_t|s_t)` and its gradient.
    pub fn log_likelihood_and_gradient(&mut self) -> Result<(f64, Array1<f64>)> {
        self.plan_for_demonstrations();
        let mut likelihood = 0.0;
        let mut gradient: Array1<f64> = Array1::zeros(self.parameters().len());
        for episode in &self.episodes {
            for (s, a) in episode.states.iter().zip(&episode.actions) {
                let (log_prob, g) = self.planner.log_policy_gradient(s, a)?;
                likelihood += log_prob;
                gradient += &g;
            }
        }
        Ok((likelihood, gradient))
    }

    /// Runs gradient ascent until the likelihood changes by less than the
    /// configured amount or the step budget runs out. Returns the
    /// log-likelihood before the first step and after every step.
    pub fn perform_irl(&mut self) -> Result<Vec<f64>> {
        let (mut likelihood, mut gradient) = self.log_likelihood_and_gradient()?;
        let mut history = vec![likelihood];
        tracing::info!(likelihood, "initial demonstration log-likelihood");

        for step in 0..self.max_steps {
            let parameters = self.parameters() + &(gradient * self.learning_rate);
            self.planner.set_parameters(parameters)?;
            let (new_likelihood, new_gradient) = self.log_likelihood_and_gradient()?;
            let change = (new_likelihood - likelihood).abs();
            tracing::info!(
                step,
                likelihood = new_likelihood,
                change,
                parameters = ?self.parameters().to_vec(),
                "MLIRL step"
            );
            history.push(new_likelihood);
            likelihood = new_likelihood;
            gradient = new_gradient;
            if change < self.max_likelihood_change {
                break;
            }
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use ndarray::array;

    use super::*;
    use crate::env::{GridAction, GridState, GridWorld, Location};
    use crate::features::{LocationFeatures, StateFeatures};
    use crate::irl::LinearStateRewardFunction;

    fn demo() -> Episode<GridState, GridAction> {
        let mut e = Episode::new(GridState::new(0, 0));
        e.record(GridAction::East, 0.0, GridState::new(1, 0));
        e.record(GridAction::East, 0.0, GridState::new(2, 0));
        e.record(GridAction::East, 0.0, GridState::new(2, 0));
        e
    }

    #[test]
    fn empty_demonstrations_are_rejected() {
        let locations = vec![Location::new(2, 0, 0)];
        let gw = GridWorld::empty(3, 1).with_locations(locations.clone());
        let features: Rc<dyn StateFeatures<GridState>> =
            Rc::new(LocationFeatures::new(&locations, 1));
        let rf = LinearStateRewardFunction::new(features, array![0.0]).unwrap();
        let planner = DifferentiableValueIteration::new(gw, rf, 0.9, 1.0, 0.01, 50);
        let result = Mlirl::new(planner, vec![Episode::new(GridState::new(0, 0))], 0.1, 0.1, 5);
        assert!(matches!(result, Err(RlError::InvalidParameter(_))));
    }

    #[test]
    fn ascent_raises_the_reward_of_the_demonstrated_goal() {
        let locations = vec![Location::new(2, 0, 0)];
        let gw = GridWorld::empty(3, 1).with_locations(locations.clone());
        let features: Rc<dyn StateFeatures<GridState>> =
            Rc::new(LocationFeatures::new(&locations, 1));
        let rf = LinearStateRewardFunction::new(features, array![0.0]).unwrap();
        let planner = DifferentiableValueIteration::new(gw, rf, 0.9, 1.0, 1e-6, 200);
        let mut irl = Mlirl::new(planner, vec![demo()], 0.05, 1e-4, 20).unwrap();
        let history = irl.perform_irl().unwrap();
        assert!(history.len() >= 2);
        assert!(history.last().unwrap() > history.first().unwrap());
        assert!(irl.parameters()[0] > 0.0);
    }
}
