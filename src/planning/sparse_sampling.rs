use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, RlError};
use crate::model::GenerativeModel;
use crate::policy::Policy;
use crate::utils::argmax;
use crate::value_function::QValue;

/// Receding horizon planner estimating `Q_h(s, a)` as the mean of
/// `n_samples` sampled `r + discount * V_{h-1}(s')`, with `V_0 = 0`.
/// Nothing is kept between decisions, so it plans for continuous states.
pub struct SparseSampling<M: GenerativeModel> {
    model: M,
    discount_factor: f64,
    horizon: usize,
    n_samples: usize,
    rng: StdRng,
}

impl<M: GenerativeModel> SparseSampling<M> {
    pub fn new(
        model: M,
        discount_factor: f64,
        horizon: usize,
        n_samples: usize,
        seed: u64,
    ) -> Result<Self> {
        if horizon == 0 || n_samples == 0 {
            return Err(RlError::InvalidParameter(format!(
                "sparse sampling needs a positive horizon and sample count, got {} and {}",
                horizon, n_samples
            )));
        }
        Ok(Self {
            model,
            discount_factor,
            horizon,
            n_samples,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of generative model calls behind one decision.
    pub fn samples_per_decision(&self, n_actions: usize) -> usize {
        let branching = n_actions * self.n_samples;
        (1..=self.horizon).map(|d| branching.pow(d as u32)).sum()
    }

    pub fn q_values(&mut self, s: &M::State) -> Result<Vec<QValue<M::Action>>> {
        let actions = self.model.action_set(s);
        if actions.is_empty() {
            return Err(RlError::NoApplicableActions(format!("{:?}", s)));
        }
        let mut values = Vec::with_capacity(actions.len());
        for a in actions {
            let q = self.estimate_q(s, &a, self.horizon)?;
            values.push(QValue::new(a, q));
        }
        Ok(values)
    }

    fn estimate_value(&mut self, s: &M::State, height: usize) -> Result<f64> {
        if height == 0 || self.model.terminal(s) {
            return Ok(0.0);
        }
        let mut best: Option<f64> = None;
        for a in self.model.action_set(s) {
            let q = self.estimate_q(s, &a, height)?;
            best = Some(best.map_or(q, |b: f64| b.max(q)));
        }
        Ok(best.unwrap_or(0.0))
    }

    fn estimate_q(&mut self, s: &M::State, a: &M::Action, height: usize) -> Result<f64> {
        let mut total = 0.0;
        for _ in 0..self.n_samples {
            let t = self.model.sample_outcome(s, a, &mut self.rng)?;
            let future = if t.terminated {
                0.0
            } else {
                self.estimate_value(&t.next_state, height - 1)?
            };
            total += t.reward + self.discount_factor * future;
        }
        Ok(total / self.n_samples as f64)
    }
}

impl<M: GenerativeModel> Policy<M::State, M::Action> for SparseSampling<M>
where
    M::State: Debug,
{
    fn action(&mut self, s: &M::State) -> Result<M::Action> {
        let qs = self.q_values(s)?;
        let best = argmax(qs.iter().map(|q| q.q));
        qs.into_iter()
            .nth(best)
            .map(|q| q.action)
            .ok_or_else(|| RlError::NoApplicableActions(format!("{:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{
        GridAction, GridState, GridWorld, InvertedPendulum, InvertedPendulumAction,
        InvertedPendulumState,
    };
    use crate::episode::rollout_model;

    #[test]
    fn rejects_an_empty_tree() {
        assert!(SparseSampling::new(GridWorld::empty(2, 2), 0.9, 0, 1, 0).is_err());
        assert!(SparseSampling::new(GridWorld::empty(2, 2), 0.9, 2, 0, 0).is_err());
    }

    #[test]
    fn deterministic_corridor_matches_the_truncated_backup() {
        let gw = GridWorld::empty(4, 1).with_goal(3, 0);
        let mut ss = SparseSampling::new(gw, 0.5, 4, 1, 0).unwrap();
        let qs = ss.q_values(&GridState::new(0, 0)).unwrap();
        let q = |a: GridAction| qs.iter().find(|q| q.action == a).map(|q| q.q).unwrap();
        assert_eq!(q(GridAction::East), -1.75);
        assert_eq!(q(GridAction::North), -1.875);
        assert_eq!(ss.action(&GridState::new(0, 0)).unwrap(), GridAction::East);
        assert_eq!(ss.samples_per_decision(4), 4 + 16 + 64 + 256);
    }

    #[test]
    fn looking_two_steps_ahead_finds_the_saving_push() {
        let mut ss = SparseSampling::new(InvertedPendulum::new(), 1.0, 2, 1, 0).unwrap();
        let s = InvertedPendulumState::new(0.2, 0.8);
        let qs: Vec<f64> = ss.q_values(&s).unwrap().iter().map(|q| q.q).collect();
        assert_eq!(qs, vec![-1.0, 0.0, -1.0]);
        assert_eq!(ss.action(&s).unwrap(), InvertedPendulumAction::Right);
    }

    #[test]
    fn deeper_trees_balance_longer() {
        let start = InvertedPendulumState::new(0.1, 0.0);
        let mut rng = StdRng::seed_from_u64(0);

        let mut shallow = SparseSampling::new(InvertedPendulum::new(), 1.0, 1, 1, 0).unwrap();
        let ip = InvertedPendulum::new();
        let e = rollout_model(&ip, &mut shallow, start, 100, &mut rng).unwrap();
        assert!(e.max_time_step() < 10);
        assert_eq!(e.rewards.last(), Some(&-1.0));

        let mut deep = SparseSampling::new(InvertedPendulum::new(), 1.0, 4, 1, 0).unwrap();
        let e = rollout_model(&ip, &mut deep, start, 100, &mut rng).unwrap();
        assert_eq!(e.max_time_step(), 100);
        assert!(e.rewards.iter().all(|r| *r == 0.0));
    }
}
