use std::fmt::Debug;

use kdam::{tqdm, BarExt};
use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use crate::env::Env;
use crate::error::{Result, RlError};
use crate::features::StateFeatures;
use crate::utils::argmax;
use crate::value_function::{QProvider, QValue};

/// One observed `(s, a, r, s')` step. `terminal` marks a next state that
/// truly ends the task, as opposed to an episode that was cut off.
#[derive(Debug, Clone, PartialEq)]
pub struct SarsSample<S, A> {
    pub state: S,
    pub action: A,
    pub reward: f64,
    pub next_state: S,
    pub terminal: bool,
}

/// Gathers `n_samples` steps under a uniformly random policy, restarting the
/// environment after at most `max_episode_steps` steps.
pub fn collect_random_samples<S: Clone, A: Clone>(
    env: &mut dyn Env<S, A>,
    actions: &[A],
    n_samples: usize,
    max_episode_steps: usize,
    rng: &mut StdRng,
) -> Result<Vec<SarsSample<S, A>>> {
    if actions.is_empty() || max_episode_steps == 0 {
        return Err(RlError::InvalidParameter(
            "sample collection needs actions and a positive episode length".to_string(),
        ));
    }
    let mut samples = Vec::with_capacity(n_samples);
    let mut fruitless_resets = 0;
    while samples.len() < n_samples {
        let mut state = env.reset();
        if env.is_terminal() {
            fruitless_resets += 1;
            if fruitless_resets > n_samples {
                return Err(RlError::InvalidParameter(
                    "every reset lands in a terminal state".to_string(),
                ));
            }
            continue;
        }
        for _ in 0..max_episode_steps {
            let action = actions[rng.gen_range(0..actions.len())].clone();
            let (next_state, reward, done) = env.step(action.clone())?;
            samples.push(SarsSample {
                state,
                action,
                reward,
                next_state: next_state.clone(),
                terminal: env.is_terminal(),
            });
            state = next_state;
            if done || samples.len() == n_samples {
                break;
            }
        }
    }
    Ok(samples)
}

/// Least-squares policy iteration over a linear Q-function with one block
/// of state features per action. Each iteration solves LSTDQ for the greedy
/// policy of the previous weights, inverting the system incrementally with
/// Sherman-Morrison updates.
pub struct Lspi<S, A> {
    actions: Vec<A>,
    features: Box<dyn StateFeatures<S>>,
    discount_factor: f64,
    weights: Array1<f64>,
    identity_scale: f64,
    max_iterations: usize,
    max_change: f64,
}

impl<S: Debug, A: Clone + Debug> Lspi<S, A> {
    pub fn new(actions: Vec<A>, features: Box<dyn StateFeatures<S>>, discount_factor: f64) -> Self {
        let n_weights = actions.len() * features.dim();
        Self {
            actions,
            features,
            discount_factor,
            weights: Array1::zeros(n_weights),
            identity_scale: 100.0,
            max_iterations: 30,
            max_change: 1e-6,
        }
    }

    /// Scale of the identity the inverse starts from; larger means less
    /// regularization.
    pub fn with_identity_scale(mut self, scale: f64) -> Self {
        self.identity_scale = scale;
        self
    }

    /// Stops after `max_iterations` or once the weights move less than
    /// `max_change` in euclidean norm.
    pub fn with_stopping(mut self, max_iterations: usize, max_change: f64) -> Self {
        self.max_iterations = max_iterations;
        self.max_change = max_change;
        self
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    fn state_action_features(&self, state_features: &Array1<f64>, action: usize) -> Array1<f64> {
        let k = self.features.dim();
        let mut phi = Array1::zeros(self.weights.len());
        phi.slice_mut(s![action * k..(action + 1) * k])
            .assign(state_features);
        phi
    }

    fn action_values(&self, weights: &Array1<f64>, state_features: &Array1<f64>) -> Vec<f64> {
        let k = self.features.dim();
        (0..self.actions.len())
            .map(|a| weights.slice(s![a * k..(a + 1) * k]).dot(state_features))
            .collect()
    }

    fn action_index(&self, a: &A) -> Result<usize>
    where
        A: PartialEq,
    {
        self.actions
            .iter()
            .position(|x| x == a)
            .ok_or_else(|| RlError::InvalidParameter(format!("unknown action {:?}", a)))
    }

    /// Weights of the Q-function of the policy greedy under `policy_weights`.
    fn lstdq(&self, samples: &[SarsSample<S, A>], policy_weights: &Array1<f64>) -> Result<Array1<f64>>
    where
        A: PartialEq,
    {
        let n = self.weights.len();
        let mut inverse = Array2::<f64>::eye(n) * self.identity_scale;
        let mut b = Array1::<f64>::zeros(n);
        for sample in samples {
            let phi = self.state_action_features(
                &self.features.features(&sample.state),
                self.action_index(&sample.action)?,
            );
            let mut diff = phi.clone();
            if !sample.terminal {
                let next = self.features.features(&sample.next_state);
                let next_action = argmax(self.action_values(policy_weights, &next));
                diff.scaled_add(
                    -self.discount_factor,
                    &self.state_action_features(&next, next_action),
                );
            }
            let u = inverse.dot(&phi);
            let v = diff.dot(&inverse);
            let denominator = 1.0 + diff.dot(&u);
            let update = u.insert_axis(Axis(1)).dot(&v.insert_axis(Axis(0)));
            inverse.scaled_add(-1.0 / denominator, &update);
            b.scaled_add(sample.reward, &phi);
        }
        Ok(inverse.dot(&b))
    }

    /// Runs policy iteration on a fixed batch of samples and returns the
    /// number of iterations performed.
    pub fn run_policy_iteration(&mut self, samples: &[SarsSample<S, A>]) -> Result<usize>
    where
        A: PartialEq,
    {
        if self.actions.is_empty() {
            return Err(RlError::NoApplicableActions("LSPI has no actions".to_string()));
        }
        let mut pb = tqdm!(total = self.max_iterations);
        pb.set_description("policy iteration");
        pb.refresh();

        let mut iterations = 0;
        for i in 0..self.max_iterations {
            let weights = self.lstdq(samples, &self.weights)?;
            let change = (&weights - &self.weights).mapv(|w| w * w).sum().sqrt();
            self.weights = weights;
            iterations = i + 1;
            tracing::debug!(iteration = iterations, change, "LSTDQ solved");
            pb.update(1);
            if change < self.max_change {
                break;
            }
        }
        tracing::info!(iterations, samples = samples.len(), "LSPI finished");
        Ok(iterations)
    }
}

impl<S: Debug, A: Clone + Debug> QProvider<S, A> for Lspi<S, A> {
    fn q_values(&self, s: &S) -> Vec<QValue<A>> {
        let fv = self.features.features(s);
        self.actions
            .iter()
            .cloned()
            .zip(self.action_values(&self.weights, &fv))
            .map(|(a, q)| QValue::new(a, q))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::env::{MountainCarAction, MountainCarEnv, MountainCarObservation};

    struct OneHot;

    impl StateFeatures<usize> for OneHot {
        fn dim(&self) -> usize {
            2
        }

        fn features(&self, s: &usize) -> Array1<f64> {
            let mut fv = Array1::zeros(2);
            if *s < 2 {
                fv[*s] = 1.0;
            }
            fv
        }
    }

    fn chain_samples() -> Vec<SarsSample<usize, char>> {
        // states 0 and 1, 'L' moves down, 'R' moves up and 2 is the goal
        [(0, 'L', 0), (0, 'R', 1), (1, 'L', 0), (1, 'R', 2)]
            .into_iter()
            .map(|(s, a, next)| SarsSample {
                state: s,
                action: a,
                reward: -1.0,
                next_state: next,
                terminal: next == 2,
            })
            .collect()
    }

    #[test]
    fn tabular_chain_reaches_the_optimal_q_function() {
        let mut lspi =
            Lspi::<usize, char>::new(vec!['L', 'R'], Box::new(OneHot), 0.9).with_identity_scale(1e6);
        let iterations = lspi.run_policy_iteration(&chain_samples()).unwrap();
        assert!(iterations <= 5);
        let expected = [(0, 'L', -2.71), (0, 'R', -1.9), (1, 'L', -2.71), (1, 'R', -1.0)];
        for (s, a, q) in expected {
            assert!((lspi.q_value(&s, &a) - q).abs() < 1e-4, "Q({}, {})", s, a);
        }
        assert_eq!(lspi.greedy_action(&0), Some('R'));
        assert_eq!(lspi.greedy_action(&1), Some('R'));
    }

    #[test]
    fn unknown_actions_in_samples_are_reported() {
        let mut samples = chain_samples();
        samples[0].action = 'X';
        let mut lspi = Lspi::<usize, char>::new(vec!['L', 'R'], Box::new(OneHot), 0.9);
        assert!(matches!(
            lspi.run_policy_iteration(&samples),
            Err(RlError::InvalidParameter(_))
        ));
    }

    #[test]
    fn random_samples_restart_after_the_episode_length() {
        let mut env = MountainCarEnv::anywhere(500, 2);
        let mut rng = StdRng::seed_from_u64(2);
        let samples: Vec<SarsSample<MountainCarObservation, MountainCarAction>> =
            collect_random_samples(&mut env, &MountainCarAction::ALL, 95, 20, &mut rng).unwrap();
        assert_eq!(samples.len(), 95);
        assert!(samples.iter().all(|s| s.reward == -1.0));
        // consecutive samples chain up inside an episode
        let restarts = samples
            .windows(2)
            .filter(|w| w[0].next_state != w[1].state)
            .count();
        assert!(restarts >= 4);
        assert!(samples.windows(2).take(19).all(|w| w[0].next_state == w[1].state || w[0].terminal));
    }
}
