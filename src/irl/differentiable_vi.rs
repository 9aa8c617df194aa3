use indexmap::IndexMap;
use ndarray::Array1;

use crate::error::{Result, RlError};
use crate::irl::LinearStateRewardFunction;
use crate::model::Model;
use crate::planning::reachable_states;
use crate::utils::{log_sum_exp, softmax};
use crate::value_function::{QProvider, QValue};

/// Q-value of one action together with its gradient in the reward parameters.
#[derive(Debug, Clone)]
pub struct QGradient<A> {
    pub action: A,
    pub q: f64,
    pub gradient: Array1<f64>,
}

/// Value iteration with a Boltzmann backup `V(s) = sum_a pi(a|s) Q(s, a)`,
/// `pi = softmax(beta * Q)`, that carries the gradient of every value with
/// respect to the parameters of a linear reward function.
/// Rewards come from the reward function, not from the model.
pub struct DifferentiableValueIteration<M: Model> {
    model: M,
    rf: LinearStateRewardFunction<M::State>,
    discount_factor: f64,
    beta: f64,
    max_delta: f64,
    max_iterations: usize,
    values: IndexMap<M::State, (f64, Array1<f64>)>,
}

impl<M: Model> DifferentiableValueIteration<M> {
    pub fn new(
        model: M,
        rf: LinearStateRewardFunction<M::State>,
        discount_factor: f64,
        beta: f64,
        max_delta: f64,
        max_iterations: usize,
    ) -> Self {
        Self {
            model,
            rf,
            discount_factor,
            beta,
            max_delta,
            max_iterations,
            values: IndexMap::new(),
        }
    }

    pub fn reward_function(&self) -> &LinearStateRewardFunction<M::State> {
        &self.rf
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Replaces the reward parameters; the value table is stale afterwards
    /// and gets cleared.
    pub fn set_parameters(&mut self, parameters: Array1<f64>) -> Result<()> {
        self.rf.set_parameters(parameters)?;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn n_states(&self) -> usize {
        self.values.len()
    }

    pub fn plan_from_state(&mut self, initial_state: &M::State) {
        if self.values.contains_key(initial_state) {
            return;
        }
        let n = self.rf.n_parameters();
        for s in reachable_states(&self.model, initial_state) {
            self.values.entry(s).or_insert_with(|| (0.0, Array1::zeros(n)));
        }
        self.run_sweeps();
    }

    fn run_sweeps(&mut self) -> usize {
        for iteration in 0..self.max_iterations {
            let mut delta: f64 = 0.0;
            for i in 0..self.values.len() {
                let s = match self.values.get_index(i) {
                    Some((s, _)) => s.clone(),
                    None => break,
                };
                let backup = self.boltzmann_backup(&s);
                if let Some(entry) = self.values.get_index_mut(i) {
                    delta = delta.max((entry.1 .0 - backup.0).abs());
                    *entry.1 = backup;
                }
            }
            tracing::debug!(iteration, delta, "differentiable value iteration sweep");
            if delta < self.max_delta {
                return iteration + 1;
            }
        }
        self.max_iterations
    }

    fn stored(&self, s: &M::State) -> (f64, Array1<f64>) {
        match self.values.get(s) {
            Some(v) => v.clone(),
            None => (0.0, Array1::zeros(self.rf.n_parameters())),
        }
    }

    /// Q-values and their gradients for every action applicable in `s`.
    pub fn q_gradients(&self, s: &M::State) -> Vec<QGradient<M::Action>> {
        let n = self.rf.n_parameters();
        if self.model.is_terminal(s) {
            return self
                .model
                .actions(s)
                .into_iter()
                .map(|action| QGradient {
                    action,
                    q: 0.0,
                    gradient: Array1::zeros(n),
                })
                .collect();
        }
        self.model
            .actions(s)
            .into_iter()
            .map(|action| {
                let mut q = 0.0;
                let mut gradient: Array1<f64> = Array1::zeros(n);
                for t in self.model.transitions(s, &action) {
                    let (r, dr) = self.rf.reward_and_gradient(&t.next_state);
                    let (v, dv) = self.stored(&t.next_state);
                    q += t.probability * (r + self.discount_factor * v);
                    gradient.scaled_add(t.probability, &dr);
                    gradient.scaled_add(t.probability * self.discount_factor, &dv);
                }
                QGradient {
                    action,
                    q,
                    gradient,
                }
            })
            .collect()
    }

    fn boltzmann_backup(&self, s: &M::State) -> (f64, Array1<f64>) {
        let n = self.rf.n_parameters();
        let qs = self.q_gradients(s);
        if qs.is_empty() {
            return (0.0, Array1::zeros(n));
        }
        let values: Vec<f64> = qs.iter().map(|q| q.q).collect();
        let probs = softmax(&values, self.beta);
        let v: f64 = probs.iter().zip(&values).map(|(p, q)| p * q).sum();

        // dV = sum_a pi_a dQ_a + beta * sum_a pi_a (Q_a - V) dQ_a
        let mut dv: Array1<f64> = Array1::zeros(n);
        for (p, q) in probs.iter().zip(&qs) {
            dv.scaled_add(p * (1.0 + self.beta * (q.q - v)), &q.gradient);
        }
        (v, dv)
    }

    /// `log pi(a|s)` under the Boltzmann policy and its gradient.
    pub fn log_policy_gradient(
        &self,
        s: &M::State,
        a: &M::Action,
    ) -> Result<(f64, Array1<f64>)> {
        let qs = self.q_gradients(s);
        let index = qs
            .iter()
            .position(|q| &q.action == a)
            .ok_or_else(|| RlError::NoApplicableActions(format!("{:?} in {:?}", a, s)))?;
        let values: Vec<f64> = qs.iter().map(|q| q.q).collect();
        let probs = softmax(&values, self.beta);

        let mut expected: Array1<f64> = Array1::zeros(self.rf.n_parameters());
        for (p, q) in probs.iter().zip(&qs) {
            expected.scaled_add(*p, &q.gradient);
        }
        let log_prob = self.beta * values[index] - log_sum_exp(&values, self.beta);
        let gradient = (&qs[index].gradient - &expected) * self.beta;
        Ok((log_prob, gradient))
    }

    /// Boltzmann action distribution in `s`.
    pub fn policy(&self, s: &M::State) -> Vec<(M::Action, f64)> {
        let qs = self.q_gradients(s);
        let values: Vec<f64> = qs.iter().map(|q| q.q).collect();
        let probs = softmax(&values, self.beta);
        qs.into_iter().map(|q| q.action).zip(probs).collect()
    }
}

impl<M: Model> QProvider<M::State, M::Action> for DifferentiableValueIteration<M> {
    fn q_values(&self, s: &M::State) -> Vec<QValue<M::Action>> {
        self.q_gradients(s)
            .into_iter()
            .map(|q| QValue::new(q.action, q.q))
            .collect()
    }

    fn value(&self, s: &M::State) -> f64 {
        self.stored(s).0
    }
}
