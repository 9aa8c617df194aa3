use std::rc::Rc;

use indexmap::IndexMap;

use crate::model::Model;
use crate::planning::reachable_states;
use crate::policy::GreedyQPolicy;
use crate::value_function::{QProvider, QValue, ValueInitialization};

/// Tabular value iteration over the states reachable from a seed state.
pub struct ValueIteration<M: Model> {
    model: M,
    discount_factor: f64,
    init: Rc<dyn ValueInitialization<M::State, M::Action>>,
    max_iterations: usize,
    max_delta: Option<f64>,
    values: IndexMap<M::State, f64>,
}

impl<M: Model> ValueIteration<M> {
    /// Runs exactly `max_iterations` sweeps unless a `max_delta` is set.
    pub fn new(
        model: M,
        discount_factor: f64,
        init: Rc<dyn ValueInitialization<M::State, M::Action>>,
        max_iterations: usize,
    ) -> Self {
        Self {
            model,
            discount_factor,
            init,
            max_iterations,
            max_delta: None,
            values: IndexMap::new(),
        }
    }

    /// Stop sweeping once no value changes by more than `max_delta`.
    pub fn with_max_delta(mut self, max_delta: f64) -> Self {
        self.max_delta = Some(max_delta);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    pub fn n_states(&self) -> usize {
        self.values.len()
    }

    pub fn states(&self) -> impl Iterator<Item = &M::State> {
        self.values.keys()
    }

    /// Plans from `initial_state`; a state already in the table is not planned again.
    pub fn plan_from_state(&mut self, initial_state: &M::State) {
        if !self.values.contains_key(initial_state) {
            self.perform_reachability_from(initial_state);
            self.run_sweeps();
        }
    }

    /// Greedy policy over the current table.
    pub fn greedy_policy(&self) -> GreedyQPolicy<'_, Self> {
        GreedyQPolicy::new(self)
    }

    /// Adds every state reachable from `seed` to the table.
    pub fn perform_reachability_from(&mut self, seed: &M::State) {
        for s in reachable_states(&self.model, seed) {
            if !self.values.contains_key(&s) {
                let v = if self.model.is_terminal(&s) {
                    0.0
                } else {
                    self.init.value(&s)
                };
                self.values.insert(s, v);
            }
        }
    }

    /// Bellman sweeps over the whole table, updating values in place.
    pub fn run_sweeps(&mut self) -> usize {
        for iteration in 0..self.max_iterations {
            let mut delta: f64 = 0.0;
            for i in 0..self.values.len() {
                let s = match self.values.get_index(i) {
                    Some((s, _)) => s.clone(),
                    None => break,
                };
                let new_value = self.bellman_value(&s);
                if let Some(entry) = self.values.get_index_mut(i) {
                    delta = delta.max((*entry.1 - new_value).abs());
                    *entry.1 = new_value;
                }
            }
            tracing::debug!(iteration, delta, "value iteration sweep");
            if let Some(max_delta) = self.max_delta {
                if delta < max_delta {
                    tracing::info!(iterations = iteration + 1, "value iteration converged");
                    return iteration + 1;
                }
            }
        }
        self.max_iterations
    }

    pub fn stored_value(&self, s: &M::State) -> f64 {
        match self.values.get(s) {
            Some(v) => *v,
            None => self.init.value(s),
        }
    }

    /// Max over actions of the one-step backup from the current table.
    fn bellman_value(&self, s: &M::State) -> f64 {
        self.model
            .actions(s)
            .iter()
            .map(|a| self.backup(s, a))
            .fold(None, |acc: Option<f64>, q| Some(acc.map_or(q, |m| m.max(q))))
            .unwrap_or(0.0)
    }

    fn backup(&self, s: &M::State, a: &M::Action) -> f64 {
        if self.model.is_terminal(s) {
            return 0.0;
        }
        self.model
            .transitions(s, a)
            .iter()
            .map(|t| {
                t.probability * (t.reward + self.discount_factor * self.stored_value(&t.next_state))
            })
            .sum()
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}

impl<M: Model> QProvider<M::State, M::Action> for ValueIteration<M> {
    fn q_values(&self, s: &M::State) -> Vec<QValue<M::Action>> {
        self.model
            .actions(s)
            .into_iter()
            .map(|a| {
                let q = self.backup(s, &a);
                QValue::new(a, q)
            })
            .collect()
    }

    fn value(&self, s: &M::State) -> f64 {
        self.stored_value(s)
    }
}
