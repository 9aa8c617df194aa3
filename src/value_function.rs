use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::utils::argmax;

#[derive(Debug, Clone, PartialEq)]
pub struct QValue<A> {
    pub action: A,
    pub q: f64,
}

impl<A> QValue<A> {
    pub fn new(action: A, q: f64) -> Self {
        Self { action, q }
    }
}

/// Initial value of states (and state-action pairs) a solver has not seen yet.
pub trait ValueInitialization<S, A> {
    fn value(&self, s: &S) -> f64;

    fn q_value(&self, s: &S, _a: &A) -> f64 {
        self.value(s)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantValue(pub f64);

impl<S, A> ValueInitialization<S, A> for ConstantValue {
    fn value(&self, _s: &S) -> f64 {
        self.0
    }
}

/// Anything that can report Q-values for a state.
pub trait QProvider<S, A> {
    fn q_values(&self, s: &S) -> Vec<QValue<A>>;

    fn q_value(&self, s: &S, a: &A) -> f64
    where
        A: PartialEq,
    {
        self.q_values(s)
            .into_iter()
            .find(|q| &q.action == a)
            .map(|q| q.q)
            .unwrap_or(0.0)
    }

    /// Max over the Q-values; zero when no action applies.
    fn value(&self, s: &S) -> f64 {
        self.q_values(s)
            .iter()
            .map(|q| q.q)
            .fold(None, |acc: Option<f64>, q| Some(acc.map_or(q, |m| m.max(q))))
            .unwrap_or(0.0)
    }

    /// Ties go to the first listed action.
    fn greedy_action(&self, s: &S) -> Option<A> {
        let qs = self.q_values(s);
        if qs.is_empty() {
            return None;
        }
        let best = argmax(qs.iter().map(|q| q.q));
        qs.into_iter().nth(best).map(|q| q.action)
    }
}

/// Lazily populated table of Q-values keyed by state.
pub struct QTable<S, A> {
    values: FxHashMap<S, Vec<QValue<A>>>,
    init: Rc<dyn ValueInitialization<S, A>>,
}

impl<S: Clone + Eq + Hash + Debug, A: Clone + PartialEq + Debug> QTable<S, A> {
    pub fn new(init: Rc<dyn ValueInitialization<S, A>>) -> Self {
        Self {
            values: FxHashMap::default(),
            init,
        }
    }

    /// Stored Q-values of `s`, created from `actions` on first visit.
    pub fn entry(&mut self, s: &S, actions: impl FnOnce() -> Vec<A>) -> &mut Vec<QValue<A>> {
        let init = &self.init;
        self.values.entry(s.clone()).or_insert_with(|| {
            actions()
                .into_iter()
                .map(|a| {
                    let q = init.q_value(s, &a);
                    QValue::new(a, q)
                })
                .collect()
        })
    }

    /// Stored Q-values of `s`, or initial values without storing them.
    pub fn peek(&self, s: &S, actions: impl FnOnce() -> Vec<A>) -> Vec<QValue<A>> {
        match self.values.get(s) {
            Some(qs) => qs.clone(),
            None => actions()
                .into_iter()
                .map(|a| {
                    let q = self.init.q_value(s, &a);
                    QValue::new(a, q)
                })
                .collect(),
        }
    }

    pub fn contains(&self, s: &S) -> bool {
        self.values.contains_key(s)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_created_once_with_the_initial_value() {
        let mut table: QTable<u8, char> = QTable::new(Rc::new(ConstantValue(0.5)));
        assert!(table.peek(&1, || vec!['a']).iter().all(|q| q.q == 0.5));
        assert!(table.is_empty());

        table.entry(&1, || vec!['a', 'b'])[1].q = 2.0;
        let qs = table.entry(&1, || panic!("already stored"));
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[1].q, 2.0);

        table.clear();
        assert!(!table.contains(&1));
    }
}
