mod planner_policy;

use std::fmt::Debug;

use crate::error::{Result, RlError};
use crate::value_function::QProvider;

pub use planner_policy::DynamicPlannerPolicy;

pub trait Policy<S, A> {
    fn action(&mut self, s: &S) -> Result<A>;
}

/// Always picks the highest valued action of a [`QProvider`].
pub struct GreedyQPolicy<'a, P> {
    provider: &'a P,
}

impl<'a, P> GreedyQPolicy<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }
}

impl<'a, S: Debug, A, P: QProvider<S, A>> Policy<S, A> for GreedyQPolicy<'a, P> {
    fn action(&mut self, s: &S) -> Result<A> {
        self.provider
            .greedy_action(s)
            .ok_or_else(|| RlError::NoApplicableActions(format!("{:?}", s)))
    }
}
