use std::fmt::Debug;
use std::hash::Hash;

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{Result, RlError};
use crate::utils::categorical_sample;

/// One possible outcome of applying an action in a state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub probability: f64,
    pub next_state: S,
    pub reward: f64,
    pub terminated: bool,
}

impl<S> Transition<S> {
    pub fn new(probability: f64, next_state: S, reward: f64, terminated: bool) -> Self {
        Self {
            probability,
            next_state,
            reward,
            terminated,
        }
    }
}

/// Full model of an MDP: applicable actions, the complete transition
/// distribution of every state-action pair and the terminal predicate.
pub trait Model {
    type State: Clone + Eq + Hash + Debug;
    type Action: Clone + Eq + Hash + Debug;

    fn actions(&self, s: &Self::State) -> Vec<Self::Action>;

    /// Outcomes of `a` in `s`; probabilities sum to one.
    fn transitions(&self, s: &Self::State, a: &Self::Action) -> Vec<Transition<Self::State>>;

    fn is_terminal(&self, s: &Self::State) -> bool;

    fn render(&self, s: &Self::State) -> String {
        format!("{:?}", s)
    }

    fn sample(
        &self,
        s: &Self::State,
        a: &Self::Action,
        rng: &mut StdRng,
    ) -> Result<Transition<Self::State>> {
        let mut transitions = self.transitions(s, a);
        if transitions.is_empty() {
            return Err(RlError::NoApplicableActions(format!("{:?}", s)));
        }
        let probs: Vec<f64> = transitions.iter().map(|t| t.probability).collect();
        let i = categorical_sample(&probs, rng.gen::<f64>());
        Ok(transitions.swap_remove(i))
    }

    /// The most likely outcome, used by planners that assume determinism.
    fn most_likely(&self, s: &Self::State, a: &Self::Action) -> Option<Transition<Self::State>> {
        self.transitions(s, a).into_iter().fold(None, |best, t| match best {
            Some(b) if b.probability >= t.probability => Some(b),
            _ => Some(t),
        })
    }
}

/// Dynamics that can only be sampled, as in continuous domains. Every full
/// [`Model`] is one.
pub trait GenerativeModel {
    type State: Clone + Debug;
    type Action: Clone + Debug;

    fn action_set(&self, s: &Self::State) -> Vec<Self::Action>;

    fn sample_outcome(
        &self,
        s: &Self::State,
        a: &Self::Action,
        rng: &mut StdRng,
    ) -> Result<Transition<Self::State>>;

    fn terminal(&self, s: &Self::State) -> bool;
}

impl<M: Model> GenerativeModel for M {
    type State = M::State;
    type Action = M::Action;

    fn action_set(&self, s: &Self::State) -> Vec<Self::Action> {
        self.actions(s)
    }

    fn sample_outcome(
        &self,
        s: &Self::State,
        a: &Self::Action,
        rng: &mut StdRng,
    ) -> Result<Transition<Self::State>> {
        self.sample(s, a, rng)
    }

    fn terminal(&self, s: &Self::State) -> bool {
        self.is_terminal(s)
    }
}

/// Outcome of one joint action in a two-agent stochastic game, with a
/// reward per agent.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTransition<S> {
    pub probability: f64,
    pub next_state: S,
    pub rewards: [f64; 2],
}

/// Full model of a two-agent stochastic game where both agents choose from
/// the same action set at the same time.
pub trait GameModel {
    type State: Clone + Eq + Hash + Debug;
    type Action: Clone + Eq + Hash + Debug;

    fn agent_actions(&self, s: &Self::State) -> Vec<Self::Action>;

    /// Outcomes of the joint action `[a0, a1]`; probabilities sum to one.
    fn joint_transitions(
        &self,
        s: &Self::State,
        joint: &[Self::Action; 2],
    ) -> Vec<JointTransition<Self::State>>;

    fn is_terminal(&self, s: &Self::State) -> bool;
}
