mod rooms;

use std::rc::Rc;

use crate::env::{Env, StateCondition};
use crate::episode::Episode;
use crate::error::Result;
use crate::policy::Policy;

pub use rooms::{four_rooms_options, room_option, Room};

/// What happened while an option was in control of the environment.
#[derive(Debug, Clone)]
pub struct OptionOutcome<S, A> {
    pub state: S,
    /// Rewards discounted from the moment the option was initiated.
    pub discounted_reward: f64,
    pub steps: usize,
    pub terminated: bool,
    pub episode: Episode<S, A>,
}

/// Temporally extended action: a policy that runs from its initiation set
/// until its termination condition holds.
pub struct SubgoalOption<S, A> {
    name: String,
    initiation: Rc<dyn StateCondition<S>>,
    termination: Rc<dyn StateCondition<S>>,
    policy: Box<dyn Policy<S, A>>,
    max_steps: usize,
}

impl<S: Clone, A: Clone> SubgoalOption<S, A> {
    pub fn new(
        name: &str,
        initiation: Rc<dyn StateCondition<S>>,
        termination: Rc<dyn StateCondition<S>>,
        policy: Box<dyn Policy<S, A>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            initiation,
            termination,
            policy,
            max_steps: 1000,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn can_initiate(&self, s: &S) -> bool {
        self.initiation.satisfies(s)
    }

    pub fn terminates_in(&self, s: &S) -> bool {
        self.termination.satisfies(s)
    }

    /// Runs the option from the environment's current state. It always takes
    /// at least one step and stops on its termination condition, a terminal
    /// environment state or its step cap.
    pub fn control(
        &mut self,
        env: &mut dyn Env<S, A>,
        discount_factor: f64,
    ) -> Result<OptionOutcome<S, A>> {
        let mut s = env.current_observation();
        let mut episode = Episode::new(s.clone());
        let mut discounted_reward = 0.0;
        let mut discount = 1.0;
        let mut terminated = false;
        while !terminated && episode.max_time_step() < self.max_steps {
            let a = self.policy.action(&s)?;
            let (next, reward, done) = env.step(a.clone())?;
            episode.record(a, reward, next.clone());
            discounted_reward += discount * reward;
            discount *= discount_factor;
            s = next;
            terminated = done;
            if self.termination.satisfies(&s) {
                break;
            }
        }
        tracing::trace!(option = %self.name, steps = episode.max_time_step(), "option finished");
        Ok(OptionOutcome {
            state: s,
            discounted_reward,
            steps: episode.max_time_step(),
            terminated,
            episode,
        })
    }
}
