use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::env::{Env, StateGenerator};
use crate::error::{Result, RlError};
use crate::model::Model;

/// Environment that samples its dynamics from a full [`Model`].
pub struct SimulatedEnv<M: Model> {
    model: M,
    generator: StateGenerator<M::State>,
    curr_state: M::State,
    ready: bool,
    rng: StdRng,
}

impl<M: Model> SimulatedEnv<M> {
    /// Every episode starts from `initial_state`.
    pub fn new(model: M, initial_state: M::State, seed: u64) -> Self
    where
        M::State: 'static,
    {
        let curr_state = initial_state.clone();
        Self {
            model,
            generator: Box::new(move |_: &mut StdRng| initial_state.clone()),
            curr_state,
            ready: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_generator(model: M, mut generator: StateGenerator<M::State>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let curr_state = generator(&mut rng);
        Self {
            model,
            generator,
            curr_state,
            ready: false,
            rng,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: Model> Env<M::State, M::Action> for SimulatedEnv<M> {
    fn reset(&mut self) -> M::State {
        self.curr_state = (self.generator)(&mut self.rng);
        self.ready = !self.model.is_terminal(&self.curr_state);
        self.curr_state.clone()
    }

    fn step(&mut self, action: M::Action) -> Result<(M::State, f64, bool)> {
        if !self.ready {
            return Err(RlError::EnvNotReady);
        }
        let outcome = self.model.sample(&self.curr_state, &action, &mut self.rng)?;
        self.curr_state = outcome.next_state;
        if outcome.terminated {
            self.ready = false;
        }
        Ok((self.curr_state.clone(), outcome.reward, outcome.terminated))
    }

    fn current_observation(&self) -> M::State {
        self.curr_state.clone()
    }

    fn is_terminal(&self) -> bool {
        self.model.is_terminal(&self.curr_state)
    }

    fn render(&self) -> String {
        self.model.render(&self.curr_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{GridAction, GridState, GridWorld};

    #[test]
    fn steps_fail_before_reset_and_after_termination() {
        let gw = GridWorld::empty(2, 1).with_goal(1, 0);
        let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), 7);
        assert!(matches!(env.step(GridAction::East), Err(RlError::EnvNotReady)));

        assert_eq!(env.reset(), GridState::new(0, 0));
        let (s, r, terminated) = env.step(GridAction::East).unwrap();
        assert_eq!(s, GridState::new(1, 0));
        assert_eq!(r, -1.0);
        assert!(terminated);
        assert!(env.is_terminal());
        assert!(matches!(env.step(GridAction::West), Err(RlError::EnvNotReady)));
    }

    #[test]
    fn generator_drives_every_reset() {
        let gw = GridWorld::empty(1, 5);
        let mut env = SimulatedEnv::with_generator(
            gw,
            Box::new(|rng: &mut StdRng| {
                use rand::Rng;
                GridState::new(0, rng.gen_range(0..5))
            }),
            3,
        );
        for _ in 0..20 {
            let s = env.reset();
            assert_eq!(s.x, 0);
            assert!(s.y < 5);
        }
    }
}
