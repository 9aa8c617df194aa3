use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::action_selection::{ActionSelection, EnumActionSelection};
use crate::agent::LearningAgent;
use crate::env::Env;
use crate::episode::Episode;
use crate::error::{Result, RlError};
use crate::value_function::{QProvider, QTable, QValue, ValueInitialization};

/// Traces below this are dropped.
const MIN_ELIGIBILITY: f64 = 0.01;

/// On-policy SARSA(lambda) with replacing eligibility traces.
pub struct SarsaLambda<S: Clone + Eq + Hash, A> {
    actions: Vec<A>,
    q_table: QTable<S, A>,
    learning_rate: f64,
    discount_factor: f64,
    lambda_factor: f64,
    action_selection: EnumActionSelection<S>,
    trace: FxHashMap<S, Vec<f64>>,
}

impl<S: Clone + Eq + Hash + Debug, A: Clone + Eq + Hash + Debug> SarsaLambda<S, A> {
    pub fn new(
        actions: Vec<A>,
        discount_factor: f64,
        init: Rc<dyn ValueInitialization<S, A>>,
        learning_rate: f64,
        lambda_factor: f64,
        action_selection: EnumActionSelection<S>,
    ) -> Self {
        Self {
            actions,
            q_table: QTable::new(init),
            learning_rate,
            discount_factor,
            lambda_factor,
            action_selection,
            trace: FxHashMap::default(),
        }
    }

    fn get_action(&mut self, obs: &S) -> Result<usize> {
        let actions = &self.actions;
        let values: Vec<f64> = self
            .q_table
            .entry(obs, || actions.clone())
            .iter()
            .map(|q| q.q)
            .collect();
        if values.is_empty() {
            return Err(RlError::NoApplicableActions(format!("{:?}", obs)));
        }
        Ok(self.action_selection.get_action(obs, &values))
    }

    fn q(&mut self, obs: &S, action: usize) -> f64 {
        let actions = &self.actions;
        self.q_table.entry(obs, || actions.clone())[action].q
    }
}

impl<S: Clone + Eq + Hash + Debug, A: Clone + Eq + Hash + Debug> LearningAgent<S, A>
    for SarsaLambda<S, A>
{
    fn run_learning_episode(
        &mut self,
        env: &mut dyn Env<S, A>,
        max_steps: Option<usize>,
    ) -> Result<Episode<S, A>> {
        let mut curr_obs = env.reset();
        let mut episode = Episode::new(curr_obs.clone());
        let mut terminated = env.is_terminal();
        let mut curr_action = if terminated {
            0
        } else {
            self.get_action(&curr_obs)?
        };

        while !terminated && max_steps.map_or(true, |m| episode.max_time_step() < m) {
            let action = self.actions[curr_action].clone();
            let (next_obs, reward, done) = env.step(action.clone())?;
            episode.record(action, reward, next_obs.clone());

            let (next_action, future_q_value) = if env.is_terminal() {
                (0, 0.0)
            } else {
                let next_action = self.get_action(&next_obs)?;
                (next_action, self.q(&next_obs, next_action))
            };
            let temporal_difference: f64 =
                reward + self.discount_factor * future_q_value - self.q(&curr_obs, curr_action);

            let n_actions = self.actions.len();
            let curr_trace = self
                .trace
                .entry(curr_obs.clone())
                .or_insert_with(|| vec![0.0; n_actions]);
            curr_trace[curr_action] = 1.0;

            let decay = self.discount_factor * self.lambda_factor;
            let actions = &self.actions;
            for (obs, trace_values) in self.trace.iter_mut() {
                let q_values = self.q_table.entry(obs, || actions.clone());
                for (q, value) in q_values.iter_mut().zip(trace_values.iter_mut()) {
                    q.q += self.learning_rate * temporal_difference * *value;
                    *value *= decay;
                }
            }
            self.trace
                .retain(|_, values| values.iter().any(|v| *v >= MIN_ELIGIBILITY));

            curr_obs = next_obs;
            curr_action = next_action;
            terminated = done;
        }
        self.trace.clear();
        self.action_selection.update();
        Ok(episode)
    }

    fn reset(&mut self) {
        self.q_table.clear();
        self.trace.clear();
        self.action_selection.reset();
    }
}

impl<S: Clone + Eq + Hash + Debug, A: Clone + Eq + Hash + Debug> QProvider<S, A>
    for SarsaLambda<S, A>
{
    fn q_values(&self, s: &S) -> Vec<QValue<A>> {
        self.q_table.peek(s, || self.actions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_selection::EpsilonGreedy;
    use crate::env::{GridAction, GridState, GridWorld, SimulatedEnv};
    use crate::value_function::ConstantValue;

    #[test]
    fn traces_spread_the_goal_reward_backwards() {
        let gw = GridWorld::empty(4, 1)
            .with_goal(3, 0)
            .with_reward_function(Rc::new(|_: &GridState, _: &GridAction, n: &GridState| {
                if n.x == 3 {
                    10.0
                } else {
                    0.0
                }
            }));
        let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), 0);
        let mut sarsa = SarsaLambda::new(
            vec![GridAction::East],
            0.9,
            Rc::new(ConstantValue(0.0)),
            0.5,
            0.8,
            EpsilonGreedy::new(0.0, 1).into(),
        );
        let e = sarsa.run_learning_episode(&mut env, None).unwrap();
        assert_eq!(e.max_time_step(), 3);
        // one episode reaches every state on the path
        assert!(sarsa.value(&GridState::new(2, 0)) > 0.0);
        assert!(sarsa.value(&GridState::new(1, 0)) > 0.0);
        assert!(sarsa.value(&GridState::new(0, 0)) > 0.0);
        assert!(sarsa.value(&GridState::new(0, 0)) < sarsa.value(&GridState::new(2, 0)));
    }
}
