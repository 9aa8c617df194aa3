use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use crate::action_selection::{ActionSelection, EnumActionSelection};
use crate::agent::LearningAgent;
use crate::env::Env;
use crate::episode::Episode;
use crate::error::{Result, RlError};
use crate::options::{OptionOutcome, SubgoalOption};
use crate::value_function::{QProvider, QTable, QValue, ValueInitialization};

/// What the agent decides on in a state: a primitive action or one of its options.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Choice<A> {
    Primitive(A),
    Option(usize),
}

/// Tabular Q-learning. Options are treated as SMDP actions: after `k`
/// primitive steps with discounted return `R` the target is
/// `R + discount^k * max Q(s')`.
pub struct QLearning<S: Clone + Eq + Hash, A> {
    actions: Vec<A>,
    options: Vec<SubgoalOption<S, A>>,
    q_table: QTable<S, Choice<A>>,
    learning_rate: f64,
    discount_factor: f64,
    action_selection: EnumActionSelection<S>,
}

impl<S: Clone + Eq + Hash + Debug, A: Clone + Eq + Hash + Debug> QLearning<S, A> {
    pub fn new(
        actions: Vec<A>,
        discount_factor: f64,
        init: Rc<dyn ValueInitialization<S, Choice<A>>>,
        learning_rate: f64,
        action_selection: EnumActionSelection<S>,
    ) -> Self {
        Self {
            actions,
            options: vec![],
            q_table: QTable::new(init),
            learning_rate,
            discount_factor,
            action_selection,
        }
    }

    pub fn with_options(mut self, options: Vec<SubgoalOption<S, A>>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn n_states(&self) -> usize {
        self.q_table.len()
    }

    pub fn option_name(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(|o| o.name())
    }

    fn choices(&self, s: &S) -> Vec<Choice<A>> {
        let primitives = self.actions.iter().cloned().map(Choice::Primitive);
        let options = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.can_initiate(s))
            .map(|(i, _)| Choice::Option(i));
        primitives.chain(options).collect()
    }

    /// Q-values of every primitive action and applicable option in `s`.
    pub fn choice_values(&self, s: &S) -> Vec<QValue<Choice<A>>> {
        self.q_table.peek(s, || self.choices(s))
    }

    fn max_q(&self, s: &S) -> f64 {
        self.choice_values(s)
            .iter()
            .map(|q| q.q)
            .fold(None, |acc: Option<f64>, q| Some(acc.map_or(q, |m| m.max(q))))
            .unwrap_or(0.0)
    }
}

impl<S: Clone + Eq + Hash + Debug, A: Clone + Eq + Hash + Debug> LearningAgent<S, A>
    for QLearning<S, A>
{
    fn run_learning_episode(
        &mut self,
        env: &mut dyn Env<S, A>,
        max_steps: Option<usize>,
    ) -> Result<Episode<S, A>> {
        let mut curr_obs = env.reset();
        let mut episode = Episode::new(curr_obs.clone());
        let mut terminated = env.is_terminal();

        while !terminated && max_steps.map_or(true, |m| episode.max_time_step() < m) {
            let choices = self.choices(&curr_obs);
            let q_values = self.q_table.entry(&curr_obs, || choices);
            if q_values.is_empty() {
                return Err(RlError::NoApplicableActions(format!("{:?}", curr_obs)));
            }
            let values: Vec<f64> = q_values.iter().map(|q| q.q).collect();
            let index = self.action_selection.get_action(&curr_obs, &values);
            let choice = q_values[index].action.clone();

            let (next_obs, reward, steps, done) = match choice {
                Choice::Primitive(action) => {
                    let (next_obs, reward, done) = env.step(action.clone())?;
                    episode.record(action, reward, next_obs.clone());
                    (next_obs, reward, 1, done)
                }
                Choice::Option(o) => {
                    let OptionOutcome {
                        state,
                        discounted_reward,
                        steps,
                        terminated,
                        episode: option_episode,
                    } = self.options[o].control(env, self.discount_factor)?;
                    episode.extend(option_episode);
                    (state, discounted_reward, steps, terminated)
                }
            };

            let future_q_value = if env.is_terminal() {
                0.0
            } else {
                self.max_q(&next_obs)
            };
            let target = reward + self.discount_factor.powi(steps as i32) * future_q_value;
            let learning_rate = self.learning_rate;
            let q = &mut self.q_table.entry(&curr_obs, Vec::new)[index];
            q.q += learning_rate * (target - q.q);

            curr_obs = next_obs;
            terminated = done;
        }
        self.action_selection.update();
        Ok(episode)
    }

    fn reset(&mut self) {
        self.q_table.clear();
        self.action_selection.reset();
    }
}

impl<S: Clone + Eq + Hash + Debug, A: Clone + Eq + Hash + Debug> QProvider<S, A>
    for QLearning<S, A>
{
    fn q_values(&self, s: &S) -> Vec<QValue<A>> {
        self.choice_values(s)
            .into_iter()
            .filter_map(|q| match q.action {
                Choice::Primitive(a) => Some(QValue::new(a, q.q)),
                Choice::Option(_) => None,
            })
            .collect()
    }

    /// Includes the options applicable in `s`.
    fn value(&self, s: &S) -> f64 {
        self.max_q(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_selection::EpsilonGreedy;
    use crate::env::{GridAction, GridState, GridWorld, SimulatedEnv};
    use crate::value_function::ConstantValue;

    fn agent(epsilon: f64) -> QLearning<GridState, GridAction> {
        QLearning::new(
            GridAction::ALL.to_vec(),
            0.99,
            Rc::new(ConstantValue(0.0)),
            1.0,
            EpsilonGreedy::new(epsilon, 11).into(),
        )
    }

    #[test]
    fn terminal_target_uses_only_the_reward() {
        let gw = GridWorld::empty(2, 1).with_goal(1, 0);
        let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), 0);
        let mut ql = agent(0.0);
        // ties go to north first, which bumps into the border
        let e = ql.run_learning_episode(&mut env, Some(10)).unwrap();
        assert_eq!(e.last_state(), Some(&GridState::new(1, 0)));
        let east = ql.q_value(&GridState::new(0, 0), &GridAction::East);
        assert_eq!(east, -1.0);
    }

    #[test]
    fn step_cap_ends_the_episode() {
        let gw = GridWorld::four_rooms().with_goal(10, 10);
        let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), 0);
        let mut ql = agent(0.5);
        let e = ql.run_learning_episode(&mut env, Some(7)).unwrap();
        assert_eq!(e.max_time_step(), 7);
        assert_eq!(e.states.len(), 8);
    }

    #[test]
    fn reset_forgets_the_table() {
        let gw = GridWorld::empty(3, 1).with_goal(2, 0);
        let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), 0);
        let mut ql = agent(0.1);
        ql.run_learning_episode(&mut env, Some(50)).unwrap();
        assert!(ql.n_states() > 0);
        ql.reset();
        assert_eq!(ql.n_states(), 0);
    }
}
