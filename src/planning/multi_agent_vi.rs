use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{Result, RlError};
use crate::model::GameModel;
use crate::planning::joint_backup::{max_welfare_joint_action, EnumJointBackup, JointBackup, JointQ};
use crate::utils::categorical_sample;

/// States, joint actions and per agent rewards of one played game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord<S, A> {
    pub states: Vec<S>,
    pub joint_actions: Vec<[A; 2]>,
    pub rewards: Vec<[f64; 2]>,
}

impl<S, A> GameRecord<S, A> {
    pub fn max_time_step(&self) -> usize {
        self.joint_actions.len()
    }

    /// Undiscounted return of each agent.
    pub fn total_rewards(&self) -> [f64; 2] {
        self.rewards
            .iter()
            .fold([0.0, 0.0], |acc, r| [acc[0] + r[0], acc[1] + r[1]])
    }
}

/// Value iteration for two-agent stochastic games. Every sweep replaces the
/// max of single agent value iteration by the stage game solution of a
/// [`JointBackup`].
pub struct MultiAgentValueIteration<G: GameModel> {
    game: G,
    backup: EnumJointBackup,
    discount_factor: f64,
    max_delta: f64,
    max_iterations: usize,
    values: IndexMap<G::State, [f64; 2]>,
}

impl<G: GameModel> MultiAgentValueIteration<G> {
    pub fn new(
        game: G,
        backup: EnumJointBackup,
        discount_factor: f64,
        max_delta: f64,
        max_iterations: usize,
    ) -> Self {
        Self {
            game,
            backup,
            discount_factor,
            max_delta,
            max_iterations,
            values: IndexMap::new(),
        }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn n_states(&self) -> usize {
        self.values.len()
    }

    /// Plans for every state reachable from `initial_state` and returns the
    /// number of sweeps run.
    pub fn plan_from_state(&mut self, initial_state: &G::State) -> usize {
        for s in self.reachable_states(initial_state) {
            self.values.entry(s).or_insert([0.0, 0.0]);
        }
        tracing::debug!(states = self.values.len(), "joint reachability done");
        for iteration in 0..self.max_iterations {
            let mut delta: f64 = 0.0;
            for i in 0..self.values.len() {
                let s = match self.values.get_index(i) {
                    Some((s, _)) => s.clone(),
                    None => break,
                };
                let new_values = if self.game.is_terminal(&s) {
                    [0.0, 0.0]
                } else {
                    self.backup.stage_values(&self.joint_q(&s))
                };
                if let Some(entry) = self.values.get_index_mut(i) {
                    for k in 0..2 {
                        delta = delta.max((entry.1[k] - new_values[k]).abs());
                    }
                    *entry.1 = new_values;
                }
            }
            tracing::debug!(iteration, delta, "multi-agent value iteration sweep");
            if delta < self.max_delta {
                tracing::info!(iterations = iteration + 1, "multi-agent value iteration converged");
                return iteration + 1;
            }
        }
        self.max_iterations
    }

    fn reachable_states(&self, seed: &G::State) -> IndexSet<G::State> {
        let mut visited: IndexSet<G::State> = IndexSet::new();
        let mut open: VecDeque<G::State> = VecDeque::new();
        visited.insert(seed.clone());
        open.push_back(seed.clone());
        while let Some(s) = open.pop_front() {
            if self.game.is_terminal(&s) {
                continue;
            }
            let actions = self.game.agent_actions(&s);
            for a0 in &actions {
                for a1 in &actions {
                    for t in self.game.joint_transitions(&s, &[a0.clone(), a1.clone()]) {
                        if t.probability > 0.0 && visited.insert(t.next_state.clone()) {
                            open.push_back(t.next_state);
                        }
                    }
                }
            }
        }
        visited
    }

    /// Stored values of `s`; zero for states never planned.
    pub fn value(&self, s: &G::State) -> [f64; 2] {
        self.values.get(s).copied().unwrap_or([0.0, 0.0])
    }

    /// One-step backups of every joint action from the current values.
    pub fn joint_q(&self, s: &G::State) -> JointQ {
        let actions = self.game.agent_actions(s);
        let n = actions.len();
        let mut q = [Array2::zeros((n, n)), Array2::zeros((n, n))];
        if self.game.is_terminal(s) {
            return q;
        }
        for (i, a0) in actions.iter().enumerate() {
            for (j, a1) in actions.iter().enumerate() {
                for t in self.game.joint_transitions(s, &[a0.clone(), a1.clone()]) {
                    let next = self.value(&t.next_state);
                    for k in 0..2 {
                        q[k][[i, j]] +=
                            t.probability * (t.rewards[k] + self.discount_factor * next[k]);
                    }
                }
            }
        }
        q
    }

    /// Utilitarian joint action of `s`, ties going to the first listed pair.
    pub fn joint_action(&self, s: &G::State) -> Result<[G::Action; 2]> {
        let actions = self.game.agent_actions(s);
        if actions.is_empty() {
            return Err(RlError::NoApplicableActions(format!("{:?}", s)));
        }
        let (i, j) = max_welfare_joint_action(&self.joint_q(s));
        Ok([actions[i].clone(), actions[j].clone()])
    }

    /// Both agents follow [`Self::joint_action`] until the game ends or
    /// `max_steps` joint actions were taken.
    pub fn play_game(
        &self,
        initial_state: G::State,
        max_steps: usize,
        rng: &mut StdRng,
    ) -> Result<GameRecord<G::State, G::Action>> {
        let mut record = GameRecord {
            states: vec![initial_state.clone()],
            joint_actions: vec![],
            rewards: vec![],
        };
        let mut s = initial_state;
        while !self.game.is_terminal(&s) && record.max_time_step() < max_steps {
            let joint = self.joint_action(&s)?;
            let mut outcomes = self.game.joint_transitions(&s, &joint);
            if outcomes.is_empty() {
                return Err(RlError::NoApplicableActions(format!("{:?}", s)));
            }
            let probs: Vec<f64> = outcomes.iter().map(|t| t.probability).collect();
            let t = outcomes.swap_remove(categorical_sample(&probs, rng.gen::<f64>()));
            record.joint_actions.push(joint);
            record.rewards.push(t.rewards);
            record.states.push(t.next_state.clone());
            s = t.next_state;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::env::{Goal, GoalKind, GridGame, GridGameAction, GridGameState, GridState};
    use crate::planning::{CocoQ, MaxWelfare};

    #[test]
    fn max_welfare_agents_head_to_their_own_goals() {
        let (game, start) = GridGame::prisoners_dilemma();
        let mut vi = MultiAgentValueIteration::new(game, MaxWelfare.into(), 0.99, 1e-6, 100);
        let sweeps = vi.plan_from_state(&start);
        assert!(sweeps > 2);
        // ordered pairs of distinct cells at most
        assert!(vi.n_states() > 27 * 20 && vi.n_states() <= 27 * 26);
        assert_eq!(
            vi.joint_action(&start).unwrap(),
            [GridGameAction::West, GridGameAction::East]
        );
        let v = vi.value(&start);
        assert!((v[0] - 96.02).abs() < 1e-6 && (v[1] - 96.02).abs() < 1e-6);

        let mut rng = StdRng::seed_from_u64(0);
        let record = vi.play_game(start, 20, &mut rng).unwrap();
        assert_eq!(record.max_time_step(), 3);
        assert_eq!(record.total_rewards(), [98.0, 98.0]);
        let last = record.states.last().unwrap();
        assert_eq!(last.agents, [GridState::new(0, 0), GridState::new(8, 0)]);
    }

    fn duel() -> (GridGame, GridGameState) {
        let game = GridGame::new(3, 1, vec![Goal::new(1, 0, GoalKind::Universal)]).unwrap();
        (game, GridGameState::new(GridState::new(0, 0), GridState::new(2, 0)))
    }

    #[test]
    fn max_welfare_hands_a_shared_goal_to_one_agent() {
        let (game, start) = duel();
        let mut vi = MultiAgentValueIteration::new(game, MaxWelfare.into(), 0.9, 1e-6, 100);
        vi.plan_from_state(&start);
        assert_eq!(
            vi.joint_action(&start).unwrap(),
            [GridGameAction::East, GridGameAction::Noop]
        );
        assert_eq!(vi.value(&start), [100.0, 0.0]);
    }

    #[test]
    fn coco_side_payments_split_a_shared_goal() {
        let (game, start) = duel();
        let mut vi = MultiAgentValueIteration::new(game, CocoQ::default().into(), 0.9, 1e-6, 100);
        vi.plan_from_state(&start);
        let v = vi.value(&start);
        assert!((v[0] - 50.0).abs() < 1.0, "{:?}", v);
        assert!((v[1] - 50.0).abs() < 1.0, "{:?}", v);
    }
}
