use serde::{Deserialize, Serialize};

use crate::env::GridState;
use crate::error::{Result, RlError};
use crate::model::{GameModel, JointTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridGameAction {
    North,
    South,
    East,
    West,
    Noop,
}

impl GridGameAction {
    pub const ALL: [GridGameAction; 5] = [
        GridGameAction::North,
        GridGameAction::South,
        GridGameAction::East,
        GridGameAction::West,
        GridGameAction::Noop,
    ];

    fn delta(&self) -> (i64, i64) {
        match self {
            GridGameAction::North => (0, 1),
            GridGameAction::South => (0, -1),
            GridGameAction::East => (1, 0),
            GridGameAction::West => (-1, 0),
            GridGameAction::Noop => (0, 0),
        }
    }
}

/// Who may claim a goal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalKind {
    Universal,
    Personal(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Goal {
    pub x: usize,
    pub y: usize,
    pub kind: GoalKind,
}

impl Goal {
    pub fn new(x: usize, y: usize, kind: GoalKind) -> Self {
        Self { x, y, kind }
    }

    fn claimable_by(&self, agent: usize) -> bool {
        match self.kind {
            GoalKind::Universal => true,
            GoalKind::Personal(owner) => owner == agent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridGameState {
    pub agents: [GridState; 2],
}

impl GridGameState {
    pub fn new(first: GridState, second: GridState) -> Self {
        Self {
            agents: [first, second],
        }
    }
}

/// Two agents moving at the same time on an open grid. Each pays
/// `step_cost` per move and collects `goal_reward` on a goal it may claim,
/// which ends the game for both. Agents contending for one cell get it with
/// probability one half each; agents trying to swap cells both stay put.
#[derive(Debug, Clone)]
pub struct GridGame {
    width: usize,
    height: usize,
    goals: Vec<Goal>,
    step_cost: f64,
    goal_reward: f64,
    noop_costs: bool,
}

impl GridGame {
    pub fn new(width: usize, height: usize, goals: Vec<Goal>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RlError::InvalidParameter(
                "grid game needs at least one cell".to_string(),
            ));
        }
        if goals.iter().any(|g| g.x >= width || g.y >= height) {
            return Err(RlError::InvalidParameter(
                "grid game goal outside the grid".to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            goals,
            step_cost: -1.0,
            goal_reward: 100.0,
            noop_costs: false,
        })
    }

    /// Both agents are one step from a shared goal and three from their own.
    /// Heading home together pays each more than racing for the shared cell.
    pub fn prisoners_dilemma() -> (Self, GridGameState) {
        let game = Self {
            width: 9,
            height: 3,
            goals: vec![
                Goal::new(0, 0, GoalKind::Personal(0)),
                Goal::new(4, 0, GoalKind::Universal),
                Goal::new(8, 0, GoalKind::Personal(1)),
            ],
            step_cost: -1.0,
            goal_reward: 100.0,
            noop_costs: false,
        };
        (game, GridGameState::new(GridState::new(3, 0), GridState::new(5, 0)))
    }

    pub fn with_rewards(mut self, step_cost: f64, goal_reward: f64, noop_costs: bool) -> Self {
        self.step_cost = step_cost;
        self.goal_reward = goal_reward;
        self.noop_costs = noop_costs;
        self
    }

    fn claims_goal(&self, agent: usize, p: &GridState) -> bool {
        self.goals
            .iter()
            .any(|g| g.x == p.x && g.y == p.y && g.claimable_by(agent))
    }

    fn intended(&self, p: &GridState, a: &GridGameAction) -> GridState {
        let (dx, dy) = a.delta();
        let x = (p.x as i64 + dx).clamp(0, self.width as i64 - 1) as usize;
        let y = (p.y as i64 + dy).clamp(0, self.height as i64 - 1) as usize;
        GridState::new(x, y)
    }

    /// Final positions when `winner` takes any contested cell.
    fn resolve(current: &[GridState; 2], targets: &[GridState; 2], winner: usize) -> [GridState; 2] {
        if targets[0] == current[1] && targets[1] == current[0] {
            return *current;
        }
        let mut next = *targets;
        if next[0] == next[1] {
            next[1 - winner] = current[1 - winner];
        }
        // an agent cannot enter a cell its occupant keeps
        loop {
            let mut blocked = false;
            for i in 0..2 {
                if next[i] != current[i] && next[i] == next[1 - i] {
                    next[i] = current[i];
                    blocked = true;
                }
            }
            if !blocked {
                break;
            }
        }
        next
    }

    fn rewards(&self, next: &[GridState; 2], joint: &[GridGameAction; 2]) -> [f64; 2] {
        let mut rewards = [0.0; 2];
        for (i, r) in rewards.iter_mut().enumerate() {
            *r = if self.claims_goal(i, &next[i]) {
                self.goal_reward
            } else if joint[i] == GridGameAction::Noop && !self.noop_costs {
                0.0
            } else {
                self.step_cost
            };
        }
        rewards
    }

    pub fn render(&self, s: &GridGameState) -> String {
        let mut rows: Vec<String> = Vec::with_capacity(self.height);
        for y in (0..self.height).rev() {
            let row: String = (0..self.width)
                .map(|x| {
                    let p = GridState::new(x, y);
                    if s.agents[0] == p {
                        '0'
                    } else if s.agents[1] == p {
                        '1'
                    } else {
                        match self.goals.iter().find(|g| g.x == x && g.y == y) {
                            Some(Goal {
                                kind: GoalKind::Universal,
                                ..
                            }) => '*',
                            Some(_) => 'g',
                            None => '.',
                        }
                    }
                })
                .collect();
            rows.push(row);
        }
        rows.join("\n")
    }
}

impl GameModel for GridGame {
    type State = GridGameState;
    type Action = GridGameAction;

    fn agent_actions(&self, _s: &GridGameState) -> Vec<GridGameAction> {
        GridGameAction::ALL.to_vec()
    }

    fn joint_transitions(
        &self,
        s: &GridGameState,
        joint: &[GridGameAction; 2],
    ) -> Vec<JointTransition<GridGameState>> {
        let current = s.agents;
        let targets = [
            self.intended(&current[0], &joint[0]),
            self.intended(&current[1], &joint[1]),
        ];
        let contested =
            targets[0] == targets[1] && targets[0] != current[0] && targets[1] != current[1];
        let winners: &[usize] = if contested { &[0, 1] } else { &[0] };
        let p = 1.0 / winners.len() as f64;
        winners
            .iter()
            .map(|w| {
                let next = Self::resolve(&current, &targets, *w);
                JointTransition {
                    probability: p,
                    next_state: GridGameState { agents: next },
                    rewards: self.rewards(&next, joint),
                }
            })
            .collect()
    }

    fn is_terminal(&self, s: &GridGameState) -> bool {
        (0..2).any(|i| self.claims_goal(i, &s.agents[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GridGameAction::*;

    fn corridor() -> GridGame {
        GridGame::new(5, 1, vec![Goal::new(2, 0, GoalKind::Universal)]).unwrap()
    }

    fn at(a: (usize, usize), b: (usize, usize)) -> GridGameState {
        GridGameState::new(GridState::new(a.0, a.1), GridState::new(b.0, b.1))
    }

    #[test]
    fn contested_cells_go_to_either_agent() {
        let game = corridor();
        let ts = game.joint_transitions(&at((1, 0), (3, 0)), &[East, West]);
        assert_eq!(ts.len(), 2);
        assert_eq!(ts[0].probability, 0.5);
        assert_eq!(ts[0].next_state, at((2, 0), (3, 0)));
        assert_eq!(ts[0].rewards, [100.0, -1.0]);
        assert_eq!(ts[1].next_state, at((1, 0), (2, 0)));
        assert_eq!(ts[1].rewards, [-1.0, 100.0]);
        assert!(ts.iter().all(|t| game.is_terminal(&t.next_state)));
    }

    #[test]
    fn agents_cannot_swap_or_enter_a_kept_cell() {
        let game = corridor();
        let ts = game.joint_transitions(&at((0, 0), (1, 0)), &[East, West]);
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].next_state, at((0, 0), (1, 0)));
        assert_eq!(ts[0].rewards, [-1.0, -1.0]);

        let ts = game.joint_transitions(&at((0, 0), (1, 0)), &[East, Noop]);
        assert_eq!(ts[0].next_state, at((0, 0), (1, 0)));
        assert_eq!(ts[0].rewards, [-1.0, 0.0]);

        // bumping into the border keeps the cell too
        let ts = game.joint_transitions(&at((0, 0), (1, 0)), &[East, North]);
        assert_eq!(ts[0].next_state, at((0, 0), (1, 0)));

        // following an agent that moves away is fine
        let ts = game.joint_transitions(&at((0, 0), (1, 0)), &[East, East]);
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].next_state, at((1, 0), (2, 0)));
        assert_eq!(ts[0].rewards, [-1.0, 100.0]);
    }

    #[test]
    fn personal_goals_only_pay_their_owner() {
        let (game, start) = GridGame::prisoners_dilemma();
        assert!(!game.is_terminal(&start));
        assert!(!game.is_terminal(&at((8, 0), (0, 0))));
        assert!(game.is_terminal(&at((0, 0), (6, 0))));
        let ts = game.joint_transitions(&at((1, 0), (7, 0)), &[West, East]);
        assert_eq!(ts[0].rewards, [100.0, 100.0]);
        assert!(game.render(&start).contains("g..0*1..g"));
    }

    #[test]
    fn goals_must_lie_on_the_grid() {
        assert!(GridGame::new(3, 3, vec![Goal::new(3, 0, GoalKind::Universal)]).is_err());
    }
}
