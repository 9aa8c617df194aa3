use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;

use fxhash::{FxHashMap, FxHashSet};

use crate::env::StateCondition;
use crate::error::{Result, RlError};
use crate::model::Model;

/// Search order of a [`DeterministicPlanner`].
#[derive(Clone)]
pub enum SearchStrategy<S> {
    Bfs,
    /// Depth-first, optionally bounded in plan length.
    Dfs { max_depth: Option<usize> },
    /// Best-first on accumulated cost plus the heuristic cost-to-go.
    AStar(Rc<dyn Fn(&S) -> f64>),
}

impl<S> std::fmt::Debug for SearchStrategy<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchStrategy::Bfs => write!(f, "Bfs"),
            SearchStrategy::Dfs { max_depth } => {
                f.debug_struct("Dfs").field("max_depth", max_depth).finish()
            }
            SearchStrategy::AStar(_) => write!(f, "AStar"),
        }
    }
}

struct Frontier<S> {
    f: f64,
    g: f64,
    order: usize,
    state: S,
}

impl<S> PartialEq for Frontier<S> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<S> Eq for Frontier<S> {}

impl<S> PartialOrd for Frontier<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for Frontier<S> {
    // BinaryHeap is a max-heap: lowest f first, then oldest insertion
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Forward search planner over the most likely outcome of every action.
pub struct DeterministicPlanner<M: Model> {
    model: M,
    goal: Rc<dyn StateCondition<M::State>>,
    strategy: SearchStrategy<M::State>,
    cache: FxHashMap<M::State, M::Action>,
}

type Parents<S, A> = FxHashMap<S, (S, A)>;

impl<M: Model> DeterministicPlanner<M> {
    pub fn new(
        model: M,
        goal: Rc<dyn StateCondition<M::State>>,
        strategy: SearchStrategy<M::State>,
    ) -> Self {
        Self {
            model,
            goal,
            strategy,
            cache: FxHashMap::default(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn cached_action(&self, s: &M::State) -> Option<&M::Action> {
        self.cache.get(s)
    }

    pub fn reset(&mut self) {
        self.cache.clear();
    }

    /// Searches a plan from `initial_state` to the goal and caches the
    /// action taken at every state along it.
    pub fn plan_from_state(&mut self, initial_state: &M::State) -> Result<Vec<M::Action>> {
        if self.goal.satisfies(initial_state) {
            return Ok(vec![]);
        }
        let found = match &self.strategy {
            SearchStrategy::Bfs => self.bfs(initial_state),
            SearchStrategy::Dfs { max_depth } => self.dfs(initial_state, *max_depth),
            SearchStrategy::AStar(h) => self.astar(initial_state, h.as_ref()),
        };
        let (goal_state, parents) =
            found.ok_or_else(|| RlError::PlanNotFound(format!("{:?}", initial_state)))?;

        let mut plan: Vec<M::Action> = vec![];
        let mut s = goal_state;
        while let Some((prev, a)) = parents.get(&s) {
            self.cache.insert(prev.clone(), a.clone());
            plan.push(a.clone());
            if prev == initial_state {
                break;
            }
            s = prev.clone();
        }
        plan.reverse();
        tracing::debug!(strategy = ?self.strategy, length = plan.len(), "plan found");
        Ok(plan)
    }

    fn successors(&self, s: &M::State) -> Vec<(M::Action, M::State, f64)> {
        if self.model.is_terminal(s) {
            return vec![];
        }
        self.model
            .actions(s)
            .into_iter()
            .filter_map(|a| {
                self.model
                    .most_likely(s, &a)
                    .map(|t| (a, t.next_state, -t.reward))
            })
            .collect()
    }

    fn bfs(&self, start: &M::State) -> Option<(M::State, Parents<M::State, M::Action>)> {
        let mut parents: Parents<M::State, M::Action> = FxHashMap::default();
        let mut visited: FxHashSet<M::State> = FxHashSet::default();
        let mut open: VecDeque<M::State> = VecDeque::new();
        visited.insert(start.clone());
        open.push_back(start.clone());
        while let Some(s) = open.pop_front() {
            for (a, next, _) in self.successors(&s) {
                if !visited.insert(next.clone()) {
                    continue;
                }
                parents.insert(next.clone(), (s.clone(), a));
                if self.goal.satisfies(&next) {
                    return Some((next, parents));
                }
                open.push_back(next);
            }
        }
        None
    }

    fn dfs(
        &self,
        start: &M::State,
        max_depth: Option<usize>,
    ) -> Option<(M::State, Parents<M::State, M::Action>)> {
        let mut parents: Parents<M::State, M::Action> = FxHashMap::default();
        let mut visited: FxHashSet<M::State> = FxHashSet::default();
        let mut stack: Vec<(M::State, usize)> = vec![(start.clone(), 0)];
        visited.insert(start.clone());
        while let Some((s, depth)) = stack.pop() {
            if self.goal.satisfies(&s) {
                return Some((s, parents));
            }
            if max_depth.map_or(false, |d| depth >= d) {
                continue;
            }
            // reversed so the first listed action is explored first
            for (a, next, _) in self.successors(&s).into_iter().rev() {
                if visited.insert(next.clone()) {
                    parents.insert(next.clone(), (s.clone(), a));
                    stack.push((next, depth + 1));
                }
            }
        }
        None
    }

    fn astar(
        &self,
        start: &M::State,
        heuristic: &dyn Fn(&M::State) -> f64,
    ) -> Option<(M::State, Parents<M::State, M::Action>)> {
        let mut parents: Parents<M::State, M::Action> = FxHashMap::default();
        let mut best_g: FxHashMap<M::State, f64> = FxHashMap::default();
        let mut closed: FxHashSet<M::State> = FxHashSet::default();
        let mut open: BinaryHeap<Frontier<M::State>> = BinaryHeap::new();
        let mut order = 0usize;

        best_g.insert(start.clone(), 0.0);
        open.push(Frontier {
            f: heuristic(start),
            g: 0.0,
            order,
            state: start.clone(),
        });
        while let Some(node) = open.pop() {
            if self.goal.satisfies(&node.state) {
                return Some((node.state, parents));
            }
            if !closed.insert(node.state.clone()) {
                continue;
            }
            for (a, next, cost) in self.successors(&node.state) {
                let g = node.g + cost;
                if closed.contains(&next) || best_g.get(&next).map_or(false, |old| *old <= g) {
                    continue;
                }
                best_g.insert(next.clone(), g);
                parents.insert(next.clone(), (node.state.clone(), a));
                order += 1;
                open.push(Frontier {
                    f: g + heuristic(&next),
                    g,
                    order,
                    state: next,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{GridAction, GridState, GridWorld};
    use crate::model::Model;

    fn goal(x: usize, y: usize) -> Rc<dyn StateCondition<GridState>> {
        Rc::new(GridWorld::at_cell(x, y))
    }

    fn follow(gw: &GridWorld, mut s: GridState, plan: &[GridAction]) -> GridState {
        for a in plan {
            s = gw.most_likely(&s, a).unwrap().next_state;
        }
        s
    }

    #[test]
    fn bfs_finds_a_shortest_plan_through_the_doors() {
        let gw = GridWorld::four_rooms().with_goal(10, 10);
        let mut planner = DeterministicPlanner::new(gw.clone(), goal(10, 10), SearchStrategy::Bfs);
        let plan = planner.plan_from_state(&GridState::new(0, 0)).unwrap();
        assert_eq!(plan.len(), 20);
        assert_eq!(follow(&gw, GridState::new(0, 0), &plan), GridState::new(10, 10));
        assert_eq!(
            planner.cached_action(&GridState::new(0, 0)),
            plan.first()
        );
    }

    #[test]
    fn astar_matches_bfs_length() {
        let gw = GridWorld::four_rooms().with_goal(10, 10);
        let heuristic = GridWorld::manhattan_to(10, 10);
        let mut planner = DeterministicPlanner::new(
            gw.clone(),
            goal(10, 10),
            SearchStrategy::AStar(Rc::new(heuristic)),
        );
        let plan = planner.plan_from_state(&GridState::new(0, 0)).unwrap();
        assert_eq!(plan.len(), 20);
        assert_eq!(follow(&gw, GridState::new(0, 0), &plan), GridState::new(10, 10));
    }

    #[test]
    fn dfs_finds_some_plan() {
        let gw = GridWorld::four_rooms().with_goal(10, 10);
        let mut planner = DeterministicPlanner::new(
            gw.clone(),
            goal(10, 10),
            SearchStrategy::Dfs { max_depth: None },
        );
        let plan = planner.plan_from_state(&GridState::new(0, 0)).unwrap();
        assert!(plan.len() >= 20);
        assert_eq!(follow(&gw, GridState::new(0, 0), &plan), GridState::new(10, 10));
    }

    #[test]
    fn unreachable_goal_is_an_error() {
        let map = vec![vec![0, 0, 0], vec![1, 1, 1], vec![0, 0, 0]];
        let gw = GridWorld::from_map(map).unwrap();
        let mut planner = DeterministicPlanner::new(gw, goal(2, 2), SearchStrategy::Bfs);
        let result = planner.plan_from_state(&GridState::new(0, 0));
        assert!(matches!(result, Err(RlError::PlanNotFound(_))));
    }

    #[test]
    fn goal_state_needs_no_plan() {
        let gw = GridWorld::empty(2, 2);
        let mut planner = DeterministicPlanner::new(gw, goal(1, 1), SearchStrategy::Bfs);
        assert!(planner.plan_from_state(&GridState::new(1, 1)).unwrap().is_empty());
    }
}
