use crate::error::{Result, RlError};
use crate::model::Model;
use crate::planning::DeterministicPlanner;
use crate::policy::Policy;

/// Answers from the planner's cache and replans from states it has not seen.
pub struct DynamicPlannerPolicy<M: Model> {
    planner: DeterministicPlanner<M>,
}

impl<M: Model> DynamicPlannerPolicy<M> {
    pub fn new(planner: DeterministicPlanner<M>) -> Self {
        Self { planner }
    }

    pub fn planner(&self) -> &DeterministicPlanner<M> {
        &self.planner
    }
}

impl<M: Model> Policy<M::State, M::Action> for DynamicPlannerPolicy<M> {
    fn action(&mut self, s: &M::State) -> Result<M::Action> {
        if let Some(a) = self.planner.cached_action(s) {
            return Ok(a.clone());
        }
        self.planner.plan_from_state(s)?;
        self.planner
            .cached_action(s)
            .cloned()
            .ok_or_else(|| RlError::NoApplicableActions(format!("{:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::env::{GridAction, GridState, GridWorld};
    use crate::planning::SearchStrategy;

    #[test]
    fn replans_lazily_from_unseen_states() {
        let gw = GridWorld::empty(3, 3);
        let planner = DeterministicPlanner::new(gw, Rc::new(GridWorld::at_cell(2, 0)), SearchStrategy::Bfs);
        let mut policy = DynamicPlannerPolicy::new(planner);
        assert_eq!(policy.action(&GridState::new(1, 0)).unwrap(), GridAction::East);
        assert!(policy.planner().cached_action(&GridState::new(0, 2)).is_none());
        assert!(policy.action(&GridState::new(0, 2)).is_ok());
        assert!(policy.planner().cached_action(&GridState::new(0, 2)).is_some());
        assert!(policy.action(&GridState::new(2, 0)).is_err());
    }
}
