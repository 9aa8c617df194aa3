use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::model::Model;

/// Every state forward-reachable from `seed`, in discovery order.
/// Terminal states are included but not expanded.
pub fn reachable_states<M: Model>(model: &M, seed: &M::State) -> IndexSet<M::State> {
    let mut visited: IndexSet<M::State> = IndexSet::new();
    let mut open: VecDeque<M::State> = VecDeque::new();
    visited.insert(seed.clone());
    open.push_back(seed.clone());

    while let Some(s) = open.pop_front() {
        if model.is_terminal(&s) {
            continue;
        }
        for a in model.actions(&s) {
            for t in model.transitions(&s, &a) {
                if t.probability > 0.0 && visited.insert(t.next_state.clone()) {
                    open.push_back(t.next_state);
                }
            }
        }
    }
    tracing::debug!(states = visited.len(), "reachability done");
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{GridState, GridWorld};

    #[test]
    fn four_rooms_reaches_every_open_cell() {
        let gw = GridWorld::four_rooms();
        let states = reachable_states(&gw, &GridState::new(0, 0));
        assert_eq!(states.len(), gw.open_cells().len());
        assert_eq!(states.get_index(0), Some(&GridState::new(0, 0)));
    }

    #[test]
    fn terminal_states_are_not_expanded() {
        // the goal cuts the corridor in two
        let gw = GridWorld::empty(5, 1).with_goal(2, 0);
        let states = reachable_states(&gw, &GridState::new(0, 0));
        assert_eq!(states.len(), 3);
        assert!(!states.contains(&GridState::new(3, 0)));
    }
}
