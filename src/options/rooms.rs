use std::rc::Rc;

use crate::env::{GridAction, GridState, GridWorld};
use crate::options::SubgoalOption;
use crate::planning::{DeterministicPlanner, SearchStrategy};
use crate::policy::DynamicPlannerPolicy;

/// Inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Room {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl Room {
    pub const SOUTH_WEST: Room = Room::new(0, 0, 4, 4);
    pub const SOUTH_EAST: Room = Room::new(6, 0, 10, 3);
    pub const NORTH_EAST: Room = Room::new(6, 5, 10, 10);
    pub const NORTH_WEST: Room = Room::new(0, 6, 4, 10);

    pub const fn new(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn contains(&self, s: &GridState) -> bool {
        s.x >= self.min_x && s.x <= self.max_x && s.y >= self.min_y && s.y <= self.max_y
    }
}

/// Option that takes the agent from anywhere in `room` to the doorway
/// `door`, planning its moves lazily with BFS.
pub fn room_option(
    name: &str,
    domain: &GridWorld,
    door: (usize, usize),
    room: Room,
) -> SubgoalOption<GridState, GridAction> {
    let planning_domain = domain
        .clone()
        .with_terminal_function(Rc::new(|_: &GridState| false));
    let planner = DeterministicPlanner::new(
        planning_domain,
        Rc::new(GridWorld::at_cell(door.0, door.1)),
        SearchStrategy::Bfs,
    );
    SubgoalOption::new(
        name,
        Rc::new(move |s: &GridState| room.contains(s)),
        Rc::new(move |s: &GridState| !room.contains(s)),
        Box::new(DynamicPlannerPolicy::new(planner)),
    )
}

/// The eight doorway options of the four rooms map, two per room.
pub fn four_rooms_options(domain: &GridWorld) -> Vec<SubgoalOption<GridState, GridAction>> {
    vec![
        room_option("swToNorth", domain, (1, 5), Room::SOUTH_WEST),
        room_option("swToEast", domain, (5, 1), Room::SOUTH_WEST),
        room_option("seToWest", domain, (5, 1), Room::SOUTH_EAST),
        room_option("seToNorth", domain, (8, 4), Room::SOUTH_EAST),
        room_option("neToSouth", domain, (8, 4), Room::NORTH_EAST),
        room_option("neToWest", domain, (5, 8), Room::NORTH_EAST),
        room_option("nwToEast", domain, (5, 8), Room::NORTH_WEST),
        room_option("nwToSouth", domain, (1, 5), Room::NORTH_WEST),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, SimulatedEnv};

    #[test]
    fn doors_lie_outside_every_room() {
        let rooms = [Room::SOUTH_WEST, Room::SOUTH_EAST, Room::NORTH_EAST, Room::NORTH_WEST];
        for (x, y) in [(1, 5), (5, 1), (5, 8), (8, 4)] {
            assert!(rooms.iter().all(|r| !r.contains(&GridState::new(x, y))));
        }
    }

    #[test]
    fn every_option_stops_at_its_doorway() {
        let gw = GridWorld::four_rooms();
        let starts = [(0, 0), (0, 0), (10, 0), (10, 0), (10, 10), (10, 10), (0, 10), (0, 10)];
        let doors = [(1, 5), (5, 1), (5, 1), (8, 4), (8, 4), (5, 8), (5, 8), (1, 5)];
        for ((mut option, start), door) in four_rooms_options(&gw).into_iter().zip(starts).zip(doors) {
            let start = GridState::new(start.0, start.1);
            let mut env = SimulatedEnv::new(gw.clone(), start, 0);
            env.reset();
            assert!(option.can_initiate(&start), "{}", option.name());
            let outcome = option.control(&mut env, 0.99).unwrap();
            assert_eq!(outcome.state, GridState::new(door.0, door.1), "{}", option.name());
            assert_eq!(outcome.steps, outcome.episode.max_time_step());
            assert!(option.terminates_in(&outcome.state));
            assert!(!outcome.terminated);
        }
    }
}
