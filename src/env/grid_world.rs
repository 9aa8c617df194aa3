use std::fmt::Write;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::env::{RewardFunction, StateCondition, UniformCostRf};
use crate::error::{Result, RlError};
use crate::model::{Model, Transition};
use crate::value_function::QProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridState {
    pub x: usize,
    pub y: usize,
}

impl GridState {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridAction {
    North,
    South,
    East,
    West,
}

impl GridAction {
    pub const ALL: [GridAction; 4] = [
        GridAction::North,
        GridAction::South,
        GridAction::East,
        GridAction::West,
    ];

    pub const LABELS: [&'static str; 4] = ["north", "south", "east", "west"];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        Self::LABELS[self.index()]
    }

    fn delta(&self) -> (i64, i64) {
        match self {
            GridAction::North => (0, 1),
            GridAction::South => (0, -1),
            GridAction::East => (1, 0),
            GridAction::West => (-1, 0),
        }
    }

    fn arrow(&self) -> char {
        match self {
            GridAction::North => '^',
            GridAction::South => 'v',
            GridAction::East => '>',
            GridAction::West => '<',
        }
    }
}

impl From<usize> for GridAction {
    fn from(value: usize) -> Self {
        Self::ALL[value % 4]
    }
}

impl From<GridAction> for usize {
    fn from(value: GridAction) -> Self {
        value.index()
    }
}

/// A typed cell of the map; the type indexes location features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub x: usize,
    pub y: usize,
    pub kind: usize,
}

impl Location {
    pub fn new(x: usize, y: usize, kind: usize) -> Self {
        Self { x, y, kind }
    }
}

/// Grid navigation domain. `map[x][y] == 1` marks a wall and `y` grows north.
#[derive(Clone)]
pub struct GridWorld {
    width: usize,
    height: usize,
    map: Vec<Vec<u8>>,
    success_probability: f64,
    locations: Vec<Location>,
    rf: Rc<dyn RewardFunction<GridState, GridAction>>,
    tf: Rc<dyn StateCondition<GridState>>,
}

impl GridWorld {
    // ordered so first dimension is x
    pub const FOUR_ROOMS: [[u8; 11]; 11] = [
        [0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0],
        [1, 0, 1, 1, 1, 1, 1, 1, 0, 1, 1],
        [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
    ];

    /// Open map of `width` x `height` cells, deterministic moves, -1 per step
    /// and no terminal states.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            map: vec![vec![0; height]; width],
            success_probability: 1.0,
            locations: vec![],
            rf: Rc::new(UniformCostRf),
            tf: Rc::new(|_: &GridState| false),
        }
    }

    pub fn four_rooms() -> Self {
        let mut gw = Self::empty(11, 11);
        gw.map = Self::FOUR_ROOMS.iter().map(|col| col.to_vec()).collect();
        gw
    }

    pub fn from_map(map: Vec<Vec<u8>>) -> Result<Self> {
        let width = map.len();
        let height = map.first().map(|col| col.len()).unwrap_or(0);
        if width == 0 || height == 0 || map.iter().any(|col| col.len() != height) {
            return Err(RlError::InvalidParameter(
                "grid map must be a non-empty rectangle".to_string(),
            ));
        }
        let mut gw = Self::empty(width, height);
        gw.map = map;
        Ok(gw)
    }

    /// Intended direction succeeds with `p`, every other one with `(1 - p) / 3`.
    pub fn with_success_probability(mut self, p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(RlError::InvalidParameter(format!(
                "success probability {} outside [0, 1]",
                p
            )));
        }
        self.success_probability = p;
        Ok(self)
    }

    pub fn with_reward_function(mut self, rf: Rc<dyn RewardFunction<GridState, GridAction>>) -> Self {
        self.rf = rf;
        self
    }

    pub fn with_terminal_function(mut self, tf: Rc<dyn StateCondition<GridState>>) -> Self {
        self.tf = tf;
        self
    }

    /// Terminates once the agent stands on `(x, y)`.
    pub fn with_goal(self, x: usize, y: usize) -> Self {
        self.with_terminal_function(Rc::new(Self::at_cell(x, y)))
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    pub fn at_cell(x: usize, y: usize) -> impl Fn(&GridState) -> bool + Clone {
        move |s: &GridState| s.x == x && s.y == y
    }

    /// Manhattan distance to `(x, y)`, admissible under uniform unit costs.
    pub fn manhattan_to(x: usize, y: usize) -> impl Fn(&GridState) -> f64 + Clone {
        move |s: &GridState| (s.x.abs_diff(x) + s.y.abs_diff(y)) as f64
    }

    /// True when the agent stands on any typed location of this map.
    pub fn at_any_location(&self) -> impl Fn(&GridState) -> bool + Clone {
        let locations = self.locations.clone();
        move |s: &GridState| locations.iter().any(|l| l.x == s.x && l.y == s.y)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location_kind(&self, x: usize, y: usize) -> Option<usize> {
        self.locations
            .iter()
            .find(|l| l.x == x && l.y == y)
            .map(|l| l.kind)
    }

    pub fn is_wall(&self, x: usize, y: usize) -> bool {
        self.map[x][y] == 1
    }

    /// Every open cell, column by column.
    pub fn open_cells(&self) -> Vec<GridState> {
        let mut cells = vec![];
        for x in 0..self.width {
            for y in 0..self.height {
                if !self.is_wall(x, y) {
                    cells.push(GridState::new(x, y));
                }
            }
        }
        cells
    }

    fn move_result(&self, s: &GridState, direction: GridAction) -> GridState {
        let (dx, dy) = direction.delta();
        let nx = s.x as i64 + dx;
        let ny = s.y as i64 + dy;
        if nx < 0
            || ny < 0
            || nx >= self.width as i64
            || ny >= self.height as i64
            || self.is_wall(nx as usize, ny as usize)
        {
            *s
        } else {
            GridState::new(nx as usize, ny as usize)
        }
    }

    fn direction_probability(&self, intended: GridAction, actual: GridAction) -> f64 {
        if intended == actual {
            self.success_probability
        } else {
            (1.0 - self.success_probability) / 3.0
        }
    }

    /// Values and greedy arrows of `provider` for every open cell, north row first.
    pub fn render_value_function<P: QProvider<GridState, GridAction>>(&self, provider: &P) -> String {
        let mut out = String::new();
        for y in (0..self.height).rev() {
            let mut values = String::new();
            let mut arrows = String::new();
            for x in 0..self.width {
                if self.is_wall(x, y) {
                    values.push_str("   #### ");
                    arrows.push_str("    #   ");
                    continue;
                }
                let s = GridState::new(x, y);
                let _ = write!(values, "{:7.2} ", provider.value(&s));
                let glyph = if self.is_terminal(&s) {
                    '*'
                } else {
                    provider.greedy_action(&s).map(|a| a.arrow()).unwrap_or('?')
                };
                let _ = write!(arrows, "    {}   ", glyph);
            }
            out.push_str(values.trim_end());
            out.push('\n');
            out.push_str(arrows.trim_end());
            out.push('\n');
        }
        out
    }
}

impl Model for GridWorld {
    type State = GridState;
    type Action = GridAction;

    fn actions(&self, _s: &GridState) -> Vec<GridAction> {
        GridAction::ALL.to_vec()
    }

    fn transitions(&self, s: &GridState, a: &GridAction) -> Vec<Transition<GridState>> {
        let mut outcomes: Vec<Transition<GridState>> = Vec::with_capacity(4);
        for direction in GridAction::ALL {
            let p = self.direction_probability(*a, direction);
            if p <= 0.0 {
                continue;
            }
            let next = self.move_result(s, direction);
            // directions that lead to the same cell are aggregated
            match outcomes.iter_mut().find(|t| t.next_state == next) {
                Some(t) => t.probability += p,
                None => outcomes.push(Transition::new(
                    p,
                    next,
                    self.rf.reward(s, a, &next),
                    self.tf.satisfies(&next),
                )),
            }
        }
        outcomes
    }

    fn is_terminal(&self, s: &GridState) -> bool {
        self.tf.satisfies(s)
    }

    fn render(&self, s: &GridState) -> String {
        let mut rows: Vec<String> = Vec::with_capacity(self.height);
        for y in (0..self.height).rev() {
            let row: String = (0..self.width)
                .map(|x| {
                    if s.x == x && s.y == y {
                        '@'
                    } else if self.is_wall(x, y) {
                        '#'
                    } else if let Some(kind) = self.location_kind(x, y) {
                        char::from_digit((kind % 10) as u32, 10).unwrap_or('L')
                    } else {
                        '.'
                    }
                })
                .collect();
            rows.push(row);
        }
        rows.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_rooms_has_the_four_doorways() {
        let gw = GridWorld::four_rooms();
        for (x, y) in [(1, 5), (5, 1), (5, 8), (8, 4)] {
            assert!(!gw.is_wall(x, y), "({}, {}) should be open", x, y);
        }
        assert!(gw.is_wall(5, 0));
        assert!(gw.is_wall(0, 5));
        assert!(gw.is_wall(6, 4));
    }

    #[test]
    fn blocked_outcomes_are_aggregated() {
        let gw = GridWorld::four_rooms().with_success_probability(0.8).unwrap();
        let transitions = gw.transitions(&GridState::new(0, 0), &GridAction::North);
        // south and west bump into the border
        assert_eq!(transitions.len(), 3);
        let stay = transitions
            .iter()
            .find(|t| t.next_state == GridState::new(0, 0))
            .unwrap();
        assert!((stay.probability - 0.4 / 3.0).abs() < 1e-12);
        let total: f64 = transitions.iter().map(|t| t.probability).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn deterministic_moves_stop_at_walls() {
        let gw = GridWorld::four_rooms();
        let t = gw.transitions(&GridState::new(4, 0), &GridAction::East);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].next_state, GridState::new(4, 0));
        assert_eq!(t[0].reward, -1.0);
    }

    #[test]
    fn reaching_the_goal_terminates() {
        let gw = GridWorld::four_rooms().with_goal(10, 10);
        let t = gw.transitions(&GridState::new(10, 9), &GridAction::North);
        assert!(t[0].terminated);
        assert!(gw.is_terminal(&GridState::new(10, 10)));
    }

    #[test]
    fn typed_locations_can_end_the_episode() {
        let gw = GridWorld::empty(4, 1)
            .with_locations(vec![Location::new(3, 0, 0), Location::new(1, 0, 2)]);
        let tf = gw.at_any_location();
        let gw = gw.with_terminal_function(Rc::new(tf));
        assert!(!gw.is_terminal(&GridState::new(0, 0)));
        assert!(gw.is_terminal(&GridState::new(1, 0)));
        assert!(gw.is_terminal(&GridState::new(3, 0)));
        let t = gw.transitions(&GridState::new(0, 0), &GridAction::East);
        assert_eq!(t.len(), 1);
        assert!(t[0].terminated);
        assert!(!gw.transitions(&GridState::new(2, 0), &GridAction::North)[0].terminated);
    }

    #[test]
    fn render_marks_agent_walls_and_locations() {
        let gw = GridWorld::empty(3, 2).with_locations(vec![Location::new(2, 1, 4)]);
        assert_eq!(gw.render(&GridState::new(0, 0)), "..4\n@..");
    }
}
