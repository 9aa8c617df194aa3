use std::f64::consts::PI;

use rand::distributions::Uniform;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::env::Env;
use crate::error::{Result, RlError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MountainCarObservation {
    pub position: f64,
    pub velocity: f64,
}

impl MountainCarObservation {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    pub fn as_vec(&self) -> Vec<f64> {
        vec![self.position, self.velocity]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MountainCarAction {
    Backward,
    Coast,
    Forward,
}

impl MountainCarAction {
    pub const ALL: [MountainCarAction; 3] = [
        MountainCarAction::Backward,
        MountainCarAction::Coast,
        MountainCarAction::Forward,
    ];

    fn thrust(&self) -> f64 {
        match self {
            MountainCarAction::Backward => -1.0,
            MountainCarAction::Coast => 0.0,
            MountainCarAction::Forward => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MountainCarEnv {
    ready: bool,
    max_steps: u128,
    curr_step: u128,

    min_position: f64,
    max_position: f64,
    max_speed: f64,
    goal_position: f64,
    goal_velocity: f64,
    force: f64,
    gravity: f64,
    state: MountainCarObservation,

    start: StartMode,
    dist: Uniform<f64>,
    rng: StdRng,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StartMode {
    NearValley,
    At(f64),
    Anywhere,
}

impl MountainCarEnv {
    pub const MIN_POSITION: f64 = -1.2;
    pub const MAX_POSITION: f64 = 0.6;
    pub const MAX_SPEED: f64 = 0.07;

    pub fn new(max_steps: u128, seed: u64) -> Self {
        let mut env: MountainCarEnv = Self {
            ready: false,
            curr_step: 0,
            max_steps,
            min_position: Self::MIN_POSITION,
            max_position: Self::MAX_POSITION,
            max_speed: Self::MAX_SPEED,
            goal_position: 0.5,
            goal_velocity: 0.0,
            force: 0.001,
            gravity: 0.0025,
            state: MountainCarObservation::default(),
            start: StartMode::NearValley,
            dist: Uniform::from(-0.6..-0.4),
            rng: StdRng::seed_from_u64(seed),
        };
        env.state = env.initialize_car();
        env
    }

    /// Every episode starts at rest at the bottom of the valley.
    pub fn in_valley(max_steps: u128, seed: u64) -> Self {
        let mut env = Self::new(max_steps, seed);
        env.start = StartMode::At(Self::valley_position());
        env.state = env.initialize_car();
        env
    }

    /// Every episode starts from a uniformly random position and velocity,
    /// which spreads collected samples over the whole state space.
    pub fn anywhere(max_steps: u128, seed: u64) -> Self {
        let mut env = Self::new(max_steps, seed);
        env.start = StartMode::Anywhere;
        env.state = env.initialize_car();
        env
    }

    pub fn valley_position() -> f64 {
        -PI / 6.0
    }

    fn initialize_car(&mut self) -> MountainCarObservation {
        match self.start {
            StartMode::NearValley => {
                MountainCarObservation::new(self.dist.sample(&mut self.rng), 0.0)
            }
            StartMode::At(p) => MountainCarObservation::new(p, 0.0),
            StartMode::Anywhere => {
                let position = Uniform::from(self.min_position..=self.max_position);
                let velocity = Uniform::from(-self.max_speed..=self.max_speed);
                MountainCarObservation::new(
                    position.sample(&mut self.rng),
                    velocity.sample(&mut self.rng),
                )
            }
        }
    }
}

impl Default for MountainCarEnv {
    fn default() -> Self {
        Self::new(500, 42)
    }
}

impl Env<MountainCarObservation, MountainCarAction> for MountainCarEnv {
    fn reset(&mut self) -> MountainCarObservation {
        self.state = self.initialize_car();
        self.ready = true;
        self.curr_step = 0;
        self.state
    }

    fn step(&mut self, action: MountainCarAction) -> Result<(MountainCarObservation, f64, bool)> {
        if !self.ready {
            return Err(RlError::EnvNotReady);
        }
        self.curr_step += 1;

        self.state.velocity +=
            action.thrust() * self.force + (3.0 * self.state.position).cos() * (-self.gravity);
        self.state.velocity = self.state.velocity.clamp(-self.max_speed, self.max_speed);
        self.state.position += self.state.velocity;
        self.state.position = self
            .state
            .position
            .clamp(self.min_position, self.max_position);
        if self.state.position == self.min_position && self.state.velocity < 0.0 {
            self.state.velocity = 0.0
        }
        let done = self.is_terminal() || self.curr_step >= self.max_steps;
        if done {
            self.ready = false;
        }
        Ok((self.state, -1.0, done))
    }

    fn current_observation(&self) -> MountainCarObservation {
        self.state
    }

    fn is_terminal(&self) -> bool {
        self.state.position >= self.goal_position && self.state.velocity >= self.goal_velocity
    }

    fn render(&self) -> String {
        let columns = 60usize;
        let span = self.max_position - self.min_position;
        let car = (((self.state.position - self.min_position) / span) * (columns - 1) as f64)
            .round() as usize;
        let goal = (((self.goal_position - self.min_position) / span) * (columns - 1) as f64)
            .round() as usize;
        let track: String = (0..columns)
            .map(|i| {
                if i == car {
                    '@'
                } else if i == goal {
                    '|'
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "{}\nposition {:.3} velocity {:.4}",
            track, self.state.position, self.state.velocity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coasting_in_the_valley_never_reaches_the_goal() {
        let mut env = MountainCarEnv::in_valley(200, 1);
        let s = env.reset();
        assert!((s.position - MountainCarEnv::valley_position()).abs() < 1e-12);
        let mut steps = 0;
        let mut previous = s;
        loop {
            let (obs, r, done) = env.step(MountainCarAction::Coast).unwrap();
            assert_eq!(r, -1.0);
            assert_ne!(obs, previous);
            previous = obs;
            steps += 1;
            if done {
                break;
            }
        }
        // the step cap ends the episode without reaching the goal
        assert_eq!(steps, 200);
        assert!(!env.is_terminal());
        assert!(matches!(
            env.step(MountainCarAction::Coast),
            Err(RlError::EnvNotReady)
        ));
    }

    #[test]
    fn a_tiny_cap_allows_exactly_that_many_moves() {
        let mut env = MountainCarEnv::in_valley(3, 0);
        env.reset();
        let mut positions = vec![];
        for i in 0..3 {
            let (obs, _, done) = env.step(MountainCarAction::Coast).unwrap();
            assert_eq!(done, i == 2);
            positions.push(obs.position);
        }
        assert!(positions[0] != positions[2]);
        assert!(!env.is_terminal());
    }

    #[test]
    fn anywhere_starts_cover_the_state_space() {
        let mut env = MountainCarEnv::anywhere(20, 3);
        let starts: Vec<MountainCarObservation> = (0..200).map(|_| env.reset()).collect();
        assert!(starts.iter().all(|s| {
            (MountainCarEnv::MIN_POSITION..=MountainCarEnv::MAX_POSITION).contains(&s.position)
                && s.velocity.abs() <= MountainCarEnv::MAX_SPEED
        }));
        assert!(starts.iter().any(|s| s.position > 0.0));
        assert!(starts.iter().any(|s| s.velocity < 0.0));
    }

    #[test]
    fn velocity_stays_bounded() {
        let mut env = MountainCarEnv::new(1000, 9);
        env.reset();
        for _ in 0..300 {
            let (obs, _, terminated) = env.step(MountainCarAction::Forward).unwrap();
            assert!(obs.velocity.abs() <= MountainCarEnv::MAX_SPEED + 1e-12);
            assert!(obs.position >= MountainCarEnv::MIN_POSITION);
            if terminated {
                break;
            }
        }
    }
}
