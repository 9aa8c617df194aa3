mod grid_game;
mod grid_world;
mod inverted_pendulum;
mod mountain_car;
mod reward;
mod simulated;

use rand::rngs::StdRng;

use crate::error::Result;

pub use grid_game::{Goal, GoalKind, GridGame, GridGameAction, GridGameState};
pub use grid_world::{GridAction, GridState, GridWorld, Location};
pub use inverted_pendulum::{InvertedPendulum, InvertedPendulumAction, InvertedPendulumState};
pub use mountain_car::{MountainCarAction, MountainCarEnv, MountainCarObservation};
pub use reward::{GoalBasedRf, RewardFunction, StateCondition, UniformCostRf};
pub use simulated::SimulatedEnv;

/// Produces the initial state of every episode.
pub type StateGenerator<S> = Box<dyn FnMut(&mut StdRng) -> S>;

pub trait Env<T, A> {
    fn reset(&mut self) -> T;

    /// Applies `action` and returns the observation, the reward and whether
    /// the episode is over. An episode cut off by a step cap is over without
    /// being terminal; [`Env::is_terminal`] tells the two apart.
    fn step(&mut self, action: A) -> Result<(T, f64, bool)>;

    fn current_observation(&self) -> T;

    fn is_terminal(&self) -> bool;

    fn render(&self) -> String;
}
