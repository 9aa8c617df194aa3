mod differentiable_vi;
mod linear_reward;
mod mlirl;

use std::rc::Rc;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use differentiable_vi::{DifferentiableValueIteration, QGradient};
pub use linear_reward::LinearStateRewardFunction;
pub use mlirl::Mlirl;

use crate::env::{GridAction, GridState, GridWorld, Location};
use crate::episode::{rollout_model, Episode};
use crate::error::Result;
use crate::features::{LocationFeatures, StateFeatures};
use crate::planning::ValueIteration;
use crate::value_function::ConstantValue;

/// Number of location types of the IRL grid.
pub const N_LOCATION_TYPES: usize = 5;

/// 5x5 open grid with one corner of each type 1..4 and five type 0 cells.
pub fn irl_grid() -> GridWorld {
    GridWorld::empty(5, 5).with_locations(vec![
        Location::new(0, 0, 1),
        Location::new(0, 4, 2),
        Location::new(4, 4, 3),
        Location::new(4, 0, 4),
        Location::new(1, 0, 0),
        Location::new(1, 2, 0),
        Location::new(1, 4, 0),
        Location::new(3, 1, 0),
        Location::new(3, 3, 0),
    ])
}

pub fn irl_features(domain: &GridWorld) -> Rc<dyn StateFeatures<GridState>> {
    Rc::new(LocationFeatures::new(domain.locations(), N_LOCATION_TYPES))
}

/// Random cell of the leftmost column.
pub fn left_side_state(height: usize, rng: &mut StdRng) -> GridState {
    GridState::new(0, rng.gen_range(0..height))
}

/// Rollouts of the greedy policy of an expert that plans with the linear
/// reward `parameters`, starting from random cells of the left side.
pub fn expert_demonstrations(
    domain: &GridWorld,
    parameters: Array1<f64>,
    n_episodes: usize,
    episode_length: usize,
    seed: u64,
) -> Result<Vec<Episode<GridState, GridAction>>> {
    let rf = LinearStateRewardFunction::new(irl_features(domain), parameters)?;
    let expert_domain = domain.clone().with_reward_function(Rc::new(rf));
    let mut vi = ValueIteration::new(
        expert_domain.clone(),
        0.99,
        Rc::new(ConstantValue(0.0)),
        1000,
    )
    .with_max_delta(1e-4);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut episodes = Vec::with_capacity(n_episodes);
    for _ in 0..n_episodes {
        let start = left_side_state(domain.height(), &mut rng);
        vi.plan_from_state(&start);
        let mut policy = vi.greedy_policy();
        episodes.push(rollout_model(
            &expert_domain,
            &mut policy,
            start,
            episode_length,
            &mut rng,
        )?);
    }
    Ok(episodes)
}
