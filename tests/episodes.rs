use std::fs;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use rl_tutorials::env::{
    GridAction, GridState, GridWorld, MountainCarAction, MountainCarEnv, MountainCarObservation,
};
use rl_tutorials::episode::{read_episodes, rollout_env, rollout_model, write_episodes, Episode};
use rl_tutorials::planning::{DeterministicPlanner, SearchStrategy};
use rl_tutorials::policy::{DynamicPlannerPolicy, Policy};
use rl_tutorials::{Result, RlError};

#[test]
fn planner_rollouts_round_trip_through_json() {
    let gw = GridWorld::four_rooms().with_goal(10, 10);
    let planner = DeterministicPlanner::new(
        gw.clone(),
        Rc::new(GridWorld::at_cell(10, 10)),
        SearchStrategy::Bfs,
    );
    let mut policy = DynamicPlannerPolicy::new(planner);
    let mut rng = StdRng::seed_from_u64(0);
    let episode = rollout_model(&gw, &mut policy, GridState::new(0, 0), 100, &mut rng).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bfs.json");
    episode.write(&path).unwrap();
    let json = fs::read_to_string(&path).unwrap();
    assert!(json.starts_with("{\"states\":[{\"x\":0,\"y\":0}"));
    assert!(json.contains("\"actions\":[\""));

    let back: Episode<GridState, GridAction> = Episode::read(&path).unwrap();
    assert_eq!(back, episode);
    assert_eq!(back.total_reward(), -20.0);
}

#[test]
fn directories_are_read_in_name_order_and_skip_other_files() {
    let dir = tempfile::tempdir().unwrap();
    let episodes: Vec<Episode<u32, u8>> = (0..3)
        .map(|i| {
            let mut e = Episode::new(i);
            e.record(1, i as f64, i + 1);
            e
        })
        .collect();
    write_episodes(&episodes, dir.path(), "run").unwrap();
    fs::write(dir.path().join("notes.txt"), "not an episode").unwrap();

    let back: Vec<Episode<u32, u8>> = read_episodes(dir.path()).unwrap();
    assert_eq!(back, episodes);
}

#[test]
fn reading_a_missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result: Result<Vec<Episode<u32, u8>>> = read_episodes(&dir.path().join("missing"));
    assert!(matches!(result, Err(RlError::Io(_))));
}

struct AlwaysForward;

impl Policy<MountainCarObservation, MountainCarAction> for AlwaysForward {
    fn action(&mut self, _s: &MountainCarObservation) -> Result<MountainCarAction> {
        Ok(MountainCarAction::Forward)
    }
}

#[test]
fn environment_rollouts_stop_at_the_step_cap() {
    let mut env = MountainCarEnv::new(1000, 0);
    let episode = rollout_env(&mut env, &mut AlwaysForward, 30).unwrap();
    assert_eq!(episode.max_time_step(), 30);
    assert_eq!(episode.states.len(), 31);
    assert!(episode.rewards.iter().all(|r| *r == -1.0));
}
