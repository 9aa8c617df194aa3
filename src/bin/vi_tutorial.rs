use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use rl_tutorials::env::{GoalBasedRf, GridState, GridWorld};
use rl_tutorials::episode::rollout_model;
use rl_tutorials::model::Model;
use rl_tutorials::planning::ValueIteration;
use rl_tutorials::utils::init_logging;
use rl_tutorials::value_function::ConstantValue;
use rl_tutorials::Result;

extern crate structopt;

use structopt::StructOpt;

/// Plan with value iteration on the noisy four rooms grid and roll out the greedy policy
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Value Iteration Tutorial")]
struct Cli {
    /// Probability that a move goes in the intended direction
    #[structopt(long = "success_probability", default_value = "0.8")]
    success_probability: f64,

    /// Discount factor of the Bellman backup
    #[structopt(long = "discount_factor", default_value = "0.99")]
    discount_factor: f64,

    /// Number of sweeps over the reachable states
    #[structopt(long = "n_iterations", default_value = "30")]
    n_iterations: usize,

    /// Reward for reaching the goal; every move costs -1 when not set
    #[structopt(long = "goal_reward")]
    goal_reward: Option<f64>,

    /// Maximum number of steps of the rollout
    #[structopt(long = "max_steps", default_value = "200")]
    max_steps: usize,

    /// Seed of the rollout dynamics
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Write the rollout as a JSON episode to this file
    #[structopt(long = "output", parse(from_os_str))]
    output: Option<PathBuf>,

    /// Log every sweep
    #[structopt(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let mut domain = GridWorld::four_rooms().with_goal(10, 10);
    if let Some(goal_reward) = cli.goal_reward {
        domain = domain.with_reward_function(Rc::new(GoalBasedRf::new(
            Rc::new(GridWorld::at_cell(10, 10)),
            goal_reward,
            -1.0,
        )));
    }
    let domain = domain.with_success_probability(cli.success_probability)?;
    let initial_state = GridState::new(0, 0);

    let mut vi = ValueIteration::new(
        domain.clone(),
        cli.discount_factor,
        Rc::new(ConstantValue(0.0)),
        cli.n_iterations,
    );
    let now: Instant = Instant::now();
    vi.plan_from_state(&initial_state);
    println!("planned over {} states in {:.2?}", vi.n_states(), now.elapsed());
    println!("{}", domain.render_value_function(&vi));

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut policy = vi.greedy_policy();
    let episode = rollout_model(&domain, &mut policy, initial_state, cli.max_steps, &mut rng)?;
    for (t, s) in episode.states.iter().enumerate() {
        println!("t = {}", t);
        println!("{}", domain.render(s));
    }
    println!(
        "rollout: {} steps, return {:.2}",
        episode.max_time_step(),
        episode.total_reward()
    );

    if let Some(path) = &cli.output {
        episode.write(path)?;
        tracing::info!(path = %path.display(), "episode written");
    }
    Ok(())
}

fn main() {
    let cli: Cli = Cli::from_args();
    init_logging(cli.verbose);
    if let Err(e) = run(&cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
