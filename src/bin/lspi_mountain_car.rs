use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rl_tutorials::agent::{collect_random_samples, Lspi};
use rl_tutorials::env::{Env, MountainCarAction, MountainCarEnv, MountainCarObservation};
use rl_tutorials::episode::rollout_env;
use rl_tutorials::features::{FourierBasis, RbfFeatures, StateFeatures};
use rl_tutorials::policy::GreedyQPolicy;
use rl_tutorials::utils::init_logging;
use rl_tutorials::{Result, RlError};

extern crate structopt;

use structopt::StructOpt;

/// Solve the mountain car with least-squares policy iteration over random samples
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - LSPI Mountain Car")]
struct Cli {
    /// State features of the linear Q-function
    #[structopt(long = "basis", default_value = "fourier", possible_values = &["fourier", "rbf"])]
    basis: String,

    /// Order of the Fourier basis
    #[structopt(long = "order", default_value = "4")]
    order: usize,

    /// Number of SARS samples collected under the random policy
    #[structopt(long = "n_samples", default_value = "5000")]
    n_samples: usize,

    /// Length of every sample collection episode
    #[structopt(long = "episode_length", default_value = "20")]
    episode_length: usize,

    /// Discount factor of the LSTDQ solution
    #[structopt(long = "discount_factor", default_value = "0.99")]
    discount_factor: f64,

    /// Maximum number of policy iterations
    #[structopt(long = "max_iterations", default_value = "30")]
    max_iterations: usize,

    /// Weight change under which policy iteration stops
    #[structopt(long = "max_change", default_value = "1e-6")]
    max_change: f64,

    /// Maximum number of steps of the greedy episode
    #[structopt(long = "max_steps", default_value = "500")]
    max_steps: u128,

    /// Seed of the sample collection
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Print every state of the greedy episode
    #[structopt(long = "show_example")]
    show_example: bool,

    /// Log every policy iteration
    #[structopt(short, long)]
    verbose: bool,
}

fn basis(cli: &Cli) -> Result<Box<dyn StateFeatures<MountainCarObservation>>> {
    let lower = [MountainCarEnv::MIN_POSITION, -MountainCarEnv::MAX_SPEED];
    let upper = [MountainCarEnv::MAX_POSITION, MountainCarEnv::MAX_SPEED];
    match cli.basis.as_str() {
        "fourier" => Ok(Box::new(FourierBasis::new(
            &lower,
            &upper,
            cli.order,
            MountainCarObservation::as_vec,
        )?)),
        "rbf" => Ok(Box::new(RbfFeatures::grid(
            &lower,
            &upper,
            5,
            0.2,
            MountainCarObservation::as_vec,
        )?)),
        other => Err(RlError::InvalidParameter(format!("unknown basis {}", other))),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut collector = MountainCarEnv::anywhere(cli.max_steps, cli.seed);
    let samples = collect_random_samples(
        &mut collector,
        &MountainCarAction::ALL,
        cli.n_samples,
        cli.episode_length,
        &mut rng,
    )?;
    tracing::info!(samples = samples.len(), "random samples collected");

    let mut lspi = Lspi::new(MountainCarAction::ALL.to_vec(), basis(cli)?, cli.discount_factor)
        .with_stopping(cli.max_iterations, cli.max_change);
    let now: Instant = Instant::now();
    let iterations = lspi.run_policy_iteration(&samples)?;
    println!("LSPI ({}) {} iterations in {:.2?}", cli.basis, iterations, now.elapsed());

    let mut env = MountainCarEnv::in_valley(cli.max_steps, cli.seed);
    let mut policy = GreedyQPolicy::new(&lspi);
    let episode = rollout_env(&mut env, &mut policy, cli.max_steps as usize)?;
    if cli.show_example {
        for (s, a) in episode.states.iter().zip(&episode.actions) {
            println!("{:?} {:?}", s, a);
        }
    }
    println!("{}", env.render());
    if env.is_terminal() {
        println!("greedy episode reached the goal in {} steps", episode.max_time_step());
    } else {
        println!("greedy episode stopped after {} steps", episode.max_time_step());
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
