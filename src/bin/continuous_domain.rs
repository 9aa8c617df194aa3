use std::path::PathBuf;
use std::time::Instant;

use rl_tutorials::action_selection::EpsilonGreedy;
use rl_tutorials::agent::{GradientSarsaLambda, LearningAgent};
use rl_tutorials::env::{Env, MountainCarAction, MountainCarEnv, MountainCarObservation};
use rl_tutorials::episode::rollout_env;
use rl_tutorials::features::{TileCoding, TilingArrangement};
use rl_tutorials::policy::Policy;
use rl_tutorials::utils::{argmax, init_logging, moving_average, plot_moving_average};
use rl_tutorials::Result;

extern crate structopt;

use structopt::StructOpt;

/// Learn to drive the mountain car with gradient-descent SARSA(lambda) over tile-coded features
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Mountain Car")]
struct Cli {
    /// Show a greedy episode after the training
    #[structopt(long = "show_example")]
    show_example: bool,

    /// Number of episodes for the training
    #[structopt(long = "n_episodes", short = "n", default_value = "500")]
    n_episodes: usize,

    /// Maximum number of steps per episode
    #[structopt(long = "max_steps", default_value = "5000")]
    max_steps: u128,

    /// Number of overlapping tilings
    #[structopt(long = "n_tilings", default_value = "5")]
    n_tilings: usize,

    /// Tiles per dimension in every tiling
    #[structopt(long = "resolution", default_value = "10")]
    resolution: usize,

    /// Initial Q-value of every state-action pair
    #[structopt(long = "default_q", default_value = "0.5")]
    default_q: f64,

    /// Learning rate of the RL agent
    #[structopt(long = "learning_rate", default_value = "0.02")]
    learning_rate: f64,

    /// Exploration ratio
    #[structopt(long = "epsilon", default_value = "0.1")]
    epsilon: f64,

    /// Discount factor to be used on the temporal difference calculation
    #[structopt(long = "discount_factor", default_value = "0.99")]
    discount_factor: f64,

    /// Lambda factor to be used on the eligibility traces
    #[structopt(long = "lambda_factor", default_value = "0.5")]
    lambda_factor: f64,

    /// Moving average window to be used on the visualization of results
    #[structopt(long = "moving_average_window", default_value = "10")]
    moving_average_window: usize,

    /// Seed of the environment, the tilings and the exploration
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Plot the episode lengths to this PNG file
    #[structopt(long = "plot", parse(from_os_str))]
    plot: Option<PathBuf>,

    /// Log every episode
    #[structopt(short, long)]
    verbose: bool,
}

struct GreedyTiles<'a>(&'a GradientSarsaLambda<MountainCarObservation, MountainCarAction>);

impl<'a> Policy<MountainCarObservation, MountainCarAction> for GreedyTiles<'a> {
    fn action(&mut self, s: &MountainCarObservation) -> Result<MountainCarAction> {
        Ok(MountainCarAction::ALL[argmax(self.0.q_values(s))])
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut env = MountainCarEnv::new(cli.max_steps, cli.seed);
    let tiles = TileCoding::new(
        &[MountainCarEnv::MIN_POSITION, -MountainCarEnv::MAX_SPEED],
        &[MountainCarEnv::MAX_POSITION, MountainCarEnv::MAX_SPEED],
        cli.resolution,
        cli.n_tilings,
        TilingArrangement::RandomJitter,
        cli.seed,
    )?;
    let mut agent = GradientSarsaLambda::new(
        MountainCarAction::ALL.to_vec(),
        MountainCarObservation::as_vec,
        tiles,
        cli.default_q,
        cli.discount_factor,
        cli.learning_rate,
        cli.lambda_factor,
        EpsilonGreedy::new(cli.epsilon, cli.seed).into(),
    );

    let now: Instant = Instant::now();
    let (rewards, lengths) = agent.train(&mut env, cli.n_episodes, None)?;
    println!("Gradient SARSA(lambda) {:.2?}", now.elapsed());
    let tail = lengths.len().saturating_sub(10);
    for (i, (l, r)) in lengths.iter().zip(&rewards).enumerate().skip(tail) {
        println!("{}: {} steps, reward {}", i, l, r);
    }

    if let Some(path) = &cli.plot {
        let lengths: Vec<f64> = lengths.iter().map(|l| *l as f64).collect();
        let ma_length = moving_average(cli.moving_average_window, &lengths);
        plot_moving_average(&[ma_length], &["Gradient SARSA(lambda)"], "Episodes Length", path)?;
        tracing::info!(path = %path.display(), "plot written");
    }

    if cli.show_example {
        let mut policy = GreedyTiles(&agent);
        let episode = rollout_env(&mut env, &mut policy, cli.max_steps as usize)?;
        for (s, a) in episode.states.iter().zip(&episode.actions) {
            println!("{:?} {:?}", s, a);
        }
        println!("{}", env.render());
        println!("greedy episode: {} steps", episode.max_time_step());
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
