use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use rl_tutorials::action_selection::EpsilonGreedy;
use rl_tutorials::agent::{LearningAgent, QLearning};
use rl_tutorials::env::{GridAction, GridState, GridWorld, SimulatedEnv};
use rl_tutorials::utils::{init_logging, moving_average, plot_moving_average};
use rl_tutorials::value_function::ConstantValue;
use rl_tutorials::Result;

extern crate structopt;

use structopt::StructOpt;

/// Learn the noisy four rooms grid with epsilon-greedy Q-learning
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Q-Learning Tutorial")]
struct Cli {
    /// Number of episodes for the training
    #[structopt(long = "n_episodes", short = "n", default_value = "1000")]
    n_episodes: usize,

    /// Maximum number of steps per episode
    #[structopt(long = "max_steps", default_value = "10000")]
    max_steps: usize,

    /// Probability that a move goes in the intended direction
    #[structopt(long = "success_probability", default_value = "0.8")]
    success_probability: f64,

    /// Learning rate of the RL agent
    #[structopt(long = "learning_rate", default_value = "0.1")]
    learning_rate: f64,

    /// Exploration ratio
    #[structopt(long = "epsilon", default_value = "0.1")]
    epsilon: f64,

    /// Discount factor to be used on the temporal difference calculation
    #[structopt(long = "discount_factor", default_value = "0.99")]
    discount_factor: f64,

    /// Initial Q-value of every state-action pair
    #[structopt(long = "q_init", default_value = "0.0")]
    q_init: f64,

    /// Moving average window to be used on the visualization of results
    #[structopt(long = "moving_average_window", default_value = "10")]
    moving_average_window: usize,

    /// Seed of the environment and of the exploration
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Plot the episode lengths to this PNG file
    #[structopt(long = "plot", parse(from_os_str))]
    plot: Option<PathBuf>,

    /// Log every episode
    #[structopt(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let domain = GridWorld::four_rooms()
        .with_goal(10, 10)
        .with_success_probability(cli.success_probability)?;
    let mut env = SimulatedEnv::new(domain.clone(), GridState::new(0, 0), cli.seed);

    let mut agent: QLearning<GridState, GridAction> = QLearning::new(
        GridAction::ALL.to_vec(),
        cli.discount_factor,
        Rc::new(ConstantValue(cli.q_init)),
        cli.learning_rate,
        EpsilonGreedy::new(cli.epsilon, cli.seed).into(),
    );

    let now: Instant = Instant::now();
    let (_rewards, lengths) = agent.train(&mut env, cli.n_episodes, Some(cli.max_steps))?;
    println!("Q-Learning {:.2?}", now.elapsed());

    let lengths: Vec<f64> = lengths.iter().map(|l| *l as f64).collect();
    let tail = lengths.len().saturating_sub(10);
    for (i, l) in lengths.iter().enumerate().skip(tail) {
        println!("{}: {}", i, l);
    }
    println!("{} states visited", agent.n_states());
    println!("{}", domain.render_value_function(&agent));

    if let Some(path) = &cli.plot {
        let ma_length = moving_average(cli.moving_average_window, &lengths);
        plot_moving_average(&[ma_length], &["Q-Learning"], "Episodes Length", path)?;
        tracing::info!(path = %path.display(), "plot written");
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
