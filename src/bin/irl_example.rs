use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use ndarray::Array1;
use rand::rngs::StdRng;

use rl_tutorials::env::{GridAction, GridState, GridWorld, SimulatedEnv};
use rl_tutorials::episode::{read_episodes, write_episodes, Episode};
use rl_tutorials::explorer::explore;
use rl_tutorials::irl::{
    expert_demonstrations, irl_features, irl_grid, left_side_state, DifferentiableValueIteration,
    LinearStateRewardFunction, Mlirl,
};
use rl_tutorials::model::Model;
use rl_tutorials::utils::init_logging;
use rl_tutorials::Result;

extern crate structopt;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
enum Demo {
    /// Record demonstrations by driving the agent with w/a/s/d
    Record,
    /// Generate demonstrations from an expert planning with a known reward
    Expert {
        /// Reward of each location type
        #[structopt(long = "theta", use_delimiter = true, default_value = "-1,0,0,1,0")]
        theta: Vec<f64>,

        #[structopt(long = "n_episodes", short = "n", default_value = "10")]
        n_episodes: usize,

        /// Steps of every demonstration
        #[structopt(long = "episode_length", default_value = "10")]
        episode_length: usize,
    },
    /// Print the stored demonstrations
    Replay,
    /// Learn a reward function from the stored demonstrations with MLIRL
    Run {
        /// Boltzmann inverse temperature of the demonstrator model
        #[structopt(long = "beta", default_value = "10")]
        beta: f64,

        #[structopt(long = "discount_factor", default_value = "0.99")]
        discount_factor: f64,

        /// Gradient ascent step size
        #[structopt(long = "learning_rate", default_value = "0.1")]
        learning_rate: f64,

        /// Stop once the log-likelihood changes less than this
        #[structopt(long = "max_likelihood_change", default_value = "0.1")]
        max_likelihood_change: f64,

        /// Maximum number of gradient steps
        #[structopt(long = "max_steps", default_value = "10")]
        max_steps: usize,

        /// Value change under which a planning sweep stops
        #[structopt(long = "max_delta", default_value = "0.01")]
        max_delta: f64,

        /// Maximum number of planning sweeps
        #[structopt(long = "max_iterations", default_value = "100")]
        max_iterations: usize,
    },
}

/// Maximum-likelihood inverse reinforcement learning on a 5x5 grid of typed locations
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - IRL")]
struct Cli {
    /// Directory holding the demonstrations
    #[structopt(long = "demos", default_value = "irl_demos", parse(from_os_str))]
    demos: PathBuf,

    /// Seed of the start states and of the initial reward parameters
    #[structopt(long = "seed", default_value = "0")]
    seed: u64,

    /// Log every planning sweep
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    demo: Demo,
}

fn record(cli: &Cli) -> Result<()> {
    let gw = irl_grid();
    let height = gw.height();
    let mut env = SimulatedEnv::with_generator(
        gw,
        Box::new(move |rng: &mut StdRng| left_side_state(height, rng)),
        cli.seed,
    );
    let stdin = io::stdin();
    let stdout = io::stdout();
    let episodes = explore(&mut env, &mut stdin.lock(), &mut stdout.lock())?;
    write_episodes(&episodes, &cli.demos, "demo")?;
    println!("{} demonstrations written to {}", episodes.len(), cli.demos.display());
    Ok(())
}

fn expert(cli: &Cli, theta: &[f64], n_episodes: usize, episode_length: usize) -> Result<()> {
    let gw = irl_grid();
    let episodes = expert_demonstrations(
        &gw,
        Array1::from(theta.to_vec()),
        n_episodes,
        episode_length,
        cli.seed,
    )?;
    write_episodes(&episodes, &cli.demos, "demo")?;
    println!("{} demonstrations written to {}", episodes.len(), cli.demos.display());
    Ok(())
}

fn replay(cli: &Cli) -> Result<()> {
    let gw = irl_grid();
    let episodes: Vec<Episode<GridState, GridAction>> = read_episodes(&cli.demos)?;
    for (i, episode) in episodes.iter().enumerate() {
        let moves: Vec<&str> = episode.actions.iter().map(|a| a.label()).collect();
        println!("demo {}: {}", i, moves.join(" "));
        if let Some(last) = episode.last_state() {
            println!("{}\n", gw.render(last));
        }
    }
    Ok(())
}

fn render_reward(gw: &GridWorld, rf: &LinearStateRewardFunction<GridState>) -> String {
    let mut out = String::new();
    for y in (0..gw.height()).rev() {
        for x in 0..gw.width() {
            let _ = write!(out, "{:7.3} ", rf.state_reward(&GridState::new(x, y)));
        }
        out.push('\n');
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn run_irl(
    cli: &Cli,
    beta: f64,
    discount_factor: f64,
    learning_rate: f64,
    max_likelihood_change: f64,
    max_steps: usize,
    max_delta: f64,
    max_iterations: usize,
) -> Result<()> {
    let gw = irl_grid();
    let episodes: Vec<Episode<GridState, GridAction>> = read_episodes(&cli.demos)?;
    let rf = LinearStateRewardFunction::random(irl_features(&gw), cli.seed);
    println!("initial parameters {:?}", rf.parameters().to_vec());

    let planner = DifferentiableValueIteration::new(
        gw.clone(),
        rf,
        discount_factor,
        beta,
        max_delta,
        max_iterations,
    );
    let mut irl = Mlirl::new(
        planner,
        episodes,
        learning_rate,
        max_likelihood_change,
        max_steps,
    )?;

    let now: Instant = Instant::now();
    let history = irl.perform_irl()?;
    println!("MLIRL {:.2?}", now.elapsed());
    for (step, likelihood) in history.iter().enumerate() {
        println!("{}: log-likelihood {:.4}", step, likelihood);
    }
    println!("learned parameters {:?}", irl.parameters().to_vec());
    println!("learned reward:\n{}", render_reward(&gw, irl.planner().reward_function()));
    println!("greedy policy:\n{}", gw.render_value_function(irl.planner()));
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.demo {
        Demo::Record => record(cli),
        Demo::Expert {
            theta,
            n_episodes,
            episode_length,
        } => expert(cli, theta, *n_episodes, *episode_length),
        Demo::Replay => replay(cli),
        Demo::Run {
            beta,
            discount_factor,
            learning_rate,
            max_likelihood_change,
            max_steps,
            max_delta,
            max_iterations,
        } => run_irl(
            cli,
            *beta,
            *discount_factor,
            *learning_rate,
            *max_likelihood_change,
            *max_steps,
            *max_delta,
            *max_iterations,
        ),
    }
}

fn main() {
    let cli: Cli = Cli::from_args();
    init_logging(cli.verbose);
    if let Err(e) = run(&cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
