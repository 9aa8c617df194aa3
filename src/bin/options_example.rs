use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use rl_tutorials::action_selection::EpsilonGreedy;
use rl_tutorials::agent::{LearningAgent, QLearning};
use rl_tutorials::env::{Env, GridAction, GridState, GridWorld, SimulatedEnv, UniformCostRf};
use rl_tutorials::episode::write_episodes;
use rl_tutorials::experiment::{plot_results, write_csv, Experimenter};
use rl_tutorials::model::Model;
use rl_tutorials::options::{four_rooms_options, SubgoalOption};
use rl_tutorials::utils::init_logging;
use rl_tutorials::value_function::ConstantValue;
use rl_tutorials::Result;

extern crate structopt;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
enum Demo {
    /// Execute every room option once and print where it ends
    Test,
    /// Compare Q-learning with different sets of room options
    Compare {
        #[structopt(long = "n_trials", default_value = "10")]
        n_trials: usize,

        #[structopt(long = "n_episodes", short = "n", default_value = "100")]
        n_episodes: usize,

        /// Initial Q-value of primitives and options
        #[structopt(long = "q_init", default_value = "0.0")]
        q_init: f64,

        /// Learning rate of the RL agents
        #[structopt(long = "learning_rate", default_value = "1.0")]
        learning_rate: f64,
    },
}

/// Hierarchical Q-learning with doorway options on the four rooms grid
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Options")]
struct Cli {
    /// Directory where episodes, CSV files and plots are written
    #[structopt(long = "output", default_value = "output/options", parse(from_os_str))]
    output: PathBuf,

    /// Discount factor used by the agents and to discount option rewards
    #[structopt(long = "discount_factor", default_value = "0.99")]
    discount_factor: f64,

    /// Seed of the environment and of the exploration
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Log every episode
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    demo: Demo,
}

const OPTION_STARTS: [(&str, (usize, usize)); 8] = [
    ("swToNorth", (0, 0)),
    ("swToEast", (0, 0)),
    ("seToWest", (10, 0)),
    ("seToNorth", (10, 0)),
    ("neToSouth", (10, 10)),
    ("neToWest", (10, 10)),
    ("nwToEast", (0, 10)),
    ("nwToSouth", (0, 10)),
];

fn options_named(gw: &GridWorld, names: &[&str]) -> Vec<SubgoalOption<GridState, GridAction>> {
    four_rooms_options(gw)
        .into_iter()
        .filter(|o| names.iter().any(|n| *n == o.name()))
        .collect()
}

fn test_options(cli: &Cli) -> Result<()> {
    let gw = GridWorld::four_rooms();
    let mut episodes = Vec::with_capacity(OPTION_STARTS.len());
    for (mut option, (name, (x, y))) in four_rooms_options(&gw).into_iter().zip(OPTION_STARTS) {
        let mut env = SimulatedEnv::new(gw.clone(), GridState::new(x, y), cli.seed);
        env.reset();
        let outcome = option.control(&mut env, cli.discount_factor)?;
        println!(
            "{} from ({}, {}): {} steps, discounted reward {:.3}, ends at ({}, {})",
            name,
            x,
            y,
            outcome.steps,
            outcome.discounted_reward,
            outcome.state.x,
            outcome.state.y
        );
        println!("{}\n", gw.render(&outcome.state));
        episodes.push(outcome.episode);
    }
    write_episodes(&episodes, &cli.output, "option")?;
    Ok(())
}

fn compare(
    cli: &Cli,
    n_trials: usize,
    n_episodes: usize,
    q_init: f64,
    learning_rate: f64,
) -> Result<()> {
    let gw = GridWorld::four_rooms()
        .with_goal(10, 10)
        .with_reward_function(Rc::new(UniformCostRf));
    let mut env = SimulatedEnv::new(gw.clone(), GridState::new(0, 0), cli.seed);

    let agents: [(&str, Vec<&'static str>); 4] = [
        ("Vanilla Q-Learning", vec![]),
        (
            "All Options",
            OPTION_STARTS.iter().map(|(name, _)| *name).collect(),
        ),
        (
            "No Goal-room Options",
            vec![
                "swToNorth",
                "swToEast",
                "seToWest",
                "seToNorth",
                "nwToEast",
                "nwToSouth",
            ],
        ),
        (
            "One Way Directed Options",
            vec!["swToNorth", "seToNorth", "nwToEast"],
        ),
    ];

    let mut experimenter: Experimenter<GridState, GridAction> =
        Experimenter::new(n_trials, n_episodes, None);
    let discount_factor = cli.discount_factor;
    for (name, option_names) in agents {
        let domain = gw.clone();
        let seed = Cell::new(cli.seed);
        experimenter.add_agent(
            name,
            Box::new(move || -> Box<dyn LearningAgent<GridState, GridAction>> {
                let s = seed.get();
                seed.set(s + 1);
                let agent = QLearning::<GridState, GridAction>::new(
                    GridAction::ALL.to_vec(),
                    discount_factor,
                    Rc::new(ConstantValue(q_init)),
                    learning_rate,
                    EpsilonGreedy::new(0.1, s).into(),
                )
                .with_options(options_named(&domain, &option_names));
                Box::new(agent)
            }),
        );
    }

    let now: Instant = Instant::now();
    let results = experimenter.run(&mut env)?;
    println!("comparison {:.2?}", now.elapsed());
    write_csv(&results, &cli.output)?;
    plot_results(&results, &cli.output)?;
    for r in &results {
        let steps = r.average_steps();
        println!(
            "{}: {:.1} steps in the last episode, {:.0} cumulative",
            r.name,
            steps.last().copied().unwrap_or(0.0),
            r.average_cumulative_steps().last().copied().unwrap_or(0.0)
        );
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.demo {
        Demo::Test => test_options(cli),
        Demo::Compare {
            n_trials,
            n_episodes,
            q_init,
            learning_rate,
        } => compare(cli, *n_trials, *n_episodes, *q_init, *learning_rate),
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
