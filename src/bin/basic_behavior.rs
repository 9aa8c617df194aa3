use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use rl_tutorials::action_selection::EpsilonGreedy;
use rl_tutorials::agent::{LearningAgent, QLearning, SarsaLambda};
use rl_tutorials::env::{GoalBasedRf, GridAction, GridState, GridWorld, SimulatedEnv};
use rl_tutorials::episode::{read_episodes, rollout_model, Episode};
use rl_tutorials::experiment::{plot_results, write_csv, Experimenter};
use rl_tutorials::model::Model;
use rl_tutorials::planning::{DeterministicPlanner, SearchStrategy, ValueIteration};
use rl_tutorials::policy::DynamicPlannerPolicy;
use rl_tutorials::utils::init_logging;
use rl_tutorials::value_function::ConstantValue;
use rl_tutorials::Result;

extern crate structopt;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
enum Demo {
    /// Breadth-first search plan
    Bfs,
    /// Depth-first search plan
    Dfs {
        /// Longest plan the search may return
        #[structopt(long = "max_depth")]
        max_depth: Option<usize>,
    },
    /// A* plan with the Manhattan distance heuristic
    Astar,
    /// Value iteration and a rollout of its greedy policy
    Vi,
    /// Q-learning episodes
    Ql {
        #[structopt(long = "n_episodes", short = "n", default_value = "50")]
        n_episodes: usize,
    },
    /// SARSA(lambda) episodes
    Sarsa {
        #[structopt(long = "n_episodes", short = "n", default_value = "50")]
        n_episodes: usize,
    },
    /// Compare Q-learning and SARSA(lambda) over several trials
    Experiment {
        #[structopt(long = "n_trials", default_value = "10")]
        n_trials: usize,

        #[structopt(long = "n_episodes", short = "n", default_value = "100")]
        n_episodes: usize,
    },
    /// Print every episode stored in the output directory
    Replay,
}

/// Planning and learning on the deterministic four rooms grid
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Basic Behavior")]
struct Cli {
    /// Directory where episodes and experiment data are written
    #[structopt(long = "output", default_value = "output", parse(from_os_str))]
    output: PathBuf,

    /// Maximum number of steps per episode
    #[structopt(long = "max_steps", default_value = "10000")]
    max_steps: usize,

    /// Seed of the environment and of the exploration
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Log every episode
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    demo: Demo,
}

const GOAL: (usize, usize) = (10, 10);

fn domain() -> GridWorld {
    GridWorld::four_rooms().with_goal(GOAL.0, GOAL.1)
}

fn write_episode(episode: &Episode<GridState, GridAction>, dir: &Path, name: &str) -> Result<()> {
    episode.write(&dir.join(format!("{}.json", name)))?;
    println!("{}: {} steps", name, episode.max_time_step());
    Ok(())
}

fn search(cli: &Cli, name: &str, strategy: SearchStrategy<GridState>) -> Result<()> {
    let gw = domain();
    let start = GridState::new(0, 0);
    let planner = DeterministicPlanner::new(
        gw.clone(),
        Rc::new(GridWorld::at_cell(GOAL.0, GOAL.1)),
        strategy,
    );
    let mut policy = DynamicPlannerPolicy::new(planner);
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let episode = rollout_model(&gw, &mut policy, start, cli.max_steps, &mut rng)?;
    write_episode(&episode, &cli.output, name)
}

fn value_iteration(cli: &Cli) -> Result<()> {
    let gw = domain();
    let start = GridState::new(0, 0);
    let mut vi = ValueIteration::new(gw.clone(), 0.99, Rc::new(ConstantValue(0.0)), 100)
        .with_max_delta(0.001);
    vi.plan_from_state(&start);
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let episode = rollout_model(&gw, &mut vi.greedy_policy(), start, cli.max_steps, &mut rng)?;
    write_episode(&episode, &cli.output, "vi")?;
    println!("{}", gw.render_value_function(&vi));
    Ok(())
}

fn learn<L: LearningAgent<GridState, GridAction>>(
    cli: &Cli,
    agent: &mut L,
    env: &mut SimulatedEnv<GridWorld>,
    prefix: &str,
    n_episodes: usize,
) -> Result<()> {
    for i in 0..n_episodes {
        let episode = agent.run_learning_episode(env, Some(cli.max_steps))?;
        write_episode(&episode, &cli.output, &format!("{}_{}", prefix, i))?;
    }
    Ok(())
}

fn q_learning(cli: &Cli, n_episodes: usize) -> Result<()> {
    let gw = domain();
    let mut env = SimulatedEnv::new(gw.clone(), GridState::new(0, 0), cli.seed);
    let mut agent: QLearning<GridState, GridAction> = QLearning::new(
        GridAction::ALL.to_vec(),
        0.99,
        Rc::new(ConstantValue(0.0)),
        1.0,
        EpsilonGreedy::new(0.1, cli.seed).into(),
    );
    learn(cli, &mut agent, &mut env, "ql", n_episodes)?;
    println!("{}", gw.render_value_function(&agent));
    Ok(())
}

fn sarsa(cli: &Cli, n_episodes: usize) -> Result<()> {
    let gw = domain();
    let mut env = SimulatedEnv::new(gw.clone(), GridState::new(0, 0), cli.seed);
    let mut agent: SarsaLambda<GridState, GridAction> = SarsaLambda::new(
        GridAction::ALL.to_vec(),
        0.99,
        Rc::new(ConstantValue(0.0)),
        0.5,
        0.3,
        EpsilonGreedy::new(0.1, cli.seed).into(),
    );
    learn(cli, &mut agent, &mut env, "sarsa", n_episodes)?;
    println!("{}", gw.render_value_function(&agent));
    Ok(())
}

fn experiment(cli: &Cli, n_trials: usize, n_episodes: usize) -> Result<()> {
    let gw = domain().with_reward_function(Rc::new(GoalBasedRf::new(
        Rc::new(GridWorld::at_cell(GOAL.0, GOAL.1)),
        5.0,
        -0.1,
    )));
    let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), cli.seed);

    let mut experimenter: Experimenter<GridState, GridAction> =
        Experimenter::new(n_trials, n_episodes, Some(cli.max_steps));
    let ql_seed = Cell::new(cli.seed);
    experimenter.add_agent(
        "Q-Learning",
        Box::new(move || -> Box<dyn LearningAgent<GridState, GridAction>> {
            let seed = ql_seed.get();
            ql_seed.set(seed + 1);
            Box::new(QLearning::<GridState, GridAction>::new(
                GridAction::ALL.to_vec(),
                0.99,
                Rc::new(ConstantValue(0.3)),
                0.1,
                EpsilonGreedy::new(0.1, seed).into(),
            ))
        }),
    );
    let sarsa_seed = Cell::new(cli.seed);
    experimenter.add_agent(
        "SARSA",
        Box::new(move || -> Box<dyn LearningAgent<GridState, GridAction>> {
            let seed = sarsa_seed.get();
            sarsa_seed.set(seed + 1);
            Box::new(SarsaLambda::<GridState, GridAction>::new(
                GridAction::ALL.to_vec(),
                0.99,
                Rc::new(ConstantValue(0.0)),
                0.1,
                1.0,
                EpsilonGreedy::new(0.1, seed).into(),
            ))
        }),
    );

    let now: Instant = Instant::now();
    let results = experimenter.run(&mut env)?;
    println!("experiment {:.2?}", now.elapsed());
    let dir = cli.output.join("expData");
    write_csv(&results, &dir)?;
    plot_results(&results, &dir)?;
    for r in &results {
        let cumulative = r.average_cumulative_steps();
        println!(
            "{}: {} cumulative steps after {} episodes",
            r.name,
            cumulative.last().copied().unwrap_or(0.0),
            cumulative.len()
        );
    }
    Ok(())
}

fn replay(cli: &Cli) -> Result<()> {
    let gw = domain();
    let episodes: Vec<Episode<GridState, GridAction>> = read_episodes(&cli.output)?;
    for (i, episode) in episodes.iter().enumerate() {
        println!("episode {}: {} steps", i, episode.max_time_step());
        for (s, a) in episode.states.iter().zip(&episode.actions) {
            println!("{}\n{}\n", gw.render(s), a.label());
        }
        if let Some(last) = episode.last_state() {
            println!("{}\n", gw.render(last));
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.demo {
        Demo::Bfs => search(cli, "bfs", SearchStrategy::Bfs),
        Demo::Dfs { max_depth } => search(
            cli,
            "dfs",
            SearchStrategy::Dfs {
                max_depth: *max_depth,
            },
        ),
        Demo::Astar => search(
            cli,
            "astar",
            SearchStrategy::AStar(Rc::new(GridWorld::manhattan_to(GOAL.0, GOAL.1))),
        ),
        Demo::Vi => value_iteration(cli),
        Demo::Ql { n_episodes } => q_learning(cli, *n_episodes),
        Demo::Sarsa { n_episodes } => sarsa(cli, *n_episodes),
        Demo::Experiment {
            n_trials,
            n_episodes,
        } => experiment(cli, *n_trials, *n_episodes),
        Demo::Replay => replay(cli),
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
