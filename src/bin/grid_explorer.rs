use std::io;
use std::path::PathBuf;

use rl_tutorials::env::{GridState, GridWorld, SimulatedEnv};
use rl_tutorials::episode::write_episodes;
use rl_tutorials::explorer::explore;
use rl_tutorials::utils::init_logging;
use rl_tutorials::{Result, RlError};

extern crate structopt;

use structopt::StructOpt;

/// Walk a grid world from the terminal with w/a/s/d and record the episodes
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Grid Explorer")]
struct Cli {
    /// Open grid of this width instead of the four rooms map
    #[structopt(long = "width")]
    width: Option<usize>,

    /// Height of the open grid
    #[structopt(long = "height", default_value = "11")]
    height: usize,

    /// Goal cell that ends the episode, as x,y
    #[structopt(long = "goal", use_delimiter = true)]
    goal: Vec<usize>,

    /// Probability that a move goes in the intended direction
    #[structopt(long = "success_probability", default_value = "1.0")]
    success_probability: f64,

    /// Record the episodes as JSON files in this directory
    #[structopt(long = "record", parse(from_os_str))]
    record: Option<PathBuf>,

    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    #[structopt(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let mut gw = match cli.width {
        Some(width) => GridWorld::empty(width, cli.height),
        None => GridWorld::four_rooms(),
    };
    match cli.goal[..] {
        [] => {}
        [x, y] => gw = gw.with_goal(x, y),
        _ => {
            return Err(RlError::InvalidParameter(format!(
                "goal must be x,y, got {:?}",
                cli.goal
            )))
        }
    }
    let gw = gw.with_success_probability(cli.success_probability)?;
    let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), cli.seed);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let episodes = explore(&mut env, &mut stdin.lock(), &mut stdout.lock())?;
    for (i, e) in episodes.iter().enumerate() {
        println!("episode {}: {} steps, return {}", i, e.max_time_step(), e.total_reward());
    }
    if let Some(dir) = &cli.record {
        write_episodes(&episodes, dir, "episode")?;
        println!("{} episodes written to {}", episodes.len(), dir.display());
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
