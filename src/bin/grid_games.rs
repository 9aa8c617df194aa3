use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rl_tutorials::env::GridGame;
use rl_tutorials::planning::{CocoQ, EnumJointBackup, MaxWelfare, MultiAgentValueIteration};
use rl_tutorials::utils::init_logging;
use rl_tutorials::{Result, RlError};

extern crate structopt;

use structopt::StructOpt;

/// Plan the grid game prisoner's dilemma with multi-agent value iteration and play it
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Grid Games")]
struct Cli {
    /// Stage game solution backed up by value iteration
    #[structopt(long = "backup", default_value = "coco", possible_values = &["coco", "max_welfare"])]
    backup: String,

    /// Regret matching iterations per CoCo stage game
    #[structopt(long = "coco_iterations", default_value = "1000")]
    coco_iterations: usize,

    /// Discount factor of the planner
    #[structopt(long = "discount_factor", default_value = "0.99")]
    discount_factor: f64,

    /// Value change under which the sweeps stop
    #[structopt(long = "max_delta", default_value = "0.00015")]
    max_delta: f64,

    /// Maximum number of sweeps
    #[structopt(long = "max_iterations", default_value = "50")]
    max_iterations: usize,

    /// Cost of every move
    #[structopt(long = "step_cost", default_value = "-1.0", allow_hyphen_values = true)]
    step_cost: f64,

    /// Reward of reaching a goal
    #[structopt(long = "goal_reward", default_value = "100.0")]
    goal_reward: f64,

    /// Number of games played with the planned joint policy
    #[structopt(long = "n_games", default_value = "3")]
    n_games: usize,

    /// Maximum number of joint actions per game
    #[structopt(long = "max_steps", default_value = "100")]
    max_steps: usize,

    /// Seed of the contested moves
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Draw the grid after every joint action of the last game
    #[structopt(long = "show_example")]
    show_example: bool,

    /// Log every sweep
    #[structopt(short, long)]
    verbose: bool,
}

fn backup(cli: &Cli) -> Result<EnumJointBackup> {
    match cli.backup.as_str() {
        "coco" => Ok(CocoQ::new(cli.coco_iterations).into()),
        "max_welfare" => Ok(MaxWelfare.into()),
        other => Err(RlError::InvalidParameter(format!("unknown backup {}", other))),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (game, start) = GridGame::prisoners_dilemma();
    let game = game.with_rewards(cli.step_cost, cli.goal_reward, false);
    let mut vi = MultiAgentValueIteration::new(
        game,
        backup(cli)?,
        cli.discount_factor,
        cli.max_delta,
        cli.max_iterations,
    );
    let now: Instant = Instant::now();
    let sweeps = vi.plan_from_state(&start);
    println!(
        "Multi-agent VI ({}) {} states, {} sweeps in {:.2?}",
        cli.backup,
        vi.n_states(),
        sweeps,
        now.elapsed()
    );
    let v = vi.value(&start);
    println!("start values: agent 0 {:.3}, agent 1 {:.3}", v[0], v[1]);

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut last = None;
    for i in 0..cli.n_games {
        let record = vi.play_game(start, cli.max_steps, &mut rng)?;
        let total = record.total_rewards();
        println!(
            "game {}: {} steps, returns {} and {}",
            i,
            record.max_time_step(),
            total[0],
            total[1]
        );
        last = Some(record);
    }
    if cli.show_example {
        if let Some(record) = last {
            for (s, joint) in record.states.iter().zip(&record.joint_actions) {
                println!("{}\n{:?}\n", vi.game().render(s), joint);
            }
            if let Some(s) = record.states.last() {
                println!("{}", vi.game().render(s));
            }
        }
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
