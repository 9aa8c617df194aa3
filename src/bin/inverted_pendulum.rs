use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rl_tutorials::env::{InvertedPendulum, InvertedPendulumState};
use rl_tutorials::episode::rollout_model;
use rl_tutorials::planning::SparseSampling;
use rl_tutorials::utils::init_logging;
use rl_tutorials::Result;

extern crate structopt;

use structopt::StructOpt;

/// Balance an inverted pendulum by replanning every step with sparse sampling
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Inverted Pendulum")]
struct Cli {
    /// Depth of the sampled lookahead tree
    #[structopt(long = "horizon", default_value = "1")]
    horizon: usize,

    /// Samples drawn per state-action pair in the tree
    #[structopt(long = "n_samples", default_value = "1")]
    n_samples: usize,

    /// Discount factor of the lookahead
    #[structopt(long = "discount_factor", default_value = "1.0")]
    discount_factor: f64,

    /// Width of the uniform noise added to every push
    #[structopt(long = "action_noise", default_value = "0.0")]
    action_noise: f64,

    /// Angle at which the pole counts as fallen
    #[structopt(long = "max_angle", default_value = "0.39269908169872414")]
    max_angle: f64,

    /// Initial angle of the pole
    #[structopt(long = "angle", default_value = "0.0")]
    angle: f64,

    /// Initial angular velocity of the pole
    #[structopt(long = "angular_velocity", default_value = "0.0")]
    angular_velocity: f64,

    /// Maximum number of steps to balance
    #[structopt(long = "max_steps", default_value = "500")]
    max_steps: usize,

    /// Seed of the sampling
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,

    /// Draw the pole after every step
    #[structopt(long = "show_example")]
    show_example: bool,

    /// Log every decision
    #[structopt(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let domain = InvertedPendulum::new()
        .with_action_noise(cli.action_noise)
        .with_max_angle(cli.max_angle);
    let mut planner = SparseSampling::new(
        domain.clone(),
        cli.discount_factor,
        cli.horizon,
        cli.n_samples,
        cli.seed,
    )?;
    tracing::info!(
        samples_per_decision = planner.samples_per_decision(3),
        "sparse sampling ready"
    );

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let start = InvertedPendulumState::new(cli.angle, cli.angular_velocity);
    let now: Instant = Instant::now();
    let episode = rollout_model(&domain, &mut planner, start, cli.max_steps, &mut rng)?;
    println!("Sparse sampling {:.2?}", now.elapsed());

    if cli.show_example {
        for s in &episode.states {
            println!("{}", domain.render(s));
        }
    }
    match episode.states.last() {
        Some(last) if domain.failed(last) => {
            println!("pole fell after {} steps", episode.max_time_step())
        }
        _ => println!("pole balanced for {} steps", episode.max_time_step()),
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
