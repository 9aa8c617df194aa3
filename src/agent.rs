mod gradient_sarsa_lambda;
mod lspi;
mod q_learning;
mod sarsa_lambda;

pub use gradient_sarsa_lambda::GradientSarsaLambda;
pub use lspi::{collect_random_samples, Lspi, SarsSample};
pub use q_learning::{Choice, QLearning};
pub use sarsa_lambda::SarsaLambda;

use kdam::{tqdm, BarExt};

use crate::env::Env;
use crate::episode::Episode;
use crate::error::Result;

/// Reward and number of primitive steps of every training episode.
pub type TrainResults = (Vec<f64>, Vec<usize>);

pub trait LearningAgent<S, A> {
    /// Resets `env` and learns from one episode of interaction, stopping at a
    /// terminal state or after `max_steps` primitive steps.
    fn run_learning_episode(
        &mut self,
        env: &mut dyn Env<S, A>,
        max_steps: Option<usize>,
    ) -> Result<Episode<S, A>>;

    /// Forgets everything learned so far.
    fn reset(&mut self);

    fn train(
        &mut self,
        env: &mut dyn Env<S, A>,
        n_episodes: usize,
        max_steps: Option<usize>,
    ) -> Result<TrainResults> {
        let mut training_reward: Vec<f64> = vec![];
        let mut training_length: Vec<usize> = vec![];

        let mut pb = tqdm!(total = n_episodes);
        pb.set_description("training");
        pb.refresh();

        for episode in 0..n_episodes {
            let ea = self.run_learning_episode(env, max_steps)?;
            tracing::debug!(
                episode,
                steps = ea.max_time_step(),
                reward = ea.total_reward(),
                "learning episode"
            );
            training_reward.push(ea.total_reward());
            training_length.push(ea.max_time_step());
            pb.set_postfix(format!("steps={}", ea.max_time_step()));
            pb.update(1);
        }
        Ok((training_reward, training_length))
    }
}
