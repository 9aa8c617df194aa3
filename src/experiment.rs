use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use kdam::{tqdm, BarExt};

use crate::agent::LearningAgent;
use crate::env::Env;
use crate::error::{Result, RlError};
use crate::utils::plot_moving_average;

/// Builds a fresh agent for every trial.
pub type AgentFactory<S, A> = Box<dyn Fn() -> Box<dyn LearningAgent<S, A>>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialResult {
    pub steps: Vec<usize>,
    pub rewards: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentResults {
    pub name: String,
    pub trials: Vec<TrialResult>,
}

impl AgentResults {
    fn average_over_trials(&self, metric: impl Fn(&TrialResult) -> Vec<f64>) -> Vec<f64> {
        let per_trial: Vec<Vec<f64>> = self.trials.iter().map(metric).collect();
        let n_episodes = per_trial.iter().map(|t| t.len()).min().unwrap_or(0);
        (0..n_episodes)
            .map(|e| per_trial.iter().map(|t| t[e]).sum::<f64>() / per_trial.len() as f64)
            .collect()
    }

    pub fn average_steps(&self) -> Vec<f64> {
        self.average_over_trials(|t| t.steps.iter().map(|s| *s as f64).collect())
    }

    pub fn average_cumulative_steps(&self) -> Vec<f64> {
        self.average_over_trials(|t| {
            t.steps
                .iter()
                .scan(0.0, |acc, s| {
                    *acc += *s as f64;
                    Some(*acc)
                })
                .collect()
        })
    }

    pub fn average_reward(&self) -> Vec<f64> {
        self.average_over_trials(|t| t.rewards.clone())
    }
}

/// Runs every agent for `n_trials` independent trials of `n_episodes`
/// learning episodes on the same environment.
pub struct Experimenter<S, A> {
    n_trials: usize,
    n_episodes: usize,
    max_steps: Option<usize>,
    agents: Vec<(String, AgentFactory<S, A>)>,
}

impl<S, A> Experimenter<S, A> {
    pub fn new(n_trials: usize, n_episodes: usize, max_steps: Option<usize>) -> Self {
        Self {
            n_trials,
            n_episodes,
            max_steps,
            agents: vec![],
        }
    }

    pub fn add_agent(&mut self, name: &str, factory: AgentFactory<S, A>) {
        self.agents.push((name.to_string(), factory));
    }

    pub fn run(&self, env: &mut dyn Env<S, A>) -> Result<Vec<AgentResults>> {
        if self.agents.is_empty() {
            return Err(RlError::InvalidParameter(
                "experiment has no agents".to_string(),
            ));
        }
        let mut results = Vec::with_capacity(self.agents.len());
        for (name, factory) in &self.agents {
            let mut pb = tqdm!(total = self.n_trials * self.n_episodes);
            pb.set_description(name.clone());
            let mut trials = Vec::with_capacity(self.n_trials);
            for trial in 0..self.n_trials {
                let mut agent = factory();
                let mut result = TrialResult::default();
                for _ in 0..self.n_episodes {
                    let episode = agent.run_learning_episode(env, self.max_steps)?;
                    result.steps.push(episode.max_time_step());
                    result.rewards.push(episode.total_reward());
                    pb.update(1);
                }
                tracing::debug!(agent = %name, trial, "trial finished");
                trials.push(result);
            }
            let agent_results = AgentResults {
                name: name.clone(),
                trials,
            };
            tracing::info!(
                agent = %name,
                final_avg_steps = agent_results.average_steps().last().copied().unwrap_or(0.0),
                "agent finished"
            );
            results.push(agent_results);
        }
        Ok(results)
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// One `<agent>.csv` per agent with every trial, plus `summary.csv` with the
/// averages over trials.
pub fn write_csv(results: &[AgentResults], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for agent in results {
        let mut w = BufWriter::new(File::create(dir.join(format!("{}.csv", file_stem(&agent.name))))?);
        writeln!(w, "trial,episode,steps,reward")?;
        for (trial, result) in agent.trials.iter().enumerate() {
            for (episode, (steps, reward)) in result.steps.iter().zip(&result.rewards).enumerate() {
                writeln!(w, "{},{},{},{}", trial, episode, steps, reward)?;
            }
        }
    }
    let mut w = BufWriter::new(File::create(dir.join("summary.csv"))?);
    writeln!(w, "agent,episode,avg_steps,avg_cumulative_steps,avg_reward")?;
    for agent in results {
        let steps = agent.average_steps();
        let cumulative = agent.average_cumulative_steps();
        let reward = agent.average_reward();
        for e in 0..steps.len() {
            writeln!(
                w,
                "{},{},{},{},{}",
                agent.name, e, steps[e], cumulative[e], reward[e]
            )?;
        }
    }
    Ok(())
}

/// Average steps, cumulative steps and reward per episode as PNG charts.
pub fn plot_results(results: &[AgentResults], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let legends: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    let charts: [(&str, &str, fn(&AgentResults) -> Vec<f64>); 3] = [
        ("steps.png", "Average steps per episode", AgentResults::average_steps),
        (
            "cumulative_steps.png",
            "Average cumulative steps per episode",
            AgentResults::average_cumulative_steps,
        ),
        ("reward.png", "Average reward per episode", AgentResults::average_reward),
    ];
    for (file, title, metric) in charts {
        let values: Vec<Vec<f64>> = results.iter().map(metric).collect();
        plot_moving_average(&values, &legends, title, &dir.join(file))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> AgentResults {
        AgentResults {
            name: "Q-Learning".to_string(),
            trials: vec![
                TrialResult {
                    steps: vec![10, 4],
                    rewards: vec![-10.0, -4.0],
                },
                TrialResult {
                    steps: vec![20, 6],
                    rewards: vec![-20.0, -6.0],
                },
            ],
        }
    }

    #[test]
    fn averages_over_trials() {
        let r = results();
        assert_eq!(r.average_steps(), vec![15.0, 5.0]);
        assert_eq!(r.average_cumulative_steps(), vec![15.0, 20.0]);
        assert_eq!(r.average_reward(), vec![-15.0, -5.0]);
    }

    #[test]
    fn csv_files_per_agent_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(&[results()], dir.path()).unwrap();
        let trials = fs::read_to_string(dir.path().join("q_learning.csv")).unwrap();
        assert_eq!(trials.lines().count(), 5);
        assert_eq!(trials.lines().nth(3), Some("1,0,20,-20"));
        let summary = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        assert_eq!(summary.lines().nth(2), Some("Q-Learning,1,5,20,-5"));
    }
}
