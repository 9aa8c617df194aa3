use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::env::Env;
use crate::error::Result;
use crate::model::GenerativeModel;
use crate::policy::Policy;

/// Recorded interaction `s0, a0, r1, s1, a1, r2, ...`.
/// There is always one more state than there are actions and rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode<S, A> {
    pub states: Vec<S>,
    pub actions: Vec<A>,
    pub rewards: Vec<f64>,
}

impl<S, A> Episode<S, A> {
    pub fn new(initial_state: S) -> Self {
        Self {
            states: vec![initial_state],
            actions: vec![],
            rewards: vec![],
        }
    }

    pub fn record(&mut self, action: A, reward: f64, next_state: S) {
        self.actions.push(action);
        self.rewards.push(reward);
        self.states.push(next_state);
    }

    /// Appends the steps of `other`, which must start where this one ends.
    pub fn extend(&mut self, other: Episode<S, A>) {
        self.states.extend(other.states.into_iter().skip(1));
        self.actions.extend(other.actions);
        self.rewards.extend(other.rewards);
    }

    pub fn max_time_step(&self) -> usize {
        self.actions.len()
    }

    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    pub fn discounted_return(&self, discount_factor: f64) -> f64 {
        self.rewards
            .iter()
            .rev()
            .fold(0.0, |acc, r| r + discount_factor * acc)
    }

    pub fn last_state(&self) -> Option<&S> {
        self.states.last()
    }
}

impl<S: Serialize, A: Serialize> Episode<S, A> {
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

impl<S: DeserializeOwned, A: DeserializeOwned> Episode<S, A> {
    pub fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Every `*.json` episode in `dir`, ordered by file name.
pub fn read_episodes<S: DeserializeOwned, A: DeserializeOwned>(
    dir: &Path,
) -> Result<Vec<Episode<S, A>>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();
    let episodes = paths
        .iter()
        .map(|p| Episode::read(p))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(count = episodes.len(), dir = %dir.display(), "episodes loaded");
    Ok(episodes)
}

/// Writes `episodes` to `dir` as `<prefix>_<index>.json`.
pub fn write_episodes<S: Serialize, A: Serialize>(
    episodes: &[Episode<S, A>],
    dir: &Path,
    prefix: &str,
) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (i, episode) in episodes.iter().enumerate() {
        episode.write(&dir.join(format!("{}_{:03}.json", prefix, i)))?;
    }
    Ok(())
}

/// Follows `policy` through the sampled dynamics of `model`.
pub fn rollout_model<M: GenerativeModel>(
    model: &M,
    policy: &mut dyn Policy<M::State, M::Action>,
    initial_state: M::State,
    max_steps: usize,
    rng: &mut StdRng,
) -> Result<Episode<M::State, M::Action>> {
    let mut episode = Episode::new(initial_state.clone());
    let mut s = initial_state;
    while !model.terminal(&s) && episode.max_time_step() < max_steps {
        let a = policy.action(&s)?;
        let t = model.sample_outcome(&s, &a, rng)?;
        episode.record(a, t.reward, t.next_state.clone());
        s = t.next_state;
    }
    Ok(episode)
}

/// Resets `env` and follows `policy` until termination or `max_steps`.
pub fn rollout_env<S: Clone, A: Clone>(
    env: &mut dyn Env<S, A>,
    policy: &mut dyn Policy<S, A>,
    max_steps: usize,
) -> Result<Episode<S, A>> {
    let mut s = env.reset();
    let mut episode = Episode::new(s.clone());
    let mut terminated = env.is_terminal();
    while !terminated && episode.max_time_step() < max_steps {
        let a = policy.action(&s)?;
        let (next, reward, done) = env.step(a.clone())?;
        episode.record(a, reward, next.clone());
        s = next;
        terminated = done;
    }
    Ok(episode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discounted_return_folds_from_the_end() {
        let mut e: Episode<u8, u8> = Episode::new(0);
        e.record(0, 1.0, 1);
        e.record(0, 1.0, 2);
        e.record(0, 10.0, 3);
        assert_eq!(e.max_time_step(), 3);
        assert_eq!(e.total_reward(), 12.0);
        assert!((e.discounted_return(0.5) - (1.0 + 0.5 + 2.5)).abs() < 1e-12);
    }

    #[test]
    fn extend_skips_the_shared_state() {
        let mut e: Episode<u8, char> = Episode::new(0);
        e.record('a', -1.0, 1);
        let mut tail = Episode::new(1);
        tail.record('b', -1.0, 2);
        e.extend(tail);
        assert_eq!(e.states, vec![0, 1, 2]);
        assert_eq!(e.actions, vec!['a', 'b']);
    }
}
