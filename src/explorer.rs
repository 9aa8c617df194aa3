use std::io::{BufRead, Write};

use crate::env::{Env, GridAction, GridState};
use crate::episode::Episode;
use crate::error::Result;

/// Key bindings of the terminal explorer.
pub fn key_action(key: char) -> Option<GridAction> {
    match key {
        'w' => Some(GridAction::North),
        's' => Some(GridAction::South),
        'd' => Some(GridAction::East),
        'a' => Some(GridAction::West),
        _ => None,
    }
}

/// Drives `env` from keyboard lines: `w`/`a`/`s`/`d` move the agent, `r`
/// closes the current episode and starts a new one, `q` quits. An episode
/// is also closed when the environment reaches a terminal state. Every
/// closed episode with at least one step is returned.
pub fn explore(
    env: &mut dyn Env<GridState, GridAction>,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<Vec<Episode<GridState, GridAction>>> {
    let mut episodes = vec![];
    let mut episode = Episode::new(env.reset());
    writeln!(output, "{}", env.render())?;
    writeln!(output, "w/a/s/d to move, r to record and restart, q to quit")?;

    let mut line = String::new();
    'session: loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        for key in line.trim().chars() {
            if key == 'q' {
                break 'session;
            }
            if key == 'r' {
                finish(&mut episodes, &mut episode, env.reset());
                writeln!(output, "episode {} recorded", episodes.len())?;
                writeln!(output, "{}", env.render())?;
                continue;
            }
            let action = match key_action(key) {
                Some(a) => a,
                None => {
                    writeln!(output, "unknown key {:?}", key)?;
                    continue;
                }
            };
            let (next, reward, terminated) = env.step(action)?;
            episode.record(action, reward, next);
            writeln!(output, "{}", env.render())?;
            writeln!(output, "{} reward {}", action.label(), reward)?;
            if terminated {
                writeln!(output, "terminal state reached")?;
                finish(&mut episodes, &mut episode, env.reset());
                writeln!(output, "episode {} recorded", episodes.len())?;
                writeln!(output, "{}", env.render())?;
            }
        }
    }
    finish(&mut episodes, &mut episode, env.current_observation());
    tracing::info!(count = episodes.len(), "exploration finished");
    Ok(episodes)
}

fn finish(
    episodes: &mut Vec<Episode<GridState, GridAction>>,
    episode: &mut Episode<GridState, GridAction>,
    next_start: GridState,
) {
    let done = std::mem::replace(episode, Episode::new(next_start));
    if done.max_time_step() > 0 {
        episodes.push(done);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::env::{GridWorld, SimulatedEnv};

    #[test]
    fn keys_are_recorded_as_episodes() {
        let gw = GridWorld::empty(3, 3).with_goal(2, 0);
        let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), 0);
        let mut input = Cursor::new("dw\nr\nxdd\nw\n");
        let mut output: Vec<u8> = vec![];
        let episodes = explore(&mut env, &mut input, &mut output).unwrap();

        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].actions, vec![GridAction::East, GridAction::North]);
        assert_eq!(episodes[0].last_state(), Some(&GridState::new(1, 1)));
        // the goal closes the second episode
        assert_eq!(episodes[1].max_time_step(), 2);
        assert_eq!(episodes[1].last_state(), Some(&GridState::new(2, 0)));
        assert_eq!(episodes[2].states, vec![GridState::new(0, 0), GridState::new(0, 1)]);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("unknown key 'x'"));
        assert!(text.contains("terminal state reached"));
    }

    #[test]
    fn quit_keeps_the_episode_in_progress() {
        let gw = GridWorld::empty(3, 3);
        let mut env = SimulatedEnv::new(gw, GridState::new(0, 0), 0);
        let mut input = Cursor::new("d\nq\nd\n");
        let mut output: Vec<u8> = vec![];
        let episodes = explore(&mut env, &mut input, &mut output).unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].max_time_step(), 1);
    }
}
