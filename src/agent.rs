//! Tabular Q-learning agent with experience replay.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AgentConfig;
use crate::error::PersistenceError;
use crate::replay::{Experience, ReplayBuffer};
use crate::state::StateKey;
use crate::types::ACTION_COUNT;

/// Action-value estimates for one state, indexed by action.
pub type ActionValues = [f64; ACTION_COUNT];

const ZERO_VALUES: ActionValues = [0.0; ACTION_COUNT];

/// Epsilon-greedy tabular Q-learning agent.
///
/// The Q-table is lazily populated: looking up an unseen state inserts a
/// zero vector before use. The table and the replay buffer persist across
/// episodes for the lifetime of the agent.
#[derive(Debug)]
pub struct QLearningAgent {
    /// Learning hyperparameters.
    pub config: AgentConfig,
    /// Current exploration rate.
    pub epsilon: f64,
    q_table: HashMap<StateKey, ActionValues>,
    replay: ReplayBuffer,
    step_counter: u64,
    rng: StdRng,
}

impl QLearningAgent {
    /// Creates a new agent with the given hyperparameters and RNG seed.
    pub fn new(config: AgentConfig, seed: u64) -> Self {
        Self {
            epsilon: config.epsilon,
            replay: ReplayBuffer::new(config.buffer_capacity),
            q_table: HashMap::new(),
            step_counter: 0,
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }

    /// Selects an action for `state`.
    ///
    /// With probability `epsilon` (only while `training`) a uniformly
    /// random action is returned. Otherwise the maximizing action wins,
    /// with ties broken uniformly at random among all maximizers.
    pub fn select_action(&mut self, state: StateKey, training: bool) -> usize {
        if training && self.rng.gen::<f64>() < self.epsilon {
            return self.rng.gen_range(0..ACTION_COUNT);
        }
        let values = *self.q_table.entry(state).or_insert(ZERO_VALUES);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let maximizers: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == max)
            .map(|(i, _)| i)
            .collect();
        maximizers[self.rng.gen_range(0..maximizers.len())]
    }

    /// Records a transition and applies the Bellman update.
    ///
    /// Every `learn_interval` calls, once the buffer holds at least
    /// `batch_size` experiences, a replay pass re-applies the update to a
    /// uniformly sampled batch at a reduced learning rate. With fewer
    /// buffered experiences the pass is skipped silently (warm-up).
    pub fn learn(
        &mut self,
        state: StateKey,
        action: usize,
        reward: f64,
        next_state: StateKey,
        done: bool,
    ) {
        self.replay.push(Experience {
            state,
            action,
            reward,
            next_state,
            done,
        });

        self.apply_update(state, action, reward, next_state, done, self.config.alpha);

        self.step_counter += 1;
        if self.step_counter % self.config.learn_interval == 0
            && self.replay.len() >= self.config.batch_size
        {
            self.experience_replay();
        }
    }

    fn experience_replay(&mut self) {
        let replay_alpha = self.config.alpha * self.config.replay_alpha_scale;
        let batch = self.replay.sample(&mut self.rng, self.config.batch_size);
        for e in batch {
            self.apply_update(e.state, e.action, e.reward, e.next_state, e.done, replay_alpha);
        }
    }

    // The Bellman update, in place:
    // Q[s][a] += alpha * (r + (done ? 0 : gamma * max Q[s']) - Q[s][a])
    fn apply_update(
        &mut self,
        state: StateKey,
        action: usize,
        reward: f64,
        next_state: StateKey,
        done: bool,
        alpha: f64,
    ) {
        let gamma = self.config.gamma;
        let max_future = if done {
            0.0
        } else {
            self.q_table
                .entry(next_state)
                .or_insert(ZERO_VALUES)
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
        };
        let values = self.q_table.entry(state).or_insert(ZERO_VALUES);
        let current = values[action];
        values[action] = current + alpha * (reward + gamma * max_future - current);
    }

    /// Decays epsilon toward the configured floor. Called once per
    /// completed episode, never mid-episode.
    pub fn decay_epsilon(&mut self) {
        self.epsilon = self.config.min_epsilon.max(self.epsilon * self.config.epsilon_decay);
    }

    /// Action-value vector for a state, if the state has been seen.
    pub fn q_values(&self, state: &StateKey) -> Option<&ActionValues> {
        self.q_table.get(state)
    }

    /// Number of distinct states in the Q-table.
    pub fn n_states(&self) -> usize {
        self.q_table.len()
    }

    /// Number of experiences currently buffered.
    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    /// Serializes the entire Q-table to a JSON file.
    pub fn save_q_table(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let entries: Vec<(&StateKey, &ActionValues)> = self.q_table.iter().collect();
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &entries)?;
        info!("saved Q-table ({} states) to {}", entries.len(), path.display());
        Ok(())
    }

    /// Replaces the Q-table wholesale with the contents of a JSON file.
    ///
    /// All-or-nothing: the file is parsed completely before the existing
    /// table is touched, so a missing, unreadable, or structurally
    /// incompatible file leaves the agent unmodified.
    pub fn load_q_table(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let entries: Vec<(StateKey, ActionValues)> = serde_json::from_reader(BufReader::new(file))?;
        self.q_table = entries.into_iter().collect();
        info!("loaded Q-table ({} states) from {}", self.q_table.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: u8) -> StateKey {
        StateKey::new(tag % 5, (tag / 5) % 5, tag % 2 == 0, false, &[false], 100, &[0])
    }

    fn make_agent(seed: u64) -> QLearningAgent {
        QLearningAgent::new(AgentConfig::default(), seed)
    }

    #[test]
    fn bellman_update_is_exact() {
        let mut agent = make_agent(0);
        let (s, s2) = (key(1), key(2));
        agent.learn(s, 2, 10.0, s2, false);
        // All values start at zero: Q = 0 + 0.1 * (10 + 0.99 * 0 - 0).
        let q = agent.q_values(&s).unwrap()[2];
        assert!((q - 1.0).abs() < 1e-12);

        agent.learn(s, 2, 10.0, s2, false);
        let expected = 1.0 + 0.1 * (10.0 + 0.99 * 0.0 - 1.0);
        let q = agent.q_values(&s).unwrap()[2];
        assert!((q - expected).abs() < 1e-12);
    }

    #[test]
    fn terminal_update_ignores_future_value() {
        let mut agent = make_agent(0);
        let (s, s2) = (key(3), key(4));
        // Give the successor a large value; done must zero it out.
        agent.learn(s2, 0, 100.0, key(5), true);
        agent.learn(s, 1, 5.0, s2, true);
        let q = agent.q_values(&s).unwrap()[1];
        assert!((q - 0.1 * 5.0).abs() < 1e-12);
    }

    #[test]
    fn unseen_state_auto_initializes_to_zeros() {
        let mut agent = make_agent(1);
        let s = key(9);
        assert!(agent.q_values(&s).is_none());
        let action = agent.select_action(s, false);
        assert!(action < ACTION_COUNT);
        assert_eq!(agent.q_values(&s), Some(&ZERO_VALUES));
    }

    #[test]
    fn greedy_selection_takes_argmax() {
        let mut agent = make_agent(2);
        let s = key(1);
        agent.q_table.insert(s, [0.0, 0.0, 5.0, 0.0, 0.0, 0.0]);
        for _ in 0..50 {
            assert_eq!(agent.select_action(s, false), 2);
        }
    }

    #[test]
    fn ties_break_uniformly_among_maximizers() {
        let mut agent = make_agent(3);
        let s = key(1);
        agent.q_table.insert(s, [7.0, 0.0, 7.0, 0.0, 0.0, 0.0]);
        let mut counts = [0u32; ACTION_COUNT];
        for _ in 0..400 {
            counts[agent.select_action(s, false)] += 1;
        }
        assert!(counts[0] > 0, "maximizer 0 never chosen");
        assert!(counts[2] > 0, "maximizer 2 never chosen");
        assert_eq!(counts[1] + counts[3] + counts[4] + counts[5], 0);
    }

    #[test]
    fn evaluation_mode_never_explores() {
        let mut agent = make_agent(4);
        agent.epsilon = 1.0;
        let s = key(1);
        agent.q_table.insert(s, [0.0, 0.0, 0.0, 9.0, 0.0, 0.0]);
        for _ in 0..100 {
            assert_eq!(agent.select_action(s, false), 3);
        }
    }

    #[test]
    fn epsilon_never_falls_below_floor() {
        let mut agent = make_agent(5);
        for _ in 0..10_000 {
            agent.decay_epsilon();
            assert!(agent.epsilon >= agent.config.min_epsilon);
        }
        assert!((agent.epsilon - agent.config.min_epsilon).abs() < 1e-12);
    }

    #[test]
    fn replay_pass_waits_for_batch_size() {
        let mut agent = make_agent(6);
        // Fewer than batch_size experiences across several intervals:
        // replay must be skipped silently.
        for i in 0..16u8 {
            agent.learn(key(i), 0, 1.0, key(i.wrapping_add(1)), false);
        }
        assert!(agent.replay_len() < agent.config.batch_size);
    }

    #[test]
    fn replay_pass_keeps_values_finite() {
        let config = AgentConfig {
            batch_size: 8,
            learn_interval: 2,
            ..AgentConfig::default()
        };
        let mut agent = QLearningAgent::new(config, 7);
        for i in 0..60u8 {
            agent.learn(key(i % 30), (i % 6) as usize, (i as f64) - 30.0, key((i + 1) % 30), i % 10 == 0);
        }
        for values in agent.q_table.values() {
            assert!(values.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn save_load_roundtrip_preserves_table() {
        let mut agent = make_agent(8);
        for i in 0..40u8 {
            agent.learn(key(i % 20), (i % 6) as usize, i as f64, key((i + 1) % 20), false);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_table.json");
        agent.save_q_table(&path).unwrap();

        let mut restored = make_agent(99);
        restored.load_q_table(&path).unwrap();
        assert_eq!(agent.q_table, restored.q_table);
    }

    #[test]
    fn load_missing_file_leaves_table_intact() {
        let mut agent = make_agent(9);
        agent.learn(key(1), 0, 1.0, key(2), false);
        let before = agent.q_table.clone();
        let err = agent.load_q_table("/nonexistent/q_table.json");
        assert!(matches!(err, Err(PersistenceError::Io(_))));
        assert_eq!(agent.q_table, before);
    }

    #[test]
    fn load_malformed_file_leaves_table_intact() {
        let mut agent = make_agent(10);
        agent.learn(key(1), 0, 1.0, key(2), false);
        let before = agent.q_table.clone();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "{\"not\": \"a q-table\"}").unwrap();

        let err = agent.load_q_table(&path);
        assert!(matches!(err, Err(PersistenceError::Format(_))));
        assert_eq!(agent.q_table, before);
    }
}
