//! Greedy-policy evaluation over multiple episodes.

use std::fmt;

use crate::agent::QLearningAgent;
use crate::environment::DroneEnv;
use crate::error::EnvError;

/// Aggregated evaluation metrics over multiple greedy episodes.
///
/// The agent runs with `training = false`, so no exploration and no
/// learning take place.
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    /// Mean total reward per episode.
    pub mean_reward: f64,
    /// Mean steps per episode.
    pub mean_steps: f64,
    /// Fraction of episodes that completed every delivery.
    pub completion_rate: f64,
    /// Mean battery remaining at episode end.
    pub mean_battery_left: f64,
    /// Number of episodes evaluated.
    pub n_episodes: usize,
}

impl EvaluationMetrics {
    /// Evaluates the agent's greedy policy over `n_episodes` episodes.
    pub fn evaluate(
        env: &mut DroneEnv,
        agent: &mut QLearningAgent,
        n_episodes: usize,
    ) -> Result<Self, EnvError> {
        let mut total_reward = 0.0;
        let mut total_steps = 0u64;
        let mut completed = 0usize;
        let mut total_battery = 0i64;

        for _ in 0..n_episodes {
            let mut state = env.reset();
            loop {
                let action = agent.select_action(state, false);
                let outcome = env.step(action)?;
                state = outcome.state;
                if outcome.done {
                    break;
                }
            }
            total_reward += env.total_reward;
            total_steps += env.steps as u64;
            total_battery += env.battery as i64;
            if env.all_delivered() {
                completed += 1;
            }
        }

        let n = n_episodes.max(1) as f64;
        Ok(Self {
            mean_reward: total_reward / n,
            mean_steps: total_steps as f64 / n,
            completion_rate: completed as f64 / n,
            mean_battery_left: total_battery as f64 / n,
            n_episodes,
        })
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Evaluation ({} episodes) ===", self.n_episodes)?;
        writeln!(f, "  Mean reward:       {:.2}", self.mean_reward)?;
        writeln!(f, "  Mean steps:        {:.1}", self.mean_steps)?;
        writeln!(f, "  Completion rate:   {:.1}%", self.completion_rate * 100.0)?;
        writeln!(f, "  Mean battery left: {:.1}%", self.mean_battery_left)
    }
}
