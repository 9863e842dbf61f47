//! Configuration for the environment and the learning agent.

/// Smallest supported grid edge length.
pub const MIN_GRID_SIZE: u8 = 3;
/// Largest supported grid edge length.
pub const MAX_GRID_SIZE: u8 = 7;

/// Configuration for the drone delivery environment.
///
/// Battery costs and the step limit set the scale of the reward signal,
/// so changing them changes what the agent converges to.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Grid edge length, in `[MIN_GRID_SIZE, MAX_GRID_SIZE]`.
    pub grid_size: u8,
    /// Episode step limit.
    pub max_steps: u32,
    /// Battery drained by one successful move.
    pub move_battery_cost: i32,
    /// Battery drained by taking off.
    pub takeoff_battery_cost: i32,
    /// Battery drained by landing.
    pub landing_battery_cost: i32,
}

impl EnvConfig {
    /// Creates a configuration for the given grid size with default costs.
    pub fn with_grid_size(grid_size: u8) -> Self {
        Self {
            grid_size,
            ..Self::default()
        }
    }

    /// True if the grid size falls within the supported range.
    pub fn is_valid(&self) -> bool {
        (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) && self.max_steps > 0
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            max_steps: 100,
            move_battery_cost: 1,
            takeoff_battery_cost: 5,
            landing_battery_cost: 5,
        }
    }
}

/// Hyperparameters for the tabular Q-learning agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Initial exploration rate.
    pub epsilon: f64,
    /// Multiplicative epsilon decay applied once per episode.
    pub epsilon_decay: f64,
    /// Exploration floor.
    pub min_epsilon: f64,
    /// Replay buffer capacity (FIFO eviction beyond this).
    pub buffer_capacity: usize,
    /// Number of experiences sampled per replay pass.
    pub batch_size: usize,
    /// A replay pass runs every this many `learn` calls.
    pub learn_interval: u64,
    /// Learning-rate scale applied during replay updates.
    pub replay_alpha_scale: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.99,
            epsilon: 1.0,
            epsilon_decay: 0.995,
            min_epsilon: 0.01,
            buffer_capacity: 1000,
            batch_size: 32,
            learn_interval: 4,
            replay_alpha_scale: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_env_config_is_valid() {
        let cfg = EnvConfig::default();
        assert!(cfg.is_valid());
        assert_eq!(cfg.grid_size, 5);
        assert_eq!(cfg.max_steps, 100);
    }

    #[test]
    fn grid_size_bounds_checked() {
        assert!(!EnvConfig::with_grid_size(2).is_valid());
        assert!(EnvConfig::with_grid_size(3).is_valid());
        assert!(EnvConfig::with_grid_size(7).is_valid());
        assert!(!EnvConfig::with_grid_size(8).is_valid());
    }

    #[test]
    fn default_agent_config_matches_reference_constants() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.alpha, 0.1);
        assert_eq!(cfg.gamma, 0.99);
        assert_eq!(cfg.epsilon, 1.0);
        assert_eq!(cfg.buffer_capacity, 1000);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.learn_interval, 4);
    }
}
