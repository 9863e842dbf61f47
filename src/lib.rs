//! skydrop - grid-world drone delivery with tabular Q-learning.
//!
//! Simulates a delivery drone on a small discrete grid and trains an
//! epsilon-greedy Q-learning agent, with bounded experience replay, to
//! complete pickup-and-delivery tasks under a battery budget.
//!
//! The crate splits into three parts: [`DroneEnv`] owns the world state
//! and its transition/reward rules, [`QLearningAgent`] owns the Q-table
//! and replay buffer, and [`Trainer`] drives episodes sequentially while
//! reporting progress to a [`TrainingObserver`].

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod replay;
pub mod state;
pub mod trainer;
pub mod types;

pub use agent::{ActionValues, QLearningAgent};
pub use config::{AgentConfig, EnvConfig};
pub use environment::{DoneReason, DroneEnv, FlightPhase, StepInfo, StepOutcome};
pub use error::{EnvError, PersistenceError};
pub use metrics::EvaluationMetrics;
pub use replay::{Experience, ReplayBuffer};
pub use state::{battery_bucket, StateKey, MAX_DELIVERIES};
pub use trainer::{
    EpisodeProgress, NullObserver, StopFlag, Trainer, TrainingConfig, TrainingMode,
    TrainingObserver, TrainingReport,
};
pub use types::{corners, Action, Position, ACTION_COUNT, DEPOT_CORNER};
