//! Sequential episode orchestration.
//!
//! Drives repeated (environment, agent) interaction for a configured
//! number of episodes on the caller's thread. Observers receive progress
//! and completion events through a callback trait; cancellation is
//! cooperative and checked between steps, never mid-step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::agent::QLearningAgent;
use crate::environment::DroneEnv;
use crate::error::EnvError;

/// Pacing of live state-change notifications during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingMode {
    /// Notify every `update_interval` steps, no delay.
    Fast,
    /// Notify every step, sleeping `step_delay` in between.
    Human,
}

/// Configuration for a training run.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of episodes to run.
    pub episodes: u32,
    /// Live-observation pacing.
    pub mode: TrainingMode,
    /// State-change notification cadence in `Fast` mode, in steps.
    pub update_interval: u32,
    /// Per-step delay in `Human` mode.
    pub step_delay: Duration,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 5000,
            mode: TrainingMode::Fast,
            update_interval: 10,
            step_delay: Duration::from_millis(100),
        }
    }
}

/// Per-episode progress record emitted after each completed episode.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeProgress {
    /// 1-based episode number.
    pub episode: u32,
    /// Total reward collected this episode.
    pub reward: f64,
    /// Steps taken this episode.
    pub steps: u32,
    /// Exploration rate after this episode's decay.
    pub epsilon: f64,
}

/// Full training history, delivered on completion.
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    /// Total reward per completed episode.
    pub rewards_per_episode: Vec<f64>,
    /// Step count per completed episode.
    pub steps_per_episode: Vec<u32>,
    /// Number of episodes that actually ran (may be short of the
    /// configured count after an early stop).
    pub episodes_completed: u32,
}

/// Observer for training events. All methods default to no-ops, so a run
/// works with no observer logic attached.
///
/// Events carry copies or are payload-free; observers read environment
/// state between steps only and never mutate shared state.
pub trait TrainingObserver {
    /// One episode finished.
    fn on_progress(&mut self, _progress: EpisodeProgress) {}

    /// The environment state changed; re-read it if rendering.
    fn on_state_change(&mut self) {}

    /// The run finished (all episodes done, or stopped early).
    fn on_complete(&mut self, _report: &TrainingReport) {}
}

/// A no-op observer for headless training runs.
#[derive(Debug, Default)]
pub struct NullObserver;

impl TrainingObserver for NullObserver {}

/// Shared cooperative-cancellation flag.
///
/// Cloning yields a handle to the same flag, so a caller can keep one
/// handle and hand the trainer another. A stop request takes effect
/// within one environment step; a partially applied transition is never
/// abandoned.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs training episodes sequentially over one environment/agent pair.
#[derive(Debug)]
pub struct Trainer {
    config: TrainingConfig,
    stop: StopFlag,
}

impl Trainer {
    /// Creates a trainer with the given run configuration.
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            stop: StopFlag::new(),
        }
    }

    /// A handle to this trainer's cancellation flag.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Runs the configured number of episodes.
    ///
    /// Each episode: reset, then select/step/learn until the environment
    /// reports done or a stop is requested, then decay epsilon and emit a
    /// progress event. The completion event carries the full history.
    pub fn run(
        &self,
        env: &mut DroneEnv,
        agent: &mut QLearningAgent,
        observer: &mut dyn TrainingObserver,
    ) -> Result<TrainingReport, EnvError> {
        info!(
            "starting training: {} episodes, mode {:?}",
            self.config.episodes, self.config.mode
        );
        let mut report = TrainingReport::default();

        for episode in 0..self.config.episodes {
            if self.stop.is_stopped() {
                break;
            }

            let mut state = env.reset();
            let mut total_reward = 0.0;
            let mut episode_steps = 0u32;
            observer.on_state_change();

            loop {
                let action = agent.select_action(state, true);
                let outcome = env.step(action)?;
                agent.learn(state, action, outcome.reward, outcome.state, outcome.done);

                state = outcome.state;
                total_reward += outcome.reward;
                episode_steps += 1;

                match self.config.mode {
                    TrainingMode::Human => {
                        observer.on_state_change();
                        std::thread::sleep(self.config.step_delay);
                    }
                    TrainingMode::Fast => {
                        if episode_steps % self.config.update_interval == 0 {
                            observer.on_state_change();
                        }
                    }
                }

                if outcome.done || self.stop.is_stopped() {
                    break;
                }
            }

            agent.decay_epsilon();
            report.rewards_per_episode.push(total_reward);
            report.steps_per_episode.push(env.steps);
            report.episodes_completed += 1;

            observer.on_state_change();
            let progress = EpisodeProgress {
                episode: episode + 1,
                reward: total_reward,
                steps: env.steps,
                epsilon: agent.epsilon,
            };
            debug!(
                "episode {}: reward {:.2}, steps {}, epsilon {:.4}",
                progress.episode, progress.reward, progress.steps, progress.epsilon
            );
            observer.on_progress(progress);
        }

        info!(
            "training finished after {} episodes",
            report.episodes_completed
        );
        observer.on_complete(&report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, EnvConfig};

    fn quick_setup() -> (DroneEnv, QLearningAgent) {
        let env = DroneEnv::new(
            EnvConfig {
                max_steps: 30,
                ..EnvConfig::default()
            },
            42,
        );
        let agent = QLearningAgent::new(AgentConfig::default(), 42);
        (env, agent)
    }

    #[derive(Default)]
    struct CountingObserver {
        progress_events: u32,
        state_changes: u32,
        completions: u32,
        last_report_len: usize,
    }

    impl TrainingObserver for CountingObserver {
        fn on_progress(&mut self, _p: EpisodeProgress) {
            self.progress_events += 1;
        }
        fn on_state_change(&mut self) {
            self.state_changes += 1;
        }
        fn on_complete(&mut self, report: &TrainingReport) {
            self.completions += 1;
            self.last_report_len = report.rewards_per_episode.len();
        }
    }

    #[test]
    fn run_records_full_history() {
        let (mut env, mut agent) = quick_setup();
        let trainer = Trainer::new(TrainingConfig {
            episodes: 5,
            ..TrainingConfig::default()
        });
        let mut observer = CountingObserver::default();
        let report = trainer.run(&mut env, &mut agent, &mut observer).unwrap();

        assert_eq!(report.episodes_completed, 5);
        assert_eq!(report.rewards_per_episode.len(), 5);
        assert_eq!(report.steps_per_episode.len(), 5);
        assert_eq!(observer.progress_events, 5);
        assert_eq!(observer.completions, 1);
        assert_eq!(observer.last_report_len, 5);
        assert!(observer.state_changes >= 10); // start + end of each episode
    }

    #[test]
    fn epsilon_decays_once_per_episode() {
        let (mut env, mut agent) = quick_setup();
        let trainer = Trainer::new(TrainingConfig {
            episodes: 3,
            ..TrainingConfig::default()
        });
        trainer
            .run(&mut env, &mut agent, &mut NullObserver)
            .unwrap();
        let expected = 1.0 * 0.995_f64.powi(3);
        assert!((agent.epsilon - expected).abs() < 1e-12);
    }

    #[test]
    fn runs_with_no_observer_logic_attached() {
        let (mut env, mut agent) = quick_setup();
        let trainer = Trainer::new(TrainingConfig {
            episodes: 2,
            ..TrainingConfig::default()
        });
        let report = trainer.run(&mut env, &mut agent, &mut NullObserver).unwrap();
        assert_eq!(report.episodes_completed, 2);
    }

    #[test]
    fn pre_set_stop_flag_prevents_any_episode() {
        let (mut env, mut agent) = quick_setup();
        let trainer = Trainer::new(TrainingConfig {
            episodes: 100,
            ..TrainingConfig::default()
        });
        trainer.stop_flag().stop();
        let report = trainer.run(&mut env, &mut agent, &mut NullObserver).unwrap();
        assert_eq!(report.episodes_completed, 0);
        assert!(report.rewards_per_episode.is_empty());
    }

    #[test]
    fn stop_mid_run_halts_promptly() {
        struct StopAfterFirst {
            flag: StopFlag,
        }
        impl TrainingObserver for StopAfterFirst {
            fn on_progress(&mut self, _p: EpisodeProgress) {
                self.flag.stop();
            }
        }

        let (mut env, mut agent) = quick_setup();
        let trainer = Trainer::new(TrainingConfig {
            episodes: 100,
            ..TrainingConfig::default()
        });
        let mut observer = StopAfterFirst {
            flag: trainer.stop_flag(),
        };
        let report = trainer.run(&mut env, &mut agent, &mut observer).unwrap();
        assert_eq!(report.episodes_completed, 1);
    }

    #[test]
    fn learning_populates_q_table() {
        let (mut env, mut agent) = quick_setup();
        let trainer = Trainer::new(TrainingConfig {
            episodes: 10,
            ..TrainingConfig::default()
        });
        trainer
            .run(&mut env, &mut agent, &mut NullObserver)
            .unwrap();
        assert!(agent.n_states() > 0);
        assert!(agent.replay_len() > 0);
    }
}
