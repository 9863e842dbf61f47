//! The drone delivery environment.
//!
//! A Mealy-style state machine over a small grid: deterministic transitions,
//! stochastic resets. Two orthogonal modes (`is_flying`, `has_cargo`) gate
//! which actions are effective, and a dense shaping reward is layered on top
//! of the primary action rewards.
//!
//! # Lifecycle
//!
//! 1. Call [`DroneEnv::new`] with configuration and seed.
//! 2. Call [`DroneEnv::reset`] at the start of every episode.
//! 3. Repeatedly call [`DroneEnv::step`] until the outcome reports `done`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EnvConfig;
use crate::error::EnvError;
use crate::state::{StateKey, MAX_DELIVERIES};
use crate::types::{corners, Action, Position, ACTION_COUNT, DEPOT_CORNER};

/// Why an episode ended. When several checks fire in the same step the
/// later one wins (completion is checked last).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    BatteryExhausted,
    StepLimitReached,
    AllDelivered,
}

impl std::fmt::Display for DoneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoneReason::BatteryExhausted => write!(f, "battery exhausted"),
            DoneReason::StepLimitReached => write!(f, "step limit reached"),
            DoneReason::AllDelivered => write!(f, "all deliveries completed"),
        }
    }
}

/// Cosmetic take-off/landing animation phase. Has no effect on rewards,
/// transitions, or termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Landed,
    TakingOff,
    Flying,
    Landing,
}

/// Descriptive metadata attached to a step outcome.
#[derive(Debug, Clone)]
pub struct StepInfo {
    /// The action that was applied.
    pub action: Action,
    /// Human-readable note for rejected or landmark actions.
    pub note: Option<String>,
    /// Present when a termination check fired this step.
    pub done_reason: Option<DoneReason>,
}

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// State key after the step.
    pub state: StateKey,
    /// Reward collected this step (primary + shaping + termination deltas).
    pub reward: f64,
    /// Whether the episode is over.
    pub done: bool,
    /// Step metadata.
    pub info: StepInfo,
}

/// The grid-world drone delivery environment.
///
/// Owns the ground-truth world state; only [`DroneEnv::reset`] and
/// [`DroneEnv::step`] mutate it. Randomness comes from an owned, seedable
/// RNG so trajectories are reproducible under a fixed seed.
#[derive(Debug)]
pub struct DroneEnv {
    /// Environment configuration.
    pub config: EnvConfig,
    /// Drone position.
    pub drone_pos: Position,
    /// Cargo depot cell (always the bottom-right corner).
    pub depot: Position,
    /// Active delivery points, in selection order.
    pub delivery_points: Vec<Position>,
    /// Corner indices of the active delivery points.
    pub delivery_indices: Vec<u8>,
    /// Per-delivery completion flags, parallel to `delivery_points`.
    pub delivered: Vec<bool>,
    /// Whether the drone is carrying cargo.
    pub has_cargo: bool,
    /// Whether the drone is airborne.
    pub is_flying: bool,
    /// Battery percentage in `[0, 100]`.
    pub battery: i32,
    /// Steps taken this episode.
    pub steps: u32,
    /// Whether the episode is over.
    pub done: bool,
    /// Cosmetic animation phase.
    pub flight_phase: FlightPhase,
    /// Ticks elapsed in the current take-off/landing animation.
    pub phase_tick: u8,
    /// Reward collected by the most recent step.
    pub last_reward: f64,
    /// Cumulative reward this episode.
    pub total_reward: f64,
    rng: StdRng,
    seed: u64,
}

impl DroneEnv {
    /// Creates a new environment and resets it into its first episode.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid (grid size outside 3..=7).
    pub fn new(config: EnvConfig, seed: u64) -> Self {
        assert!(config.is_valid(), "invalid environment config: {config:?}");
        let max = config.grid_size - 1;
        let mut env = Self {
            depot: Position::new(max, max),
            config,
            drone_pos: Position::new(0, 0),
            delivery_points: Vec::new(),
            delivery_indices: Vec::new(),
            delivered: Vec::new(),
            has_cargo: false,
            is_flying: false,
            battery: 100,
            steps: 0,
            done: false,
            flight_phase: FlightPhase::Landed,
            phase_tick: 0,
            last_reward: 0.0,
            total_reward: 0.0,
            rng: StdRng::seed_from_u64(seed),
            seed,
        };
        env.reset();
        env
    }

    /// Number of discrete actions.
    pub fn action_space(&self) -> usize {
        ACTION_COUNT
    }

    /// Starts a new episode: random drone start, fresh delivery draw,
    /// full battery, landed, cargo-less. Returns the initial state key.
    pub fn reset(&mut self) -> StateKey {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.seed += 1; // different draw each episode

        let grid = self.config.grid_size;
        self.drone_pos = Position::new(
            self.rng.gen_range(0..grid),
            self.rng.gen_range(0..grid),
        );

        // 1-3 delivery points drawn without replacement from the three
        // non-depot corners, selection order preserved.
        let n = self.rng.gen_range(1..=MAX_DELIVERIES);
        let corner_cells = corners(grid);
        let chosen = rand::seq::index::sample(&mut self.rng, DEPOT_CORNER as usize, n);
        self.delivery_indices = chosen.iter().map(|i| i as u8).collect();
        self.delivery_points = self
            .delivery_indices
            .iter()
            .map(|&i| corner_cells[i as usize])
            .collect();
        self.delivered = vec![false; n];

        self.has_cargo = false;
        self.is_flying = false;
        self.battery = 100;
        self.steps = 0;
        self.done = false;
        self.flight_phase = FlightPhase::Landed;
        self.phase_tick = 0;
        self.last_reward = 0.0;
        self.total_reward = 0.0;

        self.state_key()
    }

    /// Encodes the current episode state as a Q-table key.
    pub fn state_key(&self) -> StateKey {
        StateKey::new(
            self.drone_pos.row,
            self.drone_pos.col,
            self.has_cargo,
            self.is_flying,
            &self.delivered,
            self.battery,
            &self.delivery_indices,
        )
    }

    /// Applies one action and advances the episode.
    ///
    /// An out-of-range action index is a contract violation and returns
    /// [`EnvError::InvalidAction`] without touching the state. Stepping a
    /// finished episode is a defined no-op: the terminal state is returned
    /// with reward 0 and `done = true`.
    pub fn step(&mut self, action: usize) -> Result<StepOutcome, EnvError> {
        let action = Action::from_index(action).ok_or(EnvError::InvalidAction { action })?;

        if self.done {
            return Ok(StepOutcome {
                state: self.state_key(),
                reward: 0.0,
                done: true,
                info: StepInfo {
                    action,
                    note: Some("episode already finished".to_string()),
                    done_reason: None,
                },
            });
        }

        let old_pos = self.drone_pos;
        let mut reward = 0.0;
        let mut note: Option<String> = None;
        let mut done_reason: Option<DoneReason> = None;

        match action {
            Action::MoveDown | Action::MoveRight | Action::MoveUp | Action::MoveLeft => {
                if !self.is_flying {
                    reward -= 2.0;
                    note = Some("cannot move while landed".to_string());
                } else {
                    self.drone_pos = old_pos.moved(action, self.config.grid_size);
                    if self.drone_pos == old_pos {
                        reward -= 5.0;
                        note = Some("blocked by grid boundary".to_string());
                    } else {
                        reward -= 1.0;
                        self.battery -= self.config.move_battery_cost;
                    }
                }
            }
            Action::CargoToggle => {
                if self.is_flying {
                    reward -= 10.0;
                    note = Some("cargo can only be handled while landed".to_string());
                } else if self.drone_pos == self.depot && !self.has_cargo {
                    self.has_cargo = true;
                    reward += 50.0;
                    note = Some("cargo picked up".to_string());
                } else if self.has_cargo {
                    let hit = self
                        .delivery_points
                        .iter()
                        .zip(self.delivered.iter())
                        .position(|(&p, &d)| p == self.drone_pos && !d);
                    match hit {
                        Some(i) => {
                            self.delivered[i] = true;
                            self.has_cargo = false;
                            reward += 200.0;
                            note = Some(format!("delivery {} completed", i + 1));
                        }
                        None => {
                            reward -= 30.0;
                            note = Some("wrong place for a delivery".to_string());
                        }
                    }
                } else {
                    reward -= 30.0;
                    note = Some("nothing to pick up or deliver here".to_string());
                }
            }
            Action::FlightToggle => {
                if !self.is_flying {
                    self.is_flying = true;
                    self.flight_phase = FlightPhase::TakingOff;
                    self.phase_tick = 0;
                    self.battery -= self.config.takeoff_battery_cost;
                    reward -= 3.0;
                    note = Some("taking off".to_string());
                } else {
                    self.is_flying = false;
                    self.flight_phase = FlightPhase::Landing;
                    self.phase_tick = 0;
                    self.battery -= self.config.landing_battery_cost;
                    reward -= 3.0;
                    note = Some("landing".to_string());
                }
            }
        }

        // Shaping: progress toward the current target, judged against the
        // post-action state.
        if let Some(target) = self.shaping_target() {
            let old_dist = old_pos.manhattan(target);
            let new_dist = self.drone_pos.manhattan(target);
            if self.is_flying && new_dist < old_dist {
                reward += 5.0;
            } else if self.is_flying && new_dist > old_dist {
                reward -= 2.0;
            }
            if self.drone_pos == target {
                if !self.is_flying && action == Action::CargoToggle {
                    reward += 10.0;
                } else if !self.is_flying && action == Action::FlightToggle {
                    reward += 5.0; // correct landing at the target
                }
            }
        }

        // Termination checks are independent and their deltas stack;
        // completion runs last so a final delivery still collects its bonus.
        if self.battery <= 0 {
            self.battery = 0;
            reward -= 100.0;
            self.done = true;
            done_reason = Some(DoneReason::BatteryExhausted);
        }

        self.steps += 1;
        if self.steps >= self.config.max_steps {
            reward -= 50.0;
            self.done = true;
            done_reason = Some(DoneReason::StepLimitReached);
        }

        if self.all_delivered() {
            reward += 200.0 + self.battery as f64;
            self.done = true;
            done_reason = Some(DoneReason::AllDelivered);
        }

        self.tick_animation();

        self.last_reward = reward;
        self.total_reward += reward;

        Ok(StepOutcome {
            state: self.state_key(),
            reward,
            done: self.done,
            info: StepInfo {
                action,
                note,
                done_reason,
            },
        })
    }

    /// True once every active delivery point has been served.
    pub fn all_delivered(&self) -> bool {
        self.delivered.iter().all(|&d| d)
    }

    /// The cell the shaping reward steers toward: the depot while cargo is
    /// not held and deliveries remain, otherwise the nearest undelivered
    /// point while cargo is held. Equidistant points tie-break to the
    /// first-selected one.
    fn shaping_target(&self) -> Option<Position> {
        if !self.has_cargo && !self.all_delivered() {
            Some(self.depot)
        } else if self.has_cargo {
            self.delivery_points
                .iter()
                .zip(self.delivered.iter())
                .filter(|(_, &d)| !d)
                .map(|(&p, _)| p)
                .min_by_key(|p| self.drone_pos.manhattan(*p))
        } else {
            None
        }
    }

    // Advances the 3-tick take-off/landing animation.
    fn tick_animation(&mut self) {
        match self.flight_phase {
            FlightPhase::TakingOff => {
                self.phase_tick += 1;
                if self.phase_tick >= 3 {
                    self.flight_phase = FlightPhase::Flying;
                }
            }
            FlightPhase::Landing => {
                self.phase_tick += 1;
                if self.phase_tick >= 3 {
                    self.flight_phase = FlightPhase::Landed;
                }
            }
            FlightPhase::Landed | FlightPhase::Flying => {}
        }
    }
}
