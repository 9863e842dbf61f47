//! Core types for the drone delivery environment.
//!
//! Defines the discrete action space and integer grid positions used
//! throughout the simulator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of discrete actions available to the drone.
pub const ACTION_COUNT: usize = 6;

/// The drone's discrete action space.
///
/// Movement actions are only effective while flying; cargo handling is
/// only effective while landed. `FlightToggle` switches between the two
/// modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveDown,
    MoveRight,
    MoveUp,
    MoveLeft,
    CargoToggle,
    FlightToggle,
}

impl Action {
    /// Maps an action index in `[0, ACTION_COUNT)` to an [`Action`].
    ///
    /// Returns `None` for out-of-range indices; callers that accept raw
    /// indices must treat that as a contract violation.
    pub fn from_index(index: usize) -> Option<Action> {
        match index {
            0 => Some(Action::MoveDown),
            1 => Some(Action::MoveRight),
            2 => Some(Action::MoveUp),
            3 => Some(Action::MoveLeft),
            4 => Some(Action::CargoToggle),
            5 => Some(Action::FlightToggle),
            _ => None,
        }
    }

    /// Returns the index of this action (inverse of [`Action::from_index`]).
    pub fn index(self) -> usize {
        match self {
            Action::MoveDown => 0,
            Action::MoveRight => 1,
            Action::MoveUp => 2,
            Action::MoveLeft => 3,
            Action::CargoToggle => 4,
            Action::FlightToggle => 5,
        }
    }

    /// Returns all actions in index order.
    pub fn all() -> [Action; ACTION_COUNT] {
        [
            Action::MoveDown,
            Action::MoveRight,
            Action::MoveUp,
            Action::MoveLeft,
            Action::CargoToggle,
            Action::FlightToggle,
        ]
    }

    /// True for the four directional actions.
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            Action::MoveDown | Action::MoveRight | Action::MoveUp | Action::MoveLeft
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::MoveDown => write!(f, "move down"),
            Action::MoveRight => write!(f, "move right"),
            Action::MoveUp => write!(f, "move up"),
            Action::MoveLeft => write!(f, "move left"),
            Action::CargoToggle => write!(f, "cargo pickup/drop"),
            Action::FlightToggle => write!(f, "take off/land"),
        }
    }
}

/// A cell in the grid, `(row, col)` with both components in
/// `[0, grid_size - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Creates a new position.
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another cell.
    pub fn manhattan(&self, other: Position) -> u32 {
        let dr = (self.row as i32 - other.row as i32).unsigned_abs();
        let dc = (self.col as i32 - other.col as i32).unsigned_abs();
        dr + dc
    }

    /// Returns the position after applying a movement action, clamped to
    /// the grid bounds. Non-movement actions leave the position unchanged.
    pub fn moved(self, action: Action, grid_size: u8) -> Position {
        let max = grid_size - 1;
        match action {
            Action::MoveDown => Position::new((self.row + 1).min(max), self.col),
            Action::MoveRight => Position::new(self.row, (self.col + 1).min(max)),
            Action::MoveUp => Position::new(self.row.saturating_sub(1), self.col),
            Action::MoveLeft => Position::new(self.row, self.col.saturating_sub(1)),
            _ => self,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The four fixed corner cells, in corner-index order:
/// top-left, top-right, bottom-left, bottom-right.
pub fn corners(grid_size: u8) -> [Position; 4] {
    let max = grid_size - 1;
    [
        Position::new(0, 0),
        Position::new(0, max),
        Position::new(max, 0),
        Position::new(max, max),
    ]
}

/// Corner index of the cargo depot (permanently the bottom-right corner).
pub const DEPOT_CORNER: u8 = 3;
