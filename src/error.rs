use thiserror::Error;

/// Errors raised by the environment's step interface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("invalid action index {action}: must be in [0, 6)")]
    InvalidAction { action: usize },
}

/// Errors raised while saving or loading a Q-table file.
///
/// A failed load leaves the agent's existing Q-table unmodified.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access Q-table file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Q-table file is structurally incompatible: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_action_display() {
        let e = EnvError::InvalidAction { action: 9 };
        assert_eq!(e.to_string(), "invalid action index 9: must be in [0, 6)");
    }
}
