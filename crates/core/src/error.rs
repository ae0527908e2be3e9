//! Error types for the Overwatch domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Overwatch operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Planner errors ---
    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    // --- Arsenal errors ---
    #[error("Arsenal error: {0}")]
    Arsenal(#[from] ArsenalError),

    // --- Executor errors ---
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    // --- Mission errors ---
    #[error("Mission error: {0}")]
    Mission(#[from] MissionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the LLM planner backend and the proposal codec.
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    /// The model's reply did not decode into exactly one well-formed
    /// proposal variant. Recoverable by bounded re-prompt.
    #[error("Malformed proposal: {reason}")]
    MalformedProposal { reason: String },

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Planner not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors from catalog lookup, command resolution, and tool registration.
///
/// All of these are recoverable: the loop feeds them back to the model as
/// the next observation instead of executing anything.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArsenalError {
    #[error("Unknown command: '{0}' is not in the arsenal")]
    UnknownCommand(String),

    #[error("Invalid argument for slot '{slot}': {reason}")]
    InvalidArgument { slot: String, reason: String },

    #[error("Ambiguous template: placeholder '{placeholder}' left unfilled")]
    AmbiguousTemplate { placeholder: String },

    #[error("Name collision: '{0}' already exists in the arsenal")]
    NameCollision(String),

    #[error("Unsafe command: {reason}")]
    UnsafeCommand { reason: String },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

/// Errors from the command executor.
///
/// Timeouts and non-zero exits are *observations*, not errors — this enum
/// only covers failures to invoke the process at all.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },
}

/// Errors that end a mission.
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("Planner retries exhausted after {attempts} malformed proposals")]
    RetriesExhausted { attempts: u32 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_error_displays_correctly() {
        let err = Error::Planner(PlannerError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn arsenal_error_displays_correctly() {
        let err = Error::Arsenal(ArsenalError::UnknownCommand("drop_table".into()));
        assert!(err.to_string().contains("drop_table"));
        assert!(err.to_string().contains("not in the arsenal"));
    }

    #[test]
    fn malformed_proposal_carries_reason() {
        let err = PlannerError::MalformedProposal {
            reason: "two variants populated".into(),
        };
        assert!(err.to_string().contains("two variants populated"));
    }
}
