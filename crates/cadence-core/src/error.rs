//! Error types for the plan engine library.

use thiserror::Error;

/// Comprehensive error type for all engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// One or more of the three pillars (duration, focus, load) is unset
    #[error("Missing plan pillars: {}", missing.join(", "))]
    ThreePillarsMissing { missing: Vec<&'static str> },
    /// Preferred time slot count does not match the load contract
    #[error("Expected {expected} preferred time slots for load {load}, got {got}")]
    SlotCountMismatch {
        load: String,
        expected: usize,
        got: usize,
    },
    /// Content library cannot satisfy the requested composition
    #[error("Insufficient content library: {reason}")]
    InsufficientLibrary { reason: String },
    /// Requested day count is not one of the canonical durations
    #[error("Invalid duration: {value} is not a canonical day count")]
    InvalidDuration { value: i64 },
    /// Draft exists but failed validation and cannot be activated
    #[error("Draft {id} is invalid: {}", errors.join("; "))]
    DraftInvalid { id: String, errors: Vec<String> },
    /// Adaptation blocked by current plan state, rate limit, or conflict
    #[error("Adaptation not eligible: {reason}")]
    NotEligible { reason: String },
    /// FSM transition rejected by the gate
    #[error("Illegal state transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
    /// User not found for the given ID
    #[error("User with ID {id} not found")]
    UserNotFound { id: u64 },
    /// Plan not found for the given ID or user
    #[error("Plan with ID {id} not found")]
    PlanNotFound { id: u64 },
    /// Step not found for the given ID
    #[error("Step with ID {id} not found")]
    StepNotFound { id: u64 },
    /// No pending draft exists for the user
    #[error("No pending draft for user {user_id}")]
    DraftNotFound { user_id: u64 },
    /// An active plan already exists for the user
    #[error("User {user_id} already has an active plan (id {plan_id})")]
    ActivePlanExists { user_id: u64, plan_id: u64 },
    /// A persisted plan violates a structural invariant
    #[error("Plan integrity violation: {message}")]
    Integrity { message: String },
    /// Content catalog could not be loaded or parsed
    #[error("Catalog error: {message}")]
    Catalog { message: String },
    /// Unknown or unloadable IANA timezone
    #[error("Timezone error: {message}")]
    Timezone { message: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl EngineError {
    /// Creates a database error with additional context.
    pub fn database_error(message: &str, source: rusqlite::Error) -> Self {
        Self::Database {
            message: message.to_string(),
            source,
        }
    }

    /// Creates a not-eligible error from a stable reason string.
    pub fn not_eligible(reason: impl Into<String>) -> Self {
        Self::NotEligible {
            reason: reason.into(),
        }
    }

    /// Returns the machine-readable rejection reason, if this is a
    /// not-eligible error.
    pub fn eligibility_reason(&self) -> Option<&str> {
        match self {
            Self::NotEligible { reason } => Some(reason),
            _ => None,
        }
    }

    /// True for recoverable request-shape failures: the caller can fix
    /// the request and retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ThreePillarsMissing { .. }
                | Self::SlotCountMismatch { .. }
                | Self::InsufficientLibrary { .. }
                | Self::InvalidDuration { .. }
                | Self::DraftInvalid { .. }
                | Self::InvalidInput { .. }
        )
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| EngineError::database_error(message, e))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_recoverable() {
        assert!(EngineError::ThreePillarsMissing {
            missing: vec!["duration"]
        }
        .is_validation());
        assert!(EngineError::InsufficientLibrary {
            reason: "empty".to_string()
        }
        .is_validation());
        assert!(EngineError::InvalidDuration { value: 10 }.is_validation());

        assert!(!EngineError::not_eligible("already_paused").is_validation());
        assert!(!EngineError::PlanNotFound { id: 1 }.is_validation());
    }

    #[test]
    fn test_eligibility_reason_only_for_not_eligible() {
        let err = EngineError::not_eligible("slot_not_in_plan");
        assert_eq!(err.eligibility_reason(), Some("slot_not_in_plan"));
        assert_eq!(
            EngineError::UserNotFound { id: 1 }.eligibility_reason(),
            None
        );
    }

    #[test]
    fn test_missing_pillars_render_in_message() {
        let err = EngineError::ThreePillarsMissing {
            missing: vec!["duration", "load"],
        };
        assert_eq!(err.to_string(), "Missing plan pillars: duration, load");
    }
}
