//! Engine error taxonomy
//!
//! - `NotFound`: entity, quest or profile missing. Level-config misses never
//!   surface here; they fall back to tier defaults.
//! - `InvalidTransition`: expected user-facing rejections (double complete,
//!   stale reverse, duplicate path). Returned, never panicked.
//! - `Persistence`: the storage port rejected a read or write. Nothing is
//!   considered committed and nothing is retried here.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidTransition(message.into())
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, EngineError::InvalidTransition(_))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Persistence(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for EngineError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        EngineError::Persistence(format!("migration failed: {}", e))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Persistence(format!("serialization failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = EngineError::not_found("quest", 42);
        assert_eq!(err.to_string(), "quest not found: 42");

        let err = EngineError::invalid("already completed today");
        assert_eq!(err.to_string(), "already completed today");
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn test_serializes_tagged() {
        let err = EngineError::Persistence("disk full".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"type":"Persistence","message":"disk full"}"#);
    }
}
