//! Error types for the FleetView environment abstraction.

use thiserror::Error;

/// Errors that can occur when talking to an external collaborator.
#[derive(Debug, Clone, Error)]
pub enum EnvError {
    /// The entity store rejected or failed a query/save
    #[error("Store error: {0}")]
    Store(String),

    /// The live-update feed failed
    #[error("Feed error: {0}")]
    Feed(String),

    /// A record the caller asked for does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A display surface index was out of range
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The collaborator has shut down
    #[error("Channel closed")]
    Closed,
}

impl EnvError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_pick_variant_and_message() {
        assert!(matches!(EnvError::store("down"), EnvError::Store(m) if m == "down"));
        assert!(matches!(EnvError::feed("gone"), EnvError::Feed(m) if m == "gone"));
        assert_eq!(
            EnvError::serialization("bad json").to_string(),
            "Serialization error: bad json"
        );
        assert_eq!(EnvError::not_found("car 7").to_string(), "Not found: car 7");
    }
}
