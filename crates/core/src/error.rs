//! Error types for identifier and timestamp parsing.

use thiserror::Error;

/// Errors raised while parsing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An identifier was not an integer.
    #[error("invalid {kind} id: {input:?}")]
    InvalidId {
        /// Which identifier type was being parsed.
        kind: &'static str,
        /// The rejected input.
        input: String,
    },

    /// An edition time was not a valid RFC 3339 timestamp.
    #[error("invalid edition time {input:?}: {reason}")]
    InvalidEditionTime {
        /// The rejected input.
        input: String,
        /// Parser message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_id_display() {
        let err = CoreError::InvalidId {
            kind: "node",
            input: "abc".into(),
        };
        assert_eq!(err.to_string(), "invalid node id: \"abc\"");
    }
}
