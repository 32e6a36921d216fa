//! Error handling types for mixin-ls
//!
//! Every failure of the downstream completion command collapses to an empty
//! completion list at the relay boundary; these types exist so the bridge can
//! propagate failures with `?` up to that boundary.

use thiserror::Error;

/// Error type for relay and bridge operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// Downstream server process could not be spawned
    #[error("failed to spawn downstream server `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Downstream connection closed or the response channel was dropped
    #[error("downstream connection lost: {message}")]
    ConnectionLost { message: String },

    /// Malformed JSON-RPC traffic from the downstream server
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The completion command returned a JSON-RPC error response
    #[error("completion command failed (code {code}): {message}")]
    Command { code: i64, message: String },

    /// Configuration error
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for relay and bridge operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Helper functions for common error patterns
impl RelayError {
    /// Create a spawn error
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        RelayError::Spawn {
            command: command.into(),
            source,
        }
    }

    /// Create a connection-lost error
    pub fn connection_lost(message: impl Into<String>) -> Self {
        RelayError::ConnectionLost {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        RelayError::Protocol {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        RelayError::Config {
            message: message.into(),
        }
    }
}
