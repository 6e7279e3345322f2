//! Error types for the gateway client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wiser_gateway::{Result, Websocket};
//!
//! async fn example(ws: &Websocket) -> Result<()> {
//!     ws.connect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::WebSocket`] |
//! | Frame | [`Error::Decode`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the client is configured with invalid values, such as
    /// a non-positive watchdog timeout, a host that does not form a valid
    /// URL, or a token that does not form a valid header value.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the connection to the gateway cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the gateway.
    ///
    /// Returned when the handshake does not complete within the timeout
    /// period.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket transport error.
    ///
    /// Returned when the established connection fails mid-stream. Fatal
    /// for the current connection attempt.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Malformed inbound frame.
    ///
    /// Returned by message decoding when a text frame is not valid JSON.
    /// Non-fatal: the read loop logs it and skips the frame.
    #[error("Malformed frame: {0}")]
    Decode(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a per-frame decode error.
    #[inline]
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns `true` if this is a connection-level error.
    ///
    /// Connection-level errors are fatal to the current connection attempt
    /// and surface to the caller of `connect()`.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionTimeout { .. } | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("gateway unreachable");
        assert_eq!(err.to_string(), "Connection failed: gateway unreachable");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("watchdog timeout must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Configuration error: watchdog timeout must be greater than zero"
        );
    }

    #[test]
    fn test_connection_timeout_display() {
        let err = Error::connection_timeout(10_000);
        assert_eq!(err.to_string(), "Connection timeout after 10000ms");
    }

    #[test]
    fn test_is_decode() {
        let decode_err: Error = serde_json::from_str::<serde_json::Value>("not json")
            .unwrap_err()
            .into();
        let other_err = Error::config("test");

        assert!(decode_err.is_decode());
        assert!(!other_err.is_decode());
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connection("test");
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 1000 };
        let other_err = Error::config("test");

        assert!(conn_err.is_connection_error());
        assert!(timeout_err.is_connection_error());
        assert!(!other_err.is_connection_error());
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::connection_timeout(5000);
        let conn_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(!conn_err.is_timeout());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Decode(_)));
    }
}
