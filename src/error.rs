//! Error types for tunnel-relay
//!
//! Errors are categorized by subsystem. Acceptor-fatal conditions (a listener
//! that can no longer produce connections) surface through `serve()` return
//! values; per-session failures surface exactly once through
//! [`EventLogger::end`](crate::session::EventLogger::end).

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Top-level error type for tunnel-relay
#[derive(Debug, Error)]
pub enum TunnelRelayError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// TPROXY socket and listener errors
    #[error("TPROXY error: {0}")]
    Tproxy(#[from] TproxyError),

    /// Relay session errors
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

/// TPROXY-related errors
#[derive(Debug, Error)]
pub enum TproxyError {
    /// Failed to create socket
    #[error("Failed to create TPROXY socket: {0}")]
    SocketCreation(String),

    /// Failed to set socket option (IP_TRANSPARENT, etc.)
    #[error("Failed to set socket option {option}: {reason}")]
    SocketOption { option: String, reason: String },

    /// Failed to bind to address
    #[error("Failed to bind to {addr}: {reason}")]
    BindError { addr: SocketAddr, reason: String },

    /// Failed to accept connection
    #[error("Accept error: {0}")]
    AcceptError(String),

    /// Failed to retrieve original destination
    #[error("Failed to get original destination: {0}")]
    OriginalDstError(String),

    /// Permission denied (CAP_NET_ADMIN required)
    #[error("Permission denied: TPROXY requires CAP_NET_ADMIN capability")]
    PermissionDenied,

    /// I/O error
    #[error("TPROXY I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl TproxyError {
    /// Check if the serve loop may continue after this error.
    ///
    /// Only original-destination retrieval failures are per-connection; an
    /// accept failure means the listener itself is broken and serving stops.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::OriginalDstError(_))
    }

    /// Create a socket option error
    pub fn socket_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SocketOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Terminal outcome of a relay session that did not end in a clean close
#[derive(Debug, Error)]
pub enum RelayError {
    /// The traffic policy vetoed continued relaying
    #[error("traffic policy requested disconnect")]
    PolicyTerminated,

    /// A read or write failed on either direction, or the remote stream
    /// could not be opened
    #[error("relay I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RelayError {
    /// Distinguish "policy said stop" from "network broke"
    #[must_use]
    pub const fn is_policy_terminated(&self) -> bool {
        matches!(self, Self::PolicyTerminated)
    }
}
