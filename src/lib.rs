//! tunnel-relay: tunnel-backed TCP relay engine
//!
//! Given a locally accepted connection and a remote stream opened through a
//! pluggable tunnel client, this crate copies bytes in both directions
//! concurrently, accounts traffic per direction, optionally consults a
//! per-chunk traffic policy that can veto continued relaying, and reports a
//! single terminal outcome per session to an event logger.
//!
//! # Architecture
//!
//! ```text
//! Client ──> TcpForwarder ─────────┐
//!                                  ├──> relay engine ──> TunnelClient ──> Destination
//! Client ──> TPROXY redirect ──────┘         │
//!            (original destination           └──> StreamStats / EventLogger
//!             from socket metadata)
//! ```
//!
//! Two acceptor variants feed the engine: [`TcpForwarder`] relays every
//! accepted connection to one fixed destination, and [`TcpTransparentProxy`]
//! recovers each connection's intended destination from the intercepted
//! socket itself.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio::net::TcpListener;
//! use tunnel_relay::{DirectClient, TcpForwarder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! let forwarder = TcpForwarder::new(Arc::new(DirectClient::new()), "example.com:80");
//! forwarder.serve(listener).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`]: tunnel-client capability trait
//! - [`config`]: configuration types and loading
//! - [`error`]: error types
//! - [`forward`]: direct-forward acceptor
//! - [`relay`]: the duplex copy engine
//! - [`session`]: statistics, registry, and external hooks
//! - [`tproxy`]: transparent-intercept acceptor

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod client;
pub mod config;
pub mod error;
pub mod forward;
pub mod relay;
pub mod session;
pub mod tproxy;

// Re-export commonly used types at the crate root
pub use client::{DirectClient, TunnelClient, TunnelStream};
pub use config::{load_config, load_config_str, Config, ForwardConfig, TproxyConfig};
pub use error::{ConfigError, RelayError, TproxyError, TunnelRelayError};
pub use forward::TcpForwarder;
pub use relay::{relay, relay_with_policy, RELAY_BUFFER_SIZE};
pub use session::{
    EventLogger, SessionId, SessionRegistry, StreamStats, StreamStatsSnapshot, TrafficPolicy,
};
pub use tproxy::{TcpTransparentProxy, TproxyConnection, TproxyListener};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
