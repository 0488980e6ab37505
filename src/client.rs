//! Tunnel client capability
//!
//! The relay core never dials the real network itself; it asks a
//! [`TunnelClient`] for a stream to a destination and relays over whatever
//! comes back. The tunnel's own transport and multiplexing are opaque here.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Byte stream returned by a tunnel client
pub trait TunnelStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> TunnelStream for T {}

/// Capability that turns a destination string into an open stream.
///
/// Must support arbitrary concurrent calls from independent sessions.
#[async_trait]
pub trait TunnelClient: Send + Sync {
    /// Open a stream to `dest` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the destination is unreachable
    /// or the tunnel cannot carry another stream.
    async fn open_stream(&self, dest: &str) -> io::Result<Box<dyn TunnelStream>>;
}

/// Default timeout for [`DirectClient`] connections
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunnel client that dials destinations directly over TCP.
///
/// Useful for tests and for running the acceptors without a tunnel transport.
#[derive(Debug, Clone)]
pub struct DirectClient {
    connect_timeout: Duration,
}

impl DirectClient {
    /// Create a direct client with the default connect timeout
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a direct client with a custom connect timeout
    #[must_use]
    pub const fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for DirectClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TunnelClient for DirectClient {
    async fn open_stream(&self, dest: &str) -> io::Result<Box<dyn TunnelStream>> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(dest))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to {dest} timed out"),
                )
            })??;

        // Relayed traffic is interactive; don't batch small writes
        stream.set_nodelay(true)?;

        debug!("direct connection established to {}", dest);
        Ok(Box::new(stream))
    }
}
