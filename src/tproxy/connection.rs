//! Intercepted connection representation

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::debug;

use crate::error::TproxyError;

/// An intercepted TCP connection paired with the destination the client
/// actually dialed.
///
/// TPROXY delivers these connections masquerading as the remote server, so
/// the raw socket's address metadata carries swapped semantics: the peer
/// address is the real client and the socket's own local address is where
/// that client intended to go.
#[derive(Debug)]
pub struct TproxyConnection {
    stream: TcpStream,
    client_addr: SocketAddr,
    original_dst: SocketAddr,
}

impl TproxyConnection {
    /// Wrap an accepted stream, recovering its original destination from the
    /// socket's local address.
    ///
    /// # Errors
    ///
    /// Returns `TproxyError::OriginalDstError` if the socket's local address
    /// cannot be read.
    pub fn new(stream: TcpStream, client_addr: SocketAddr) -> Result<Self, TproxyError> {
        // The redirected socket masquerades as the remote server: its local
        // address is the destination the client dialed, with no NAT entry
        // involved.
        let original_dst = stream.local_addr().map_err(|e| {
            TproxyError::OriginalDstError(format!("local address unavailable: {e}"))
        })?;

        debug!(
            "intercepted connection: {} -> {} (original)",
            client_addr, original_dst
        );

        Ok(Self {
            stream,
            client_addr,
            original_dst,
        })
    }

    /// Create a connection with a pre-known destination.
    ///
    /// Useful for tests and for accept mechanisms that learn the destination
    /// through other means.
    #[must_use]
    pub fn with_destination(
        stream: TcpStream,
        client_addr: SocketAddr,
        original_dst: SocketAddr,
    ) -> Self {
        Self {
            stream,
            client_addr,
            original_dst,
        }
    }

    /// The real client's address
    #[must_use]
    pub const fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    /// The destination the client intended to reach
    #[must_use]
    pub const fn original_dst(&self) -> SocketAddr {
        self.original_dst
    }

    /// Borrow the underlying TCP stream
    #[must_use]
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Consume the connection and return the underlying stream
    #[must_use]
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}
