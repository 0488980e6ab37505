//! TPROXY TCP listener

use std::net::SocketAddr;
use std::os::unix::io::{FromRawFd, IntoRawFd};

use tokio::net::TcpListener;
use tracing::{debug, info};

use super::connection::TproxyConnection;
use super::socket::create_transparent_socket;
use crate::config::TproxyConfig;
use crate::error::TproxyError;

/// Listener accepting intercepted TCP connections with their original
/// destination recovered at accept time
#[derive(Debug)]
pub struct TproxyListener {
    listener: TcpListener,
    listen_addr: SocketAddr,
}

impl TproxyListener {
    /// Create and bind a transparent listener.
    ///
    /// # Errors
    ///
    /// Returns `TproxyError` if socket creation, binding, or listening
    /// fails, including `PermissionDenied` when `CAP_NET_ADMIN` is missing.
    pub fn bind(config: &TproxyConfig) -> Result<Self, TproxyError> {
        let socket = create_transparent_socket(config.listen, config.reuse_port)?;

        socket
            .bind(&config.listen.into())
            .map_err(|e| TproxyError::BindError {
                addr: config.listen,
                reason: e.to_string(),
            })?;

        socket
            .listen(config.tcp_backlog as i32)
            .map_err(|e| TproxyError::socket_option("listen", e.to_string()))?;

        // Safety: we own the socket and it is a valid listening socket
        let std_listener = unsafe { std::net::TcpListener::from_raw_fd(socket.into_raw_fd()) };
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| TproxyError::SocketCreation(e.to_string()))?;

        info!(
            "TPROXY listener ready on {} (backlog={})",
            config.listen, config.tcp_backlog
        );

        Ok(Self {
            listener,
            listen_addr: config.listen,
        })
    }

    /// Accept one intercepted connection.
    ///
    /// # Errors
    ///
    /// Returns `TproxyError::AcceptError` when the listener fails (fatal to
    /// serving) and `TproxyError::OriginalDstError` when only the original
    /// destination of this one connection cannot be recovered.
    pub async fn accept(&self) -> Result<TproxyConnection, TproxyError> {
        let (stream, client_addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TproxyError::AcceptError(e.to_string()))?;

        debug!("accepted intercepted connection from {}", client_addr);

        TproxyConnection::new(stream, client_addr)
    }

    /// The configured listen address
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_without_cap() {
        let config = TproxyConfig::new("127.0.0.1:0".parse().unwrap());
        match TproxyListener::bind(&config) {
            Ok(listener) => assert_eq!(listener.listen_addr().port(), 0),
            // Without CAP_NET_ADMIN this is the expected outcome
            Err(TproxyError::PermissionDenied) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
