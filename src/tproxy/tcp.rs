//! Transparent-intercept acceptor
//!
//! Same control structure as the direct forwarder, with one semantic
//! inversion: the destination handed to the tunnel client is recovered from
//! the intercepted connection itself rather than taken from configuration.

use std::sync::Arc;

use tracing::warn;

use super::connection::TproxyConnection;
use super::listener::TproxyListener;
use crate::client::TunnelClient;
use crate::error::TproxyError;
use crate::session::{EventLogger, SessionContext, SessionRegistry, TrafficPolicy};

/// Transparent-intercept acceptor
pub struct TcpTransparentProxy {
    ctx: SessionContext,
}

impl TcpTransparentProxy {
    /// Create a transparent proxy relaying through `client`
    pub fn new(client: Arc<dyn TunnelClient>) -> Self {
        Self {
            ctx: SessionContext::new(client),
        }
    }

    /// Attach an event logger for session lifecycle notifications
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.ctx.logger = Some(logger);
        self
    }

    /// Attach a traffic policy consulted after every relayed chunk
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn TrafficPolicy>) -> Self {
        self.ctx.policy = Some(policy);
        self
    }

    /// Share a session registry (e.g. one registry across several acceptors)
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.ctx.registry = registry;
        self
    }

    /// The registry holding statistics of this proxy's live sessions
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.ctx.registry
    }

    /// Accept intercepted connections until the listener fails.
    ///
    /// A connection whose original destination cannot be recovered is
    /// dropped with a warning; accept failures stop serving.
    ///
    /// # Errors
    ///
    /// Returns the fatal listener error. No per-session failure reaches
    /// this result.
    pub async fn serve(&self, listener: TproxyListener) -> Result<(), TproxyError> {
        loop {
            let conn = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) if e.is_recoverable() => {
                    warn!("dropping intercepted connection: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                run(ctx, conn).await;
            });
        }
    }

    /// Relay one intercepted connection to completion.
    ///
    /// For accept mechanisms external to [`serve`](Self::serve); the
    /// connection already carries its destination.
    pub async fn handle(&self, conn: TproxyConnection) {
        run(self.ctx.clone(), conn).await;
    }
}

async fn run(ctx: SessionContext, conn: TproxyConnection) {
    let peer = conn.client_addr();
    let dest = conn.original_dst().to_string();
    ctx.run(conn.into_stream(), peer, dest).await;
}
