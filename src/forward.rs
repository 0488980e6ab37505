//! Direct TCP forwarding
//!
//! Accepts plain TCP connections and relays every one of them to a single
//! fixed remote destination through the tunnel client.

use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::client::TunnelClient;
use crate::session::{EventLogger, SessionContext, SessionRegistry, TrafficPolicy};

/// Direct-forward acceptor: one listener, one fixed destination
pub struct TcpForwarder {
    remote: String,
    ctx: SessionContext,
}

impl TcpForwarder {
    /// Create a forwarder that relays every accepted connection to `remote`
    pub fn new(client: Arc<dyn TunnelClient>, remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
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

    /// The registry holding statistics of this forwarder's live sessions
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.ctx.registry
    }

    /// The fixed remote destination
    #[must_use]
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Accept connections until the listener fails.
    ///
    /// Each accepted connection is handled in its own task with no admission
    /// control; per-session outcomes are delivered only through the event
    /// logger, never through this return value.
    ///
    /// # Errors
    ///
    /// Returns the accept error once the listener can no longer produce
    /// connections. No per-session failure reaches this result.
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("forwarding {} -> {}", addr, self.remote);
        }

        loop {
            let (stream, peer) = listener.accept().await?;
            debug!("accepted connection from {}", peer);

            let ctx = self.ctx.clone();
            let dest = self.remote.clone();
            tokio::spawn(async move {
                ctx.run(stream, peer, dest).await;
            });
        }
    }
}
