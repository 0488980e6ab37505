//! Session lifecycle: statistics, external hooks, and the shared
//! per-connection handler used by both acceptor variants

pub mod hooks;
pub mod registry;
pub mod stats;

pub use hooks::{EventLogger, SessionId, TrafficPolicy};
pub use registry::SessionRegistry;
pub use stats::{StreamStats, StreamStatsSnapshot};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::client::TunnelClient;
use crate::error::RelayError;
use crate::relay::{relay, relay_with_policy};

/// Shared collaborators handed to every session of one acceptor.
///
/// The two acceptor variants differ only in how they derive the destination
/// for an accepted connection; everything from "notify connect" to "notify
/// end" runs through [`SessionContext::run`].
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) client: Arc<dyn TunnelClient>,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) logger: Option<Arc<dyn EventLogger>>,
    pub(crate) policy: Option<Arc<dyn TrafficPolicy>>,
}

impl SessionContext {
    pub(crate) fn new(client: Arc<dyn TunnelClient>) -> Self {
        Self {
            client,
            registry: Arc::new(SessionRegistry::new()),
            logger: None,
            policy: None,
        }
    }

    /// Run one session to completion.
    ///
    /// Owns the accepted stream; both the local and the remote stream are
    /// dropped (closed) on every exit path, including remote-open failure.
    pub(crate) async fn run(&self, local: TcpStream, peer: SocketAddr, dest: String) {
        if let Some(logger) = &self.logger {
            logger.connect(peer, &dest);
        }

        let remote = match self.client.open_stream(&dest).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("failed to open tunnel stream to {} for {}: {}", dest, peer, e);
                if let Some(logger) = &self.logger {
                    logger.end(peer, &dest, Some(&RelayError::Io(e)), 0, 0);
                }
                return;
            }
        };

        let (id, stats) = self.registry.register();
        debug!("session {}: {} -> {}", id, peer, dest);

        let result = match self.policy.as_deref() {
            Some(policy) => relay_with_policy(id, local, remote, &stats, policy).await,
            None => relay(local, remote, &stats).await,
        };

        let (upload, download) = (stats.tx(), stats.rx());
        self.registry.unregister(id);

        match &result {
            Ok(()) => debug!(
                "session {} closed: {} up / {} down bytes",
                id, upload, download
            ),
            Err(e) => debug!(
                "session {} ended: {} ({} up / {} down bytes)",
                id, e, upload, download
            ),
        }

        if let Some(logger) = &self.logger {
            logger.end(peer, &dest, result.as_ref().err(), upload, download);
        }
    }
}
