//! External capability contracts consumed per session
//!
//! Both traits are implemented by the embedding application; the relay core
//! only calls them. Implementations must be safe to call concurrently from
//! many simultaneous sessions.

use std::fmt;
use std::net::SocketAddr;

use crate::error::RelayError;

/// Identifier for one relay session, unique for the lifetime of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a session id from a raw value
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-chunk relay admission decision
///
/// Called once per successfully read chunk when a policy is configured on an
/// acceptor. Exactly one of `upload`/`download` is non-zero per call; the
/// session's statistics are already updated with the chunk when the policy
/// runs. Returning `false` terminates only the calling session, which then
/// ends with [`RelayError::PolicyTerminated`].
pub trait TrafficPolicy: Send + Sync {
    /// Decide whether the session may continue after transferring a chunk
    fn permit(&self, id: SessionId, upload: u64, download: u64) -> bool;
}

/// Session lifecycle notifications
///
/// `connect` fires at most once per session, before any relay begins; `end`
/// fires exactly once per session, after the relay completes or after the
/// remote stream could not be opened. Both are fire-and-forget and must not
/// block the relay path.
pub trait EventLogger: Send + Sync {
    /// A local connection was accepted and a session is starting.
    ///
    /// `dest` is the fixed remote destination for the direct forwarder, or
    /// the recovered original destination for the transparent proxy.
    fn connect(&self, client: SocketAddr, dest: &str);

    /// The session ended.
    ///
    /// `err` is `None` only on a clean end-of-stream close with no policy
    /// veto. `upload`/`download` are the final byte counts; both are zero
    /// when the remote stream could not be opened.
    fn end(
        &self,
        client: SocketAddr,
        dest: &str,
        err: Option<&RelayError>,
        upload: u64,
        download: u64,
    );
}
