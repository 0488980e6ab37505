//! Duplex relay engine
//!
//! Copies bytes between a local stream and a tunnel-backed remote stream in
//! both directions concurrently. The first direction to finish, successfully
//! or not, decides the session outcome; the other direction is cancelled and
//! both streams are dropped (closed) when the relay returns. Either side
//! reaching end-of-stream is a normal close, never an error.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RelayError;
use crate::session::{SessionId, StreamStats, TrafficPolicy};

/// Read chunk size for the copy loops. Large enough to amortize syscall
/// overhead without a heavy per-session memory cost.
pub const RELAY_BUFFER_SIZE: usize = 32 * 1024;

/// Relay two streams without a traffic policy.
///
/// Statistics are still updated per chunk so observers and the final byte
/// counts stay accurate.
///
/// # Errors
///
/// Returns [`RelayError::Io`] if a read or write fails on either direction
/// before the other direction finishes. A clean end-of-stream on either
/// direction returns `Ok(())`.
pub async fn relay<L, R>(local: L, remote: R, stats: &StreamStats) -> Result<(), RelayError>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    relay_inner(local, remote, stats, None).await
}

/// Relay two streams, consulting `policy` after every chunk.
///
/// For each chunk of `n > 0` bytes read from either side, the session's
/// statistics are updated first and the policy is asked second, so the
/// accounting reflects bytes actually read even when the policy vetoes. A
/// veto stops the session before the pending write.
///
/// # Errors
///
/// Returns [`RelayError::PolicyTerminated`] on a veto, [`RelayError::Io`] on
/// a read or write failure.
pub async fn relay_with_policy<L, R>(
    id: SessionId,
    local: L,
    remote: R,
    stats: &StreamStats,
    policy: &dyn TrafficPolicy,
) -> Result<(), RelayError>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    relay_inner(local, remote, stats, Some((id, policy))).await
}

async fn relay_inner<L, R>(
    local: L,
    remote: R,
    stats: &StreamStats,
    policy: Option<(SessionId, &dyn TrafficPolicy)>,
) -> Result<(), RelayError>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    let (mut local_rd, mut local_wr) = tokio::io::split(local);
    let (mut remote_rd, mut remote_wr) = tokio::io::split(remote);

    let upload = copy_chunks(&mut local_rd, &mut remote_wr, |n| {
        stats.touch();
        stats.add_tx(n);
        policy.map_or(true, |(id, p)| p.permit(id, n, 0))
    });
    let download = copy_chunks(&mut remote_rd, &mut local_wr, |n| {
        stats.touch();
        stats.add_rx(n);
        policy.map_or(true, |(id, p)| p.permit(id, 0, n))
    });

    // First direction to finish decides the outcome. The losing future is
    // dropped here, cancelling its pending read or write, and both streams
    // are dropped (closed) when this function returns.
    tokio::select! {
        result = upload => result,
        result = download => result,
    }
}

/// One directional copy loop.
///
/// `on_read` runs after every successful read of `n > 0` bytes and before
/// the corresponding write; returning `false` terminates the direction with
/// a policy veto. End-of-stream completes the direction cleanly.
async fn copy_chunks<R, W, F>(reader: &mut R, writer: &mut W, mut on_read: F) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    F: FnMut(u64) -> bool,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            // EOF is a normal completion for this direction
            return Ok(());
        }
        if !on_read(n as u64) {
            return Err(RelayError::PolicyTerminated);
        }
        writer.write_all(&buf[..n]).await?;
    }
}
