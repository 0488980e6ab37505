//! TPROXY socket utilities
//!
//! Low-level socket operations for transparent interception. A listening
//! socket with `IP_TRANSPARENT` set can bind to non-local addresses and
//! receive redirected connections; each accepted socket then masquerades as
//! the remote server, so its local address carries the destination the
//! client actually dialed.

use std::io;
use std::mem;
use std::net::SocketAddr;
use std::os::unix::io::AsRawFd;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::error::TproxyError;

/// Linux kernel constant: `IP_TRANSPARENT` socket option (`SOL_IP` level)
pub const IP_TRANSPARENT: libc::c_int = 19;

/// Create a TCP listening socket with `IP_TRANSPARENT` enabled.
///
/// The socket's address family follows `addr`. The caller binds and listens.
///
/// # Errors
///
/// Returns `TproxyError::SocketCreation` if socket creation fails,
/// `TproxyError::PermissionDenied` if `CAP_NET_ADMIN` is missing, and
/// `TproxyError::SocketOption` for any other option failure.
pub fn create_transparent_socket(addr: SocketAddr, reuse_port: bool) -> Result<Socket, TproxyError> {
    let domain = Domain::for_address(addr);
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| TproxyError::SocketCreation(e.to_string()))?;

    set_ip_transparent(&socket)?;

    socket
        .set_reuse_address(true)
        .map_err(|e| TproxyError::socket_option("SO_REUSEADDR", e.to_string()))?;

    if reuse_port {
        socket
            .set_reuse_port(true)
            .map_err(|e| TproxyError::socket_option("SO_REUSEPORT", e.to_string()))?;
    }

    // Non-blocking for tokio
    socket
        .set_nonblocking(true)
        .map_err(|e| TproxyError::socket_option("O_NONBLOCK", e.to_string()))?;

    debug!("created transparent TCP socket for {}", addr);
    Ok(socket)
}

fn set_ip_transparent(socket: &Socket) -> Result<(), TproxyError> {
    let fd = socket.as_raw_fd();
    let one: libc::c_int = 1;

    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_IP,
            IP_TRANSPARENT,
            std::ptr::addr_of!(one).cast::<libc::c_void>(),
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };

    if ret != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            return Err(TproxyError::PermissionDenied);
        }
        return Err(TproxyError::socket_option("IP_TRANSPARENT", err.to_string()));
    }

    Ok(())
}

/// Check whether the process can set `IP_TRANSPARENT` (requires
/// `CAP_NET_ADMIN`).
#[must_use]
pub fn has_net_admin_capability() -> bool {
    // Errors other than EPERM do not indicate a missing capability
    !matches!(
        create_transparent_socket("127.0.0.1:0".parse().unwrap(), false),
        Err(TproxyError::PermissionDenied)
    )
}

/// Check if running as root (effective UID = 0)
#[must_use]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
