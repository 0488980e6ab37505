//! TPROXY transparent interception
//!
//! Linux TPROXY delivers connections addressed to other destinations to a
//! local listener; each accepted socket masquerades as the remote server, so
//! its local address is the destination the client dialed. Requires
//! `CAP_NET_ADMIN` and a platform redirect rule, both outside this crate.

pub mod connection;
pub mod listener;
pub mod socket;
pub mod tcp;

pub use connection::TproxyConnection;
pub use listener::TproxyListener;
pub use socket::{has_net_admin_capability, is_root};
pub use tcp::TcpTransparentProxy;
