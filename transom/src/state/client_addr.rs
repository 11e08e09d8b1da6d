//! Records the peer address of the connection a request arrived on.

use std::net::SocketAddr;

use super::State;

/// Stored in `State` by the connection handler before a request is
/// dispatched to the router.
pub struct ClientAddr(SocketAddr);

impl ClientAddr {
    pub fn new(addr: SocketAddr) -> Self {
        ClientAddr(addr)
    }
}

/// Returns the client's socket address, if the transport exposed one.
///
/// A `Connection` built over `tokio::io::duplex` (as in tests) has no real
/// peer address, so this is not always present.
pub fn client_addr(state: &State) -> Option<SocketAddr> {
    state.try_borrow::<ClientAddr>().map(|c| c.0)
}
