//! UDP command link adapter.
//!
//! Implements [`CommandPort`] over a connected, non-blocking UDP socket.
//! The channel is best-effort end to end: a socket that cannot be opened
//! turns the link into a sink that drops every frame, and send errors
//! (including `WouldBlock` and ICMP-refused) are only logged at debug level.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use log::{debug, info, warn};

use crate::app::ports::CommandPort;

pub struct UdpCommandLink {
    socket: Option<UdpSocket>,
    peer: SocketAddr,
}

impl UdpCommandLink {
    /// Open a link to `peer`. Never fails; see [`is_connected`](Self::is_connected).
    pub fn open(peer: SocketAddr) -> Self {
        let socket = match Self::try_open(peer) {
            Ok(socket) => {
                info!("command link: sending to {}", peer);
                Some(socket)
            }
            Err(e) => {
                warn!("command link: cannot open {} ({}), commands will be dropped", peer, e);
                None
            }
        };
        Self { socket, peer }
    }

    /// A link with no socket behind it.
    #[cfg(test)]
    fn disconnected(peer: SocketAddr) -> Self {
        Self { socket: None, peer }
    }

    fn try_open(peer: SocketAddr) -> io::Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(peer)?;
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl CommandPort for UdpCommandLink {
    fn send(&mut self, frame: &[u8]) {
        let Some(socket) = &self.socket else {
            return;
        };
        if let Err(e) = socket.send(frame) {
            debug!("command link: send to {} failed: {}", self.peer, e);
        }
    }
}
