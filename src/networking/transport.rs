//!
//! The seam between the protocol core and the connection layer.
//!
//! The connection layer owns sockets, the pool of candidate addresses,
//! min/max peer counts and message framing. It reports what happens on the
//! wire as [`TransportEvent`]s and carries out [`TransportCommand`]s.
//!
use crate::networking::events::Severity;
use crate::networking::net_address::NetworkAddress;
use crate::networking::peer::PeerId;
use serde::Serialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub active: usize,
    pub pool: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// We opened a connection to `remote`.
    PeerConnect { peer: PeerId, remote: SocketAddr },
    /// `remote` connected to us and is waiting for the handshake.
    ListenConnect { peer: PeerId, remote: SocketAddr },
    PeerDisconnect { peer: PeerId },
    /// One unframed message.
    Message {
        peer: PeerId,
        command: String,
        payload: Vec<u8>,
    },
    Status(PoolStatus),
    Error { severity: Severity, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSelector {
    One(PeerId),
    Many(Vec<PeerId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Frame `payload` under `command` and send it to every selected peer.
    Send {
        peers: PeerSelector,
        command: String,
        payload: Vec<u8>,
    },
    AddPool(Vec<NetworkAddress>),
    DelActive { peer: PeerId, reason: String },
    Launch(Vec<String>),
    /// Close every connection, then drop the event sender.
    Shutdown,
}
