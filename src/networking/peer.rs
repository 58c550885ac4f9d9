use crate::networking::getdata::GetDataBatch;
use crate::networking::message_types::version_message::VersionMessage;
use crate::networking::timers::TimerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use uuid::Uuid;

/// Identifies one connection. Handed out by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(Uuid);

impl PeerId {
    pub fn new() -> PeerId {
        PeerId(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        PeerId::new()
    }
}

impl From<Uuid> for PeerId {
    fn from(uuid: Uuid) -> Self {
        PeerId(uuid)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// PeerType indicates whether we dialed this peer or it came to us via an
/// inbound connection.
#[derive(Serialize, Deserialize, Debug, Copy, PartialEq, Eq, Clone)]
pub enum PeerType {
    Outbound,
    Inbound,
}

#[derive(Serialize, Deserialize, Debug, Copy, PartialEq, Eq, Clone)]
pub enum HandshakeState {
    New,
    AwaitingVerack,
    Active,
}

/// What the peer told us about itself in its `version` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub version: i32,
    pub services: u64,
    pub nonce: [u8; 8],
    pub client: String,
    pub height: i32,
}

impl From<&VersionMessage> for PeerInfo {
    fn from(version: &VersionMessage) -> Self {
        PeerInfo {
            version: version.version,
            services: version.services,
            nonce: version.nonce,
            client: version.client.clone(),
            height: version.height,
        }
    }
}

///
/// Protocol state for one connection. Created when the transport reports the
/// connection and dropped when it reports the disconnect.
///
#[derive(Debug)]
pub struct PeerState {
    pub id: PeerId,
    pub remote: SocketAddr,
    pub peer_type: PeerType,
    pub handshake: HandshakeState,
    pub info: Option<PeerInfo>,
    pub handshake_watchdog: Option<TimerId>,
    pub getdata: GetDataBatch,
}

impl PeerState {
    pub fn new(id: PeerId, remote: SocketAddr, peer_type: PeerType) -> PeerState {
        PeerState {
            id,
            remote,
            peer_type,
            handshake: HandshakeState::New,
            info: None,
            handshake_watchdog: None,
            getdata: GetDataBatch::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handshake == HandshakeState::Active
    }

    pub fn services(&self) -> u64 {
        self.info.as_ref().map(|info| info.services).unwrap_or(0)
    }
}
