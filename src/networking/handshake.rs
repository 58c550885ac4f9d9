//!
//! VERSION/VERACK exchange.
//!
//! Every new connection, ours or theirs, gets our `version` right away and
//! moves to awaiting-verack with a 10 second watchdog. The peer becomes
//! active on its `verack` or on a `version` of its own. The first peer to
//! become active while launching puts the network into the running state.
//!
use crate::networking::dispatcher::Propagation;
use crate::networking::events::{NetworkEvent, Severity};
use crate::networking::message_types::version_message::VersionMessage;
use crate::networking::message_types::ProtocolMessage;
use crate::networking::net_address::{render_host, NetworkAddress};
use crate::networking::network::{Network, NetworkState};
use crate::networking::peer::{HandshakeState, PeerId, PeerInfo, PeerState, PeerType};
use crate::networking::timers::TimerKind;
use crate::networking::transport::{PeerSelector, TransportCommand};
use crate::settings::DEFAULT_SERVICES;
use crate::time::{datetime_from_unix, WireTime};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{event, info, Level};

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub const SELF_CONNECTION_REASON: &str = "connected to self";
pub const NO_VERACK_REASON: &str = "Failed to send VERACK after VERSION message";
pub const NO_VERSION_REASON: &str = "No VERSION message received from remote peer";

impl Network {
    /// The `version` this node sends to a peer reached at `remote`.
    pub fn version_message(&self, remote: &SocketAddr) -> VersionMessage {
        let now = Utc::now().timestamp();
        VersionMessage {
            version: self.settings.version,
            services: self.settings.services,
            time: datetime_from_unix(now)
                .map(WireTime::from)
                .unwrap_or_else(|| WireTime::from_le_bytes((now as u64).to_le_bytes())),
            addr_recv: NetworkAddress::from_socket_addr(remote, Some(DEFAULT_SERVICES), None),
            addr_from: NetworkAddress::new(
                self.external_address.unwrap_or([0; 16]),
                0,
                Some(self.settings.services),
                None,
            ),
            nonce: self.nonce,
            client: self.settings.client_name.clone(),
            height: self.known_height,
            relay: None,
        }
    }

    pub(crate) fn start_handshake(
        &mut self,
        peer: PeerId,
        remote: SocketAddr,
        peer_type: PeerType,
    ) {
        let version = self.version_message(&remote);
        self.send(PeerSelector::One(peer), &ProtocolMessage::Version(version));

        let watchdog = self
            .timers
            .schedule(HANDSHAKE_TIMEOUT, TimerKind::HandshakeWatchdog(peer));
        let mut peer_state = PeerState::new(peer, remote, peer_type);
        peer_state.handshake = HandshakeState::AwaitingVerack;
        peer_state.handshake_watchdog = Some(watchdog);
        if let Some(replaced) = self.peers.insert(peer, peer_state) {
            self.drop_peer_state(replaced);
        }
        event!(Level::DEBUG, "sent version to {} at {}", peer, remote);
    }

    pub(crate) fn receive_version(
        &mut self,
        peer: PeerId,
        version: &VersionMessage,
    ) -> Propagation {
        if version.nonce == self.nonce {
            self.transport_command(TransportCommand::DelActive {
                peer,
                reason: String::from(SELF_CONNECTION_REASON),
            });
            return Propagation::Veto;
        }
        if !self.peers.contains_key(&peer) {
            event!(Level::WARN, "version from unknown peer {}", peer);
            return Propagation::Publish;
        }

        self.send(PeerSelector::One(peer), &ProtocolMessage::Verack);

        let observed = version.addr_recv.host_raw;
        if !version.addr_recv.ip().is_unspecified() && self.external_address != Some(observed) {
            self.external_address = Some(observed);
            self.notice(
                Severity::Info,
                format!("External address discovered to be {}", render_host(&observed)),
            );
        }

        if let Some(peer_state) = self.peers.get_mut(&peer) {
            peer_state.info = Some(PeerInfo::from(version));
        }
        self.mark_active(peer);
        Propagation::Publish
    }

    pub(crate) fn receive_verack(&mut self, peer: PeerId) {
        self.mark_active(peer);
    }

    ///
    /// Promotes `peer` to active. Repeated calls only refresh its address
    /// book entry.
    ///
    fn mark_active(&mut self, peer: PeerId) {
        let (remote, services, watchdog) = match self.peers.get_mut(&peer) {
            Some(peer_state) => {
                peer_state.handshake = HandshakeState::Active;
                (
                    peer_state.remote,
                    peer_state.services(),
                    peer_state.handshake_watchdog.take(),
                )
            }
            None => return,
        };
        if let Some(watchdog) = watchdog {
            self.timers.cancel(watchdog);
        }
        self.address_book.record(&remote, services, Utc::now());

        if self.state() == NetworkState::Launching {
            info!("first peer {} is active, network is running", peer);
            self.set_state(NetworkState::Running);
            self.publish(NetworkEvent::Running);
            self.start_periodic_tasks();
        }
    }

    pub(crate) fn handshake_timed_out(&mut self, peer: PeerId) {
        let reason = match self.peers.get_mut(&peer) {
            Some(peer_state) if !peer_state.is_active() => {
                peer_state.handshake_watchdog = None;
                match peer_state.peer_type {
                    PeerType::Outbound => NO_VERACK_REASON,
                    PeerType::Inbound => NO_VERSION_REASON,
                }
            }
            _ => return,
        };
        event!(Level::INFO, "dropping {}: {}", peer, reason);
        self.transport_command(TransportCommand::DelActive {
            peer,
            reason: String::from(reason),
        });
    }
}
