use crate::address_book::AddressBook;
use crate::alert_store::AlertStore;
use crate::crypto::generate_nonce;
use crate::networking::dispatcher::Dispatcher;
use crate::networking::events::{NetworkEvent, Severity};
use crate::networking::getdata::{GetDataError, GetDataResult, Responder};
use crate::networking::message_types::inventory_message::InventoryItem;
use crate::networking::message_types::ProtocolMessage;
use crate::networking::net_address::host_bytes;
use crate::networking::peer::{PeerId, PeerState, PeerType};
use crate::networking::timers::{TimerFired, TimerId, TimerKind, Timers};
use crate::networking::transport::{PeerSelector, TransportCommand, TransportEvent};
use crate::settings::NetworkSettings;
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, event, info, Level};

pub const ADDR_POLL_DELAY: Duration = Duration::from_secs(2);
pub const ADDR_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const ADDR_POLL_PEERS: usize = 5;
pub const ALERT_REBROADCAST_INTERVAL: Duration = Duration::from_secs(60 * 60);

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    New,
    Launching,
    Running,
    ShuttingDown,
}

/// What callers ask of the reactor through a [`NetworkHandle`].
#[derive(Debug)]
pub enum NetworkRequest {
    Launch(Vec<String>),
    Shutdown,
    GetData {
        peer: PeerId,
        items: Vec<InventoryItem>,
        force: bool,
        responder: Responder,
    },
    SetKnownHeight(i32),
    Send {
        peers: PeerSelector,
        message: ProtocolMessage,
    },
}

struct Inbox {
    requests: mpsc::UnboundedReceiver<NetworkRequest>,
    timers: mpsc::UnboundedReceiver<TimerFired>,
}

///
/// The protocol core. One task owns it and drives it with [`Network::run`];
/// everyone else talks to it through a [`NetworkHandle`] and listens to the
/// [`NetworkEvent`] broadcast.
///
pub struct Network {
    pub(crate) settings: NetworkSettings,
    state: NetworkState,
    pub(crate) nonce: [u8; 8],
    pub(crate) known_height: i32,
    pub(crate) external_address: Option<[u8; 16]>,
    pub(crate) peers: HashMap<PeerId, PeerState>,
    pub(crate) address_book: AddressBook,
    pub(crate) alert_store: AlertStore,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) timers: Timers,
    addr_poll: Option<TimerId>,
    alert_rebroadcast: Option<TimerId>,
    transport: mpsc::UnboundedSender<TransportCommand>,
    broadcast_channel_sender: broadcast::Sender<NetworkEvent>,
    request_sender: mpsc::UnboundedSender<NetworkRequest>,
    inbox: Option<Inbox>,
}

impl Network {
    /// Fails only if some supported command has no route.
    pub fn new(
        settings: NetworkSettings,
        transport: mpsc::UnboundedSender<TransportCommand>,
    ) -> crate::Result<Network> {
        let dispatcher = Dispatcher::new()?;
        let (timers, timer_receiver) = Timers::new();
        let (request_sender, request_receiver) = mpsc::unbounded_channel();
        let (broadcast_channel_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Network {
            known_height: settings.known_height,
            external_address: settings.external_ip.as_ref().map(host_bytes),
            settings,
            state: NetworkState::New,
            nonce: generate_nonce(),
            peers: HashMap::new(),
            address_book: AddressBook::new(),
            alert_store: AlertStore::new(),
            dispatcher,
            timers,
            addr_poll: None,
            alert_rebroadcast: None,
            transport,
            broadcast_channel_sender,
            request_sender,
            inbox: Some(Inbox {
                requests: request_receiver,
                timers: timer_receiver,
            }),
        })
    }

    pub fn handle(&self) -> NetworkHandle {
        NetworkHandle {
            requests: self.request_sender.clone(),
            broadcast_channel_sender: self.broadcast_channel_sender.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.broadcast_channel_sender.subscribe()
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: NetworkState) {
        debug!("network state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub fn nonce(&self) -> [u8; 8] {
        self.nonce
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.address_book
    }

    pub fn alert_store(&self) -> &AlertStore {
        &self.alert_store
    }

    ///
    /// Runs the reactor until the transport goes away. A shutdown request
    /// leaves it running so late callers still get an answer, and the
    /// transport is expected to close its event channel once it has stopped.
    /// All protocol state is touched from this one task.
    ///
    pub async fn run(
        mut self,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> crate::Result<()> {
        let Inbox {
            mut requests,
            timers: mut fired_timers,
        } = self.inbox.take().ok_or("network reactor is already running")?;

        loop {
            tokio::select! {
                //
                // Transport Events
                //
                transport_event = transport_events.recv() => {
                    match transport_event {
                        Some(transport_event) => self.handle_transport_event(transport_event),
                        None => {
                            info!("transport closed, stopping network");
                            self.shutdown();
                            break;
                        }
                    }
                }
                //
                // Caller Requests
                //
                Some(request) = requests.recv() => self.handle_request(request),
                //
                // Timers
                //
                Some(fired) = fired_timers.recv() => {
                    if self.timers.accept(&fired) {
                        self.handle_timer(fired.kind);
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_transport_event(&mut self, transport_event: TransportEvent) {
        match transport_event {
            TransportEvent::PeerConnect { peer, remote } => {
                self.start_handshake(peer, remote, PeerType::Outbound);
            }
            TransportEvent::ListenConnect { peer, remote } => {
                self.start_handshake(peer, remote, PeerType::Inbound);
            }
            TransportEvent::PeerDisconnect { peer } => {
                if let Some(peer_state) = self.peers.remove(&peer) {
                    debug!("peer {} disconnected", peer);
                    self.drop_peer_state(peer_state);
                }
            }
            TransportEvent::Message {
                peer,
                command,
                payload,
            } => self.dispatch(peer, command, payload),
            TransportEvent::Status(status) => self.publish(NetworkEvent::PeerStatus(status)),
            TransportEvent::Error { severity, message } => {
                self.publish(NetworkEvent::Error { severity, message })
            }
        }
    }

    fn handle_request(&mut self, request: NetworkRequest) {
        match request {
            NetworkRequest::Launch(seeds) => self.launch(seeds),
            NetworkRequest::Shutdown => self.shutdown(),
            NetworkRequest::GetData {
                peer,
                items,
                force,
                responder,
            } => self.request_data(peer, items, force, responder),
            NetworkRequest::SetKnownHeight(height) => self.known_height = height,
            NetworkRequest::Send { peers, message } => self.send(peers, &message),
        }
    }

    fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::HandshakeWatchdog(peer) => self.handshake_timed_out(peer),
            TimerKind::GetDataDebounce(peer) => {
                if let Some(peer_state) = self.peers.get_mut(&peer) {
                    peer_state.getdata.debounce = None;
                }
                self.flush_getdata(peer);
            }
            TimerKind::GetDataWatchdog(peer) => self.getdata_timed_out(peer),
            TimerKind::AddrPoll => {
                self.addr_poll = None;
                self.poll_addresses();
            }
            TimerKind::AlertRebroadcast => {
                self.alert_rebroadcast = None;
                self.rebroadcast_alerts();
            }
        }
    }

    fn launch(&mut self, seeds: Vec<String>) {
        if self.state != NetworkState::New {
            debug!("launch ignored in state {:?}", self.state);
            return;
        }
        let seeds = if seeds.is_empty() {
            self.settings.seeds.clone()
        } else {
            seeds
        };
        self.set_state(NetworkState::Launching);
        self.transport_command(TransportCommand::Launch(seeds));
        self.publish(NetworkEvent::Launched);
    }

    ///
    /// Stops periodic work, fails every get-data request that has not
    /// completed and tells the transport to close its connections.
    ///
    fn shutdown(&mut self) {
        if self.state == NetworkState::ShuttingDown {
            return;
        }
        self.set_state(NetworkState::ShuttingDown);
        for timer in [self.addr_poll.take(), self.alert_rebroadcast.take()]
            .iter()
            .flatten()
        {
            self.timers.cancel(*timer);
        }

        let peers: Vec<PeerId> = self.peers.keys().copied().collect();
        for peer in peers {
            self.flush_getdata(peer);
            let timers = match self.peers.get_mut(&peer) {
                Some(peer_state) => peer_state.getdata.fail_all(GetDataError::ShutdownInProgress),
                None => vec![],
            };
            for timer in timers {
                self.timers.cancel(timer);
            }
        }
        self.transport_command(TransportCommand::Shutdown);
    }

    /// Cancels a departed peer's timers and fails its get-data callers.
    pub(crate) fn drop_peer_state(&mut self, mut peer_state: PeerState) {
        if let Some(timer) = peer_state.handshake_watchdog.take() {
            self.timers.cancel(timer);
        }
        for timer in peer_state.getdata.fail_all(GetDataError::PeerDisconnected) {
            self.timers.cancel(timer);
        }
    }

    pub(crate) fn start_periodic_tasks(&mut self) {
        if self.addr_poll.is_none() {
            self.addr_poll = Some(self.timers.schedule(ADDR_POLL_DELAY, TimerKind::AddrPoll));
        }
        if self.alert_rebroadcast.is_none() {
            self.alert_rebroadcast = Some(
                self.timers
                    .schedule(ALERT_REBROADCAST_INTERVAL, TimerKind::AlertRebroadcast),
            );
        }
    }

    pub fn active_peers(&self) -> Vec<PeerId> {
        let mut active: Vec<PeerId> = self
            .peers
            .values()
            .filter(|peer_state| peer_state.is_active())
            .map(|peer_state| peer_state.id)
            .collect();
        active.sort();
        active
    }

    /// Sends `getaddr` to a few random active peers.
    fn poll_addresses(&mut self) {
        let active = self.active_peers();
        let chosen: Vec<PeerId> = active
            .choose_multiple(&mut rand::thread_rng(), ADDR_POLL_PEERS)
            .copied()
            .collect();

        if chosen.is_empty() {
            self.notice(Severity::Info, String::from("No peers available to poll for peers"));
        } else {
            let count = chosen.len();
            self.send(PeerSelector::Many(chosen), &ProtocolMessage::GetAddr);
            self.notice(Severity::Info, format!("Sent GETADDR to {} peers", count));
        }
        self.addr_poll = Some(self.timers.schedule(ADDR_POLL_INTERVAL, TimerKind::AddrPoll));
    }

    /// Shows and relays every live alert to every active peer.
    fn rebroadcast_alerts(&mut self) {
        let pruned = self.alert_store.prune_expired(Utc::now());
        if pruned > 0 {
            debug!("dropped {} expired alerts", pruned);
        }
        let active = self.active_peers();
        let alerts: Vec<_> = self.alert_store.alerts().cloned().collect();
        for alert in alerts {
            if let Some(details) = &alert.details {
                self.notice(Severity::Warning, details.status_bar.clone());
            }
            if !active.is_empty() {
                self.send(PeerSelector::Many(active.clone()), &ProtocolMessage::Alert(alert));
            }
        }
        self.alert_rebroadcast = Some(
            self.timers
                .schedule(ALERT_REBROADCAST_INTERVAL, TimerKind::AlertRebroadcast),
        );
    }

    pub(crate) fn publish(&self, network_event: NetworkEvent) {
        // no subscribers is fine
        let _ = self.broadcast_channel_sender.send(network_event);
    }

    /// Operational notices go to the log and to subscribers.
    pub(crate) fn notice(&self, severity: Severity, message: String) {
        match severity {
            Severity::Error => event!(Level::ERROR, "{}", message),
            Severity::Warning => event!(Level::WARN, "{}", message),
            _ => event!(Level::INFO, "{}", message),
        }
        self.publish(NetworkEvent::Error { severity, message });
    }

    pub(crate) fn transport_command(&self, command: TransportCommand) {
        if self.transport.send(command).is_err() {
            error!("transport is gone, dropping command");
        }
    }

    pub(crate) fn send(&self, peers: PeerSelector, message: &ProtocolMessage) {
        self.send_raw(peers, message.command().as_str(), message.serialize());
    }

    pub(crate) fn send_raw(&self, peers: PeerSelector, command: &str, payload: Vec<u8>) {
        self.transport_command(TransportCommand::Send {
            peers,
            command: String::from(command),
            payload,
        });
    }
}

///
/// Cheap to clone. Every method only queues a request for the reactor, so
/// they all fail once the reactor has stopped.
///
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    requests: mpsc::UnboundedSender<NetworkRequest>,
    broadcast_channel_sender: broadcast::Sender<NetworkEvent>,
}

impl NetworkHandle {
    fn request(&self, request: NetworkRequest) -> crate::Result<()> {
        self.requests
            .send(request)
            .map_err(|_| "network is no longer running")?;
        Ok(())
    }

    /// An empty `seeds` falls back to the configured seeds.
    pub fn launch(&self, seeds: Vec<String>) -> crate::Result<()> {
        self.request(NetworkRequest::Launch(seeds))
    }

    pub fn shutdown(&self) -> crate::Result<()> {
        self.request(NetworkRequest::Shutdown)
    }

    pub fn set_known_height(&self, height: i32) -> crate::Result<()> {
        self.request(NetworkRequest::SetKnownHeight(height))
    }

    pub fn send(&self, peers: PeerSelector, message: ProtocolMessage) -> crate::Result<()> {
        self.request(NetworkRequest::Send { peers, message })
    }

    ///
    /// Asks `peer` for `items` as part of its next `getdata` batch. The
    /// result holds one entry per reply, `None` for items reported missing.
    ///
    pub async fn get_data(
        &self,
        peer: PeerId,
        items: Vec<InventoryItem>,
        force: bool,
    ) -> GetDataResult {
        let (responder, result) = oneshot::channel();
        self.requests
            .send(NetworkRequest::GetData {
                peer,
                items,
                force,
                responder,
            })
            .map_err(|_| GetDataError::NetworkStopped)?;
        result.await.map_err(|_| GetDataError::NetworkStopped)?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.broadcast_channel_sender.subscribe()
    }
}
