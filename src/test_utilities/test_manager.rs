use crate::networking::events::NetworkEvent;
use crate::networking::message_types::version_message::VersionMessage;
use crate::networking::network::{Network, NetworkHandle};
use crate::networking::peer::PeerId;
use crate::networking::transport::{TransportCommand, TransportEvent};
use crate::settings::NetworkSettings;

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;

///
/// Plays the transport for a running [`Network`]: feeds it events and
/// collects the commands it sends back.
///
#[derive(Debug)]
pub struct TestManager {
    pub handle: NetworkHandle,
    pub nonce: [u8; 8],
    pub last_version: Option<VersionMessage>,
    transport_events: mpsc::UnboundedSender<TransportEvent>,
    transport_commands: mpsc::UnboundedReceiver<TransportCommand>,
    events: broadcast::Receiver<NetworkEvent>,
}

impl TestManager {
    pub fn new() -> Self {
        TestManager::with_settings(NetworkSettings::default())
    }

    pub fn with_settings(settings: NetworkSettings) -> Self {
        let (transport_sender, transport_commands) = mpsc::unbounded_channel();
        let (transport_events, transport_receiver) = mpsc::unbounded_channel();
        let network = Network::new(settings, transport_sender).unwrap();
        let manager = TestManager {
            handle: network.handle(),
            nonce: network.nonce(),
            last_version: None,
            transport_events,
            transport_commands,
            events: network.subscribe(),
        };
        tokio::spawn(network.run(transport_receiver));
        manager
    }

    pub fn send_event(&self, event: TransportEvent) {
        self.transport_events.send(event).unwrap();
    }

    pub fn deliver(&self, peer: PeerId, command: &str, payload: Vec<u8>) {
        self.send_event(TransportEvent::Message {
            peer,
            command: String::from(command),
            payload,
        });
    }

    pub fn disconnect(&self, peer: PeerId) {
        self.send_event(TransportEvent::PeerDisconnect { peer });
    }

    /// Opens an outbound connection and swallows the `version` we send.
    pub async fn connect_peer(&mut self, remote: &str) -> PeerId {
        let peer = PeerId::new();
        self.send_event(TransportEvent::PeerConnect {
            peer,
            remote: remote.parse().unwrap(),
        });
        let (command, payload) = self.expect_send().await;
        assert_eq!(command, "version");
        self.last_version = Some(VersionMessage::deserialize(&payload).unwrap());
        peer
    }

    /// Connects and completes the handshake with a `verack`.
    pub async fn connect_active_peer(&mut self, remote: &str) -> PeerId {
        let peer = self.connect_peer(remote).await;
        self.deliver(peer, "verack", vec![]);
        sleep(Duration::from_millis(1)).await;
        peer
    }

    pub async fn next_command(&mut self) -> TransportCommand {
        self.transport_commands.recv().await.unwrap()
    }

    pub fn try_next_command(&mut self) -> Option<TransportCommand> {
        self.transport_commands.try_recv().ok()
    }

    pub fn drain_commands(&mut self) -> Vec<TransportCommand> {
        let mut commands = vec![];
        while let Ok(command) = self.transport_commands.try_recv() {
            commands.push(command);
        }
        commands
    }

    pub async fn expect_send(&mut self) -> (String, Vec<u8>) {
        match self.next_command().await {
            TransportCommand::Send {
                command, payload, ..
            } => (command, payload),
            other => panic!("expected a send, got {:?}", other),
        }
    }

    pub fn expect_send_now(&mut self) -> (String, Vec<u8>) {
        match self.try_next_command() {
            Some(TransportCommand::Send {
                command, payload, ..
            }) => (command, payload),
            other => panic!("expected a send, got {:?}", other),
        }
    }

    pub async fn next_event_matching<F>(&mut self, predicate: F) -> NetworkEvent
    where
        F: Fn(&NetworkEvent) -> bool,
    {
        loop {
            let event = self.events.recv().await.unwrap();
            if predicate(&event) {
                return event;
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<NetworkEvent> {
        let mut events = vec![];
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
