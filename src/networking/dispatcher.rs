use crate::networking::command::Command;
use crate::networking::cursor::DecodeError;
use crate::networking::events::{MessageData, NetworkEvent};
use crate::networking::getdata::{InventoryReply, BLOCK_COMMAND};
use crate::networking::handlers;
use crate::networking::message_types::addr_message::AddrMessage;
use crate::networking::message_types::alert_message::Alert;
use crate::networking::message_types::block_locator_message::BlockLocatorMessage;
use crate::networking::message_types::headers_message::HeadersMessage;
use crate::networking::message_types::inventory_message::InventoryMessage;
use crate::networking::message_types::ping_message::PingMessage;
use crate::networking::message_types::transaction_message::Transaction;
use crate::networking::message_types::version_message::VersionMessage;
use crate::networking::message_types::ProtocolMessage;
use crate::networking::network::Network;
use crate::networking::peer::PeerId;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatcherError {
    #[error("no route for supported command {0}")]
    MissingRoute(Command),
}

/// Whether a handled message is passed on to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Publish,
    Veto,
}

pub type Parser = fn(&[u8]) -> Result<ProtocolMessage, DecodeError>;
pub type Handler = fn(&mut Network, PeerId, &ProtocolMessage) -> Propagation;

#[derive(Clone, Copy)]
pub struct Route {
    pub parse: Parser,
    pub handle: Option<Handler>,
}

fn parse_version(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    VersionMessage::deserialize(bytes).map(ProtocolMessage::Version)
}

/// `verack` and `getaddr` carry nothing.
fn parse_verack(_bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    Ok(ProtocolMessage::Verack)
}

fn parse_getaddr(_bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    Ok(ProtocolMessage::GetAddr)
}

fn parse_addr(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    AddrMessage::deserialize(bytes).map(ProtocolMessage::Addr)
}

fn parse_alert(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    Alert::deserialize(bytes).map(ProtocolMessage::Alert)
}

fn parse_getblocks(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    BlockLocatorMessage::deserialize(bytes).map(ProtocolMessage::GetBlocks)
}

fn parse_getheaders(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    BlockLocatorMessage::deserialize(bytes).map(ProtocolMessage::GetHeaders)
}

fn parse_headers(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    HeadersMessage::deserialize(bytes).map(ProtocolMessage::Headers)
}

fn parse_inv(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    InventoryMessage::deserialize(bytes).map(ProtocolMessage::Inv)
}

fn parse_notfound(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    InventoryMessage::deserialize(bytes).map(ProtocolMessage::NotFound)
}

fn parse_ping(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    PingMessage::deserialize(bytes).map(ProtocolMessage::Ping)
}

fn parse_pong(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    PingMessage::deserialize(bytes).map(ProtocolMessage::Pong)
}

fn parse_tx(bytes: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    Transaction::deserialize(bytes).map(ProtocolMessage::Tx)
}

fn route(parse: Parser, handle: Option<Handler>) -> Route {
    Route { parse, handle }
}

/// The parser and optional handler for every supported command.
pub fn routes() -> Vec<(Command, Route)> {
    vec![
        (Command::Version, route(parse_version, Some(handlers::handle_version))),
        (Command::Verack, route(parse_verack, Some(handlers::handle_verack))),
        (Command::Addr, route(parse_addr, Some(handlers::handle_addr))),
        (Command::GetAddr, route(parse_getaddr, Some(handlers::handle_getaddr))),
        (Command::Alert, route(parse_alert, Some(handlers::handle_alert))),
        (Command::GetBlocks, route(parse_getblocks, None)),
        (Command::GetHeaders, route(parse_getheaders, None)),
        (Command::Headers, route(parse_headers, None)),
        (Command::Inv, route(parse_inv, Some(handlers::handle_inv))),
        (Command::NotFound, route(parse_notfound, Some(handlers::handle_notfound))),
        (Command::Ping, route(parse_ping, Some(handlers::handle_ping))),
        (Command::Pong, route(parse_pong, None)),
        (Command::Tx, route(parse_tx, Some(handlers::handle_tx))),
    ]
}

///
/// Maps command names to their routes. Built once and checked against
/// [`Command::ALL`] so a supported command can never go unrouted.
///
pub struct Dispatcher {
    routes: HashMap<Command, Route>,
}

impl Dispatcher {
    pub fn new() -> Result<Dispatcher, DispatcherError> {
        Dispatcher::from_routes(routes())
    }

    pub fn from_routes(table: Vec<(Command, Route)>) -> Result<Dispatcher, DispatcherError> {
        let routes: HashMap<Command, Route> = table.into_iter().collect();
        for command in Command::ALL.iter() {
            if !routes.contains_key(command) {
                return Err(DispatcherError::MissingRoute(*command));
            }
        }
        Ok(Dispatcher { routes })
    }

    pub fn route(&self, command: &str) -> Option<Route> {
        Command::from_str(command)
            .ok()
            .and_then(|command| self.routes.get(&command).copied())
    }

    /// Runs the parser for `command` without any handler.
    pub fn parse(&self, command: &str, payload: &[u8]) -> Result<ProtocolMessage, DecodeError> {
        match self.route(command) {
            Some(route) => (route.parse)(payload),
            None => Err(DecodeError::UnknownCommand(command.to_string())),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<&Command> = self.routes.keys().collect();
        commands.sort();
        f.debug_struct("Dispatcher").field("commands", &commands).finish()
    }
}

impl Network {
    ///
    /// Delivers one message from `peer`. Supported commands are parsed, handed
    /// to their handler and published twice: as a generic message and as a
    /// typed protocol event. A payload that fails to parse is dropped without
    /// any event. Other commands are published with their raw payload.
    ///
    pub(crate) fn dispatch(&mut self, peer: PeerId, command: String, payload: Vec<u8>) {
        let route = match self.dispatcher.route(&command) {
            Some(route) => route,
            None => {
                if command == BLOCK_COMMAND {
                    self.receive_getdata_item(peer, InventoryReply::Block(payload.clone()));
                }
                self.publish(NetworkEvent::Message {
                    peer,
                    command: command.clone(),
                    data: MessageData::Raw(payload.clone()),
                });
                self.publish(NetworkEvent::Unparsed {
                    peer,
                    command,
                    payload,
                });
                return;
            }
        };

        let message = match (route.parse)(&payload) {
            Ok(message) => message,
            Err(err) => {
                debug!("dropping {} from {}: {}", command, peer, err);
                return;
            }
        };
        if let Some(handle) = route.handle {
            if handle(self, peer, &message) == Propagation::Veto {
                return;
            }
        }

        self.publish(NetworkEvent::Message {
            peer,
            command,
            data: MessageData::Parsed(message.clone()),
        });
        self.publish(NetworkEvent::Protocol { peer, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::message_types::version_message::VERSION_70001;
    use crate::test_utilities::test_manager::TestManager;
    use tokio::time::{sleep, Duration};

    #[test]
    fn test_every_command_has_a_route() {
        let dispatcher = Dispatcher::new().unwrap();
        for command in Command::ALL.iter() {
            assert!(dispatcher.route(command.as_str()).is_some());
        }
        assert!(dispatcher.route("block").is_none());
    }

    #[test]
    fn test_missing_route_is_detected() {
        let table: Vec<(Command, Route)> = routes()
            .into_iter()
            .filter(|(command, _)| *command != Command::Headers)
            .collect();
        assert_eq!(
            Dispatcher::from_routes(table).unwrap_err(),
            DispatcherError::MissingRoute(Command::Headers)
        );
    }

    #[test]
    fn test_parse_by_command_name() {
        let dispatcher = Dispatcher::new().unwrap();
        let payload = hex::decode(VERSION_70001).unwrap();
        match dispatcher.parse("version", &payload).unwrap() {
            ProtocolMessage::Version(version) => assert_eq!(version.height, 280556),
            other => panic!("unexpected message {:?}", other),
        }
        assert!(dispatcher.parse("version", &payload[..50]).is_err());
        assert_eq!(
            dispatcher.parse("mempool", &[]).unwrap_err(),
            DecodeError::UnknownCommand(String::from("mempool"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_parsed_messages_are_published_twice() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;
        manager.drain_events();

        manager.deliver(peer, "pong", vec![1, 2, 3, 4, 5, 6, 7, 8]);
        sleep(Duration::from_millis(1)).await;

        let pong = ProtocolMessage::Pong(PingMessage::new([1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(
            manager.drain_events(),
            vec![
                NetworkEvent::Message {
                    peer,
                    command: String::from("pong"),
                    data: MessageData::Parsed(pong.clone()),
                },
                NetworkEvent::Protocol {
                    peer,
                    message: pong
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_commands_pass_through_raw() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;
        manager.drain_events();

        manager.deliver(peer, "mempool", vec![9, 9]);
        sleep(Duration::from_millis(1)).await;

        assert_eq!(
            manager.drain_events(),
            vec![
                NetworkEvent::Message {
                    peer,
                    command: String::from("mempool"),
                    data: MessageData::Raw(vec![9, 9]),
                },
                NetworkEvent::Unparsed {
                    peer,
                    command: String::from("mempool"),
                    payload: vec![9, 9],
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_truncated_payload_is_dropped_silently() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;
        manager.drain_events();

        manager.deliver(peer, "ping", vec![1, 2, 3]);
        sleep(Duration::from_millis(1)).await;

        assert!(manager.drain_events().is_empty());
        assert_eq!(manager.try_next_command(), None);
    }
}
