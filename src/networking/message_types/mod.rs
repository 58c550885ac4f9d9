pub mod addr_message;
pub mod alert_message;
pub mod block_locator_message;
pub mod headers_message;
pub mod inventory_message;
pub mod ping_message;
pub mod transaction_message;
pub mod version_message;

use crate::networking::command::Command;
use addr_message::AddrMessage;
use alert_message::Alert;
use block_locator_message::BlockLocatorMessage;
use headers_message::HeadersMessage;
use inventory_message::InventoryMessage;
use ping_message::PingMessage;
use serde::Serialize;
use transaction_message::Transaction;
use version_message::VersionMessage;

/// A decoded payload, one variant per supported [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "data", rename_all = "lowercase")]
pub enum ProtocolMessage {
    Version(VersionMessage),
    Verack,
    Addr(AddrMessage),
    GetAddr,
    Alert(Alert),
    GetBlocks(BlockLocatorMessage),
    GetHeaders(BlockLocatorMessage),
    Headers(HeadersMessage),
    Inv(InventoryMessage),
    NotFound(InventoryMessage),
    Ping(PingMessage),
    Pong(PingMessage),
    Tx(Transaction),
}

impl ProtocolMessage {
    pub fn command(&self) -> Command {
        match self {
            ProtocolMessage::Version(_) => Command::Version,
            ProtocolMessage::Verack => Command::Verack,
            ProtocolMessage::Addr(_) => Command::Addr,
            ProtocolMessage::GetAddr => Command::GetAddr,
            ProtocolMessage::Alert(_) => Command::Alert,
            ProtocolMessage::GetBlocks(_) => Command::GetBlocks,
            ProtocolMessage::GetHeaders(_) => Command::GetHeaders,
            ProtocolMessage::Headers(_) => Command::Headers,
            ProtocolMessage::Inv(_) => Command::Inv,
            ProtocolMessage::NotFound(_) => Command::NotFound,
            ProtocolMessage::Ping(_) => Command::Ping,
            ProtocolMessage::Pong(_) => Command::Pong,
            ProtocolMessage::Tx(_) => Command::Tx,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            ProtocolMessage::Version(version) => version.serialize(),
            ProtocolMessage::Verack | ProtocolMessage::GetAddr => vec![],
            ProtocolMessage::Addr(addr) => addr.serialize(),
            ProtocolMessage::Alert(alert) => alert.serialize(),
            ProtocolMessage::GetBlocks(locator) | ProtocolMessage::GetHeaders(locator) => {
                locator.serialize()
            }
            ProtocolMessage::Headers(headers) => headers.serialize(),
            ProtocolMessage::Inv(inv) | ProtocolMessage::NotFound(inv) => inv.serialize(),
            ProtocolMessage::Ping(ping) | ProtocolMessage::Pong(ping) => ping.serialize(),
            ProtocolMessage::Tx(transaction) => transaction.serialize(),
        }
    }
}
