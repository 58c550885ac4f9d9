use crate::crypto::{serialize_hex, Sha256Hash};
use crate::networking::message_types::ProtocolMessage;
use crate::networking::peer::PeerId;
use crate::networking::transport::PoolStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Advisory only: every severity is handled the same way internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Notice,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageData {
    Parsed(ProtocolMessage),
    Raw(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
}

///
/// Everything the network publishes to subscribers. Convention has generic
/// events first, then the per-command ones.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum NetworkEvent {
    Error {
        severity: Severity,
        message: String,
    },
    PeerStatus(PoolStatus),
    Launched,
    Running,
    // every message, parsed or not
    Message {
        peer: PeerId,
        command: String,
        data: MessageData,
    },
    // one per supported command, carrying the decoded record
    Protocol {
        peer: PeerId,
        message: ProtocolMessage,
    },
    // a command without a parser, carrying the raw payload
    Unparsed {
        peer: PeerId,
        command: String,
        #[serde(serialize_with = "serialize_hex")]
        payload: Vec<u8>,
    },
    TransactionInv {
        peer: PeerId,
        #[serde(serialize_with = "serialize_hex")]
        hash: Sha256Hash,
    },
    BlockInv {
        peer: PeerId,
        #[serde(serialize_with = "serialize_hex")]
        hash: Sha256Hash,
    },
}
