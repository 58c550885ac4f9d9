use crate::address_book::MAX_ADDR_ENTRIES;
use crate::networking::dispatcher::Propagation;
use crate::networking::events::{NetworkEvent, Severity};
use crate::networking::getdata::InventoryReply;
use crate::networking::message_types::addr_message::AddrMessage;
use crate::networking::message_types::inventory_message::InventoryType;
use crate::networking::message_types::ProtocolMessage;
use crate::networking::network::Network;
use crate::networking::peer::PeerId;
use crate::networking::transport::{PeerSelector, TransportCommand};
use chrono::Utc;
use tracing::{debug, event, Level};

pub fn handle_version(
    network: &mut Network,
    peer: PeerId,
    message: &ProtocolMessage,
) -> Propagation {
    match message {
        ProtocolMessage::Version(version) => network.receive_version(peer, version),
        _ => Propagation::Publish,
    }
}

pub fn handle_verack(
    network: &mut Network,
    peer: PeerId,
    _message: &ProtocolMessage,
) -> Propagation {
    network.receive_verack(peer);
    Propagation::Publish
}

/// New addresses go to the transport's pool of dial candidates.
pub fn handle_addr(
    network: &mut Network,
    peer: PeerId,
    message: &ProtocolMessage,
) -> Propagation {
    if let ProtocolMessage::Addr(addr) = message {
        debug!("{} sent {} addresses", peer, addr.addrs.len());
        network.transport_command(TransportCommand::AddPool(addr.addrs.clone()));
    }
    Propagation::Publish
}

/// Answers with the address book, pruned first. Nothing is sent when the
/// book is empty.
pub fn handle_getaddr(
    network: &mut Network,
    peer: PeerId,
    _message: &ProtocolMessage,
) -> Propagation {
    let pruned = network.address_book.prune(Utc::now());
    if pruned > 0 {
        debug!("pruned {} known peers", pruned);
    }
    let addrs = network.address_book.entries(MAX_ADDR_ENTRIES);
    if !addrs.is_empty() {
        network.send(
            PeerSelector::One(peer),
            &ProtocolMessage::Addr(AddrMessage::new(addrs)),
        );
    }
    Propagation::Publish
}

///
/// Stores a new alert and shows its status bar text. Alerts of another
/// version and expired alerts are dropped before they reach subscribers.
///
pub fn handle_alert(
    network: &mut Network,
    peer: PeerId,
    message: &ProtocolMessage,
) -> Propagation {
    let alert = match message {
        ProtocolMessage::Alert(alert) => alert.clone(),
        _ => return Propagation::Publish,
    };
    let status_bar = alert
        .details
        .as_ref()
        .map(|details| details.status_bar.clone())
        .unwrap_or_default();

    match network.alert_store.insert(alert, Utc::now()) {
        Ok(cancelled) => {
            if !cancelled.is_empty() {
                event!(Level::INFO, "alert from {} cancelled {:?}", peer, cancelled);
            }
            network.notice(Severity::Warning, status_bar);
            Propagation::Publish
        }
        Err(err) => {
            debug!("ignoring alert from {}: {}", peer, err);
            Propagation::Veto
        }
    }
}

pub fn handle_inv(
    network: &mut Network,
    peer: PeerId,
    message: &ProtocolMessage,
) -> Propagation {
    if let ProtocolMessage::Inv(inv) = message {
        for item in inv.items.iter() {
            match item.kind {
                InventoryType::Transaction => network.publish(NetworkEvent::TransactionInv {
                    peer,
                    hash: item.hash,
                }),
                InventoryType::Block => network.publish(NetworkEvent::BlockInv {
                    peer,
                    hash: item.hash,
                }),
                InventoryType::Unknown => {}
            }
        }
    }
    Propagation::Publish
}

pub fn handle_notfound(
    network: &mut Network,
    peer: PeerId,
    message: &ProtocolMessage,
) -> Propagation {
    if let ProtocolMessage::NotFound(notfound) = message {
        network.receive_notfound(peer, notfound.items.len());
    }
    Propagation::Publish
}

pub fn handle_ping(
    network: &mut Network,
    peer: PeerId,
    message: &ProtocolMessage,
) -> Propagation {
    if let ProtocolMessage::Ping(ping) = message {
        network.send(PeerSelector::One(peer), &ProtocolMessage::Pong(*ping));
    }
    Propagation::Publish
}

pub fn handle_tx(
    network: &mut Network,
    peer: PeerId,
    message: &ProtocolMessage,
) -> Propagation {
    if let ProtocolMessage::Tx(transaction) = message {
        network.receive_getdata_item(peer, InventoryReply::Transaction(transaction.clone()));
    }
    Propagation::Publish
}
