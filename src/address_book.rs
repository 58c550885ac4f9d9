use crate::networking::net_address::{host_bytes, NetworkAddress};
use chrono::{DateTime, Duration, Utc};
use std::net::SocketAddr;

/// Entries unseen for longer than this are forgotten.
pub const STALE_AFTER_HOURS: i64 = 3;
/// Most entries one `addr` reply carries.
pub const MAX_ADDR_ENTRIES: usize = 1000;

/// A peer that completed the handshake with us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPeer {
    pub host_raw: [u8; 16],
    pub port: u16,
    pub services: u64,
    pub last_seen: DateTime<Utc>,
}

impl KnownPeer {
    pub fn address(&self) -> NetworkAddress {
        NetworkAddress::new(
            self.host_raw,
            self.port,
            Some(self.services),
            Some(self.last_seen),
        )
    }
}

///
/// The book of peers that reached the active state, oldest first. A peer that
/// completes another handshake keeps its slot and gets a fresh `last_seen`.
///
#[derive(Debug, Default)]
pub struct AddressBook {
    peers: Vec<KnownPeer>,
}

impl AddressBook {
    pub fn new() -> Self {
        AddressBook { peers: vec![] }
    }

    /// Adds or refreshes `remote`, then forgets entries gone stale as of `now`.
    pub fn record(&mut self, remote: &SocketAddr, services: u64, now: DateTime<Utc>) {
        let host_raw = host_bytes(&remote.ip());
        let port = remote.port();
        match self
            .peers
            .iter_mut()
            .find(|known| known.host_raw == host_raw && known.port == port)
        {
            Some(known) => {
                known.services = services;
                known.last_seen = now;
            }
            None => self.peers.push(KnownPeer {
                host_raw,
                port,
                services,
                last_seen: now,
            }),
        }
        let cutoff = now - Duration::hours(STALE_AFTER_HOURS);
        self.peers.retain(|known| known.last_seen >= cutoff);
    }

    /// Drops stale entries and entries that could not be dialed. Returns how
    /// many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::hours(STALE_AFTER_HOURS);
        let before = self.peers.len();
        self.peers
            .retain(|known| known.last_seen >= cutoff && known.address().is_valid());
        before - self.peers.len()
    }

    pub fn entries(&self, limit: usize) -> Vec<NetworkAddress> {
        self.peers
            .iter()
            .take(limit)
            .map(|known| known.address())
            .collect()
    }

    pub fn peers(&self) -> &[KnownPeer] {
        &self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
