use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use crate::time::datetime_from_unix;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// IPv4 addresses travel as IPv4-mapped IPv6 (`::ffff:a.b.c.d`).
pub const IPV4_MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF];

/// The three address record shapes, told apart by length alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressLayout {
    /// timestamp + services + host + port, used by `addr`
    WithTimestamp,
    /// services + host + port, used by `version`
    WithServices,
    /// host + port
    HostPort,
}

impl AddressLayout {
    pub fn len(&self) -> usize {
        match self {
            AddressLayout::WithTimestamp => 30,
            AddressLayout::WithServices => 26,
            AddressLayout::HostPort => 18,
        }
    }

    pub fn from_len(len: usize) -> Option<AddressLayout> {
        match len {
            30 => Some(AddressLayout::WithTimestamp),
            26 => Some(AddressLayout::WithServices),
            18 => Some(AddressLayout::HostPort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAddress {
    pub timestamp: Option<DateTime<Utc>>,
    pub services: Option<u64>,
    pub host: String,
    #[serde(skip)]
    pub host_raw: [u8; 16],
    pub port: u16,
}

impl NetworkAddress {
    pub fn new(
        host_raw: [u8; 16],
        port: u16,
        services: Option<u64>,
        timestamp: Option<DateTime<Utc>>,
    ) -> NetworkAddress {
        NetworkAddress {
            timestamp,
            services,
            host: render_host(&host_raw),
            host_raw,
            port,
        }
    }

    pub fn from_socket_addr(
        addr: &SocketAddr,
        services: Option<u64>,
        timestamp: Option<DateTime<Utc>>,
    ) -> NetworkAddress {
        NetworkAddress::new(host_bytes(&addr.ip()), addr.port(), services, timestamp)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<NetworkAddress, DecodeError> {
        let layout = AddressLayout::from_len(bytes.len())
            .ok_or(DecodeError::InvalidAddressLength(bytes.len()))?;
        let mut cursor = Cursor::new(bytes);

        let timestamp = match layout {
            AddressLayout::WithTimestamp => {
                let seconds = cursor.read_u32()? as i64;
                Some(datetime_from_unix(seconds).ok_or(DecodeError::InvalidTimestamp(seconds))?)
            }
            _ => None,
        };
        let services = match layout {
            AddressLayout::HostPort => None,
            _ => Some(cursor.read_u64()?),
        };
        let host_raw = cursor.read_array::<16>()?;
        let port = cursor.read_u16_be()?;

        cursor.finish(NetworkAddress::new(host_raw, port, services, timestamp))
    }

    pub fn write(&self, builder: &mut Builder, layout: AddressLayout) {
        if layout == AddressLayout::WithTimestamp {
            let seconds = self.timestamp.map(|t| t.timestamp()).unwrap_or(0);
            builder.put_u32(seconds as u32);
        }
        if layout != AddressLayout::HostPort {
            builder.put_u64(self.services.unwrap_or(0));
        }
        builder.put_bytes(&self.host_raw).put_u16_be(self.port);
    }

    pub fn serialize(&self, layout: AddressLayout) -> Vec<u8> {
        let mut builder = Builder::new();
        self.write(&mut builder, layout);
        builder.build()
    }

    pub fn ip(&self) -> IpAddr {
        if self.host_raw[0..12] == IPV4_MAPPED_PREFIX {
            IpAddr::V4(Ipv4Addr::new(
                self.host_raw[12],
                self.host_raw[13],
                self.host_raw[14],
                self.host_raw[15],
            ))
        } else {
            IpAddr::V6(Ipv6Addr::from(self.host_raw))
        }
    }

    /// Good enough to hand to another peer: a concrete host and a port.
    pub fn is_valid(&self) -> bool {
        self.port != 0 && !self.ip().is_unspecified()
    }
}

/// Dotted quad for IPv4-mapped hosts, otherwise eight colon-separated hex
/// groups with their leading zeros dropped.
pub fn render_host(raw: &[u8; 16]) -> String {
    if raw[0..12] == IPV4_MAPPED_PREFIX {
        raw[12..16]
            .iter()
            .map(|octet| octet.to_string())
            .collect::<Vec<String>>()
            .join(".")
    } else {
        raw.chunks(2)
            .map(|group| format!("{:x}", u16::from_be_bytes([group[0], group[1]])))
            .collect::<Vec<String>>()
            .join(":")
    }
}

pub fn host_bytes(ip: &IpAddr) -> [u8; 16] {
    match ip {
        IpAddr::V4(v4) => {
            let mut raw = [0u8; 16];
            raw[0..12].copy_from_slice(&IPV4_MAPPED_PREFIX);
            raw[12..16].copy_from_slice(&v4.octets());
            raw
        }
        IpAddr::V6(v6) => v6.octets(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_version_style_address() {
        let bytes = hex::decode("010000000000000000000000000000000000ffff4581caaac2e7").unwrap();
        let addr = NetworkAddress::deserialize(&bytes).unwrap();
        assert_eq!(addr.timestamp, None);
        assert_eq!(addr.services, Some(1));
        assert_eq!(addr.host, "69.129.202.170");
        assert_eq!(addr.port, 49895);
        assert_eq!(addr.serialize(AddressLayout::WithServices), bytes);
    }

    #[test]
    fn decodes_addr_style_address() {
        let bytes =
            hex::decode("3722d652010000000000000000000000000000000000ffff525f8c25208d").unwrap();
        let addr = NetworkAddress::deserialize(&bytes).unwrap();
        assert_eq!(
            addr.timestamp.map(|t| t.timestamp_millis()),
            Some(1389765175000)
        );
        assert_eq!(addr.services, Some(1));
        assert_eq!(addr.host, "82.95.140.37");
        assert_eq!(addr.port, 8333);
        assert_eq!(addr.serialize(AddressLayout::WithTimestamp), bytes);
    }

    #[test]
    fn decodes_host_and_port_only() {
        let bytes = hex::decode("00000000000000000000ffff7f000001208d").unwrap();
        let addr = NetworkAddress::deserialize(&bytes).unwrap();
        assert_eq!(addr.services, None);
        assert_eq!(addr.host, "127.0.0.1");
        assert_eq!(addr.port, 8333);
    }

    #[test]
    fn renders_ipv6_groups_without_leading_zeros() {
        let raw: [u8; 16] = [
            0x20, 0x01, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01,
        ];
        assert_eq!(render_host(&raw), "2001:db8:0:0:0:0:0:1");
    }

    #[test]
    fn rejects_other_lengths() {
        assert_eq!(
            NetworkAddress::deserialize(&[0u8; 20]),
            Err(DecodeError::InvalidAddressLength(20))
        );
    }

    #[test]
    fn socket_addresses_round_trip_through_host_bytes() {
        let v4: SocketAddr = "10.0.0.1:8333".parse().unwrap();
        let addr = NetworkAddress::from_socket_addr(&v4, Some(1), None);
        assert_eq!(addr.host, "10.0.0.1");
        assert_eq!(addr.ip(), v4.ip());

        let v6: SocketAddr = "[2001:db8::1]:18333".parse().unwrap();
        let addr = NetworkAddress::from_socket_addr(&v6, None, None);
        assert_eq!(addr.ip(), v6.ip());
        assert_eq!(addr.port, 18333);
    }

    #[test]
    fn validity_requires_host_and_port() {
        let good: SocketAddr = "10.0.0.1:8333".parse().unwrap();
        assert!(NetworkAddress::from_socket_addr(&good, None, None).is_valid());
        let no_port: SocketAddr = "10.0.0.1:0".parse().unwrap();
        assert!(!NetworkAddress::from_socket_addr(&no_port, None, None).is_valid());
        assert!(!NetworkAddress::new([0u8; 16], 8333, None, None).is_valid());
    }
}
