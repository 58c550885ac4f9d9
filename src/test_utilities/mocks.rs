use crate::networking::message_types::version_message::VersionMessage;
use crate::networking::net_address::NetworkAddress;
use crate::time::{datetime_from_unix, WireTime};

pub fn make_mock_address(addr: &str, services: Option<u64>) -> NetworkAddress {
    NetworkAddress::from_socket_addr(&addr.parse().unwrap(), services, None)
}

/// A `version` like a 0.8.5 node would send, with the given nonce.
pub fn make_mock_version(nonce: [u8; 8]) -> VersionMessage {
    VersionMessage {
        version: 70001,
        services: 1,
        time: WireTime::from(datetime_from_unix(1_389_762_400).unwrap()),
        addr_recv: make_mock_address("69.129.202.170:49895", Some(1)),
        addr_from: make_mock_address("183.141.116.79:8333", Some(1)),
        nonce,
        client: String::from("/Satoshi:0.8.5/"),
        height: 280556,
        relay: None,
    }
}
