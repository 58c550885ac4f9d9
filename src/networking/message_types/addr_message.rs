use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use crate::networking::net_address::{AddressLayout, NetworkAddress};
use serde::Serialize;

///
/// Data Object for `addr`: a varint count followed by that many 30-byte
/// address records (timestamp, services, host, big-endian port).
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddrMessage {
    pub addrs: Vec<NetworkAddress>,
}

impl AddrMessage {
    pub fn new(addrs: Vec<NetworkAddress>) -> Self {
        AddrMessage { addrs }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<AddrMessage, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let record_len = AddressLayout::WithTimestamp.len();

        let count = cursor.read_var_int()?;
        let mut addrs = Vec::with_capacity(cursor.capacity_for(count, record_len));
        for _ in 0..count {
            addrs.push(NetworkAddress::deserialize(cursor.read_bytes(record_len)?)?);
        }

        cursor.finish(AddrMessage { addrs })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut builder = Builder::new();
        builder.put_var_int(self.addrs.len() as u64);
        for addr in &self.addrs {
            addr.write(&mut builder, AddressLayout::WithTimestamp);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ADDR: &str = "013722d652010000000000000000000000000000000000ffff525f8c25208d";

    #[test]
    fn test_addr_message_deserialize() {
        let bytes = hex::decode(ONE_ADDR).unwrap();
        let addr_message = AddrMessage::deserialize(&bytes).unwrap();

        assert_eq!(addr_message.addrs.len(), 1);
        let addr = &addr_message.addrs[0];
        assert_eq!(
            addr.timestamp.map(|t| t.timestamp_millis()),
            Some(1389765175000)
        );
        assert_eq!(addr.services, Some(1));
        assert_eq!(addr.host, "82.95.140.37");
        assert_eq!(addr.port, 8333);
    }

    #[test]
    fn test_addr_message_serialize() {
        let bytes = hex::decode(ONE_ADDR).unwrap();
        let addr_message = AddrMessage::deserialize(&bytes).unwrap();
        assert_eq!(addr_message.serialize(), bytes);
        assert_eq!(AddrMessage::new(vec![]).serialize(), vec![0]);
    }

    #[test]
    fn count_larger_than_records_is_rejected() {
        let mut bytes = hex::decode(ONE_ADDR).unwrap();
        bytes[0] = 2;
        assert!(AddrMessage::deserialize(&bytes).is_err());
    }
}
