use crate::crypto::serialize_hex;
use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use crate::networking::net_address::{AddressLayout, NetworkAddress};
use crate::time::WireTime;
use serde::Serialize;

///
/// Data Object for `version`, the first message either side sends.
///
/// ```bytes
/// 0-3     version (int32)
/// 4-11    services
/// 12-19   time
/// 20-45   addr_recv (services + host + port)
/// 46-71   addr_from
/// 72-79   nonce
/// 80..    client (varstring), height (int32), relay (optional byte)
/// ```
///
/// `nonce` is compared with our own to detect connecting to ourselves.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionMessage {
    pub version: i32,
    pub services: u64,
    pub time: WireTime,
    pub addr_recv: NetworkAddress,
    pub addr_from: NetworkAddress,
    #[serde(serialize_with = "serialize_hex")]
    pub nonce: [u8; 8],
    pub client: String,
    pub height: i32,
    pub relay: Option<bool>,
}

impl VersionMessage {
    pub fn deserialize(bytes: &[u8]) -> Result<VersionMessage, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let address_len = AddressLayout::WithServices.len();

        let version = cursor.read_i32()?;
        let services = cursor.read_u64()?;
        let time = WireTime::from_le_bytes(cursor.read_array::<8>()?);
        let addr_recv = NetworkAddress::deserialize(cursor.read_bytes(address_len)?)?;
        let addr_from = NetworkAddress::deserialize(cursor.read_bytes(address_len)?)?;
        let nonce = cursor.read_array::<8>()?;
        let client = cursor.read_var_string()?;
        let height = cursor.read_i32()?;
        let relay = if cursor.remaining() > 0 {
            Some(cursor.read_u8()? != 0)
        } else {
            None
        };

        cursor.finish(VersionMessage {
            version,
            services,
            time,
            addr_recv,
            addr_from,
            nonce,
            client,
            height,
            relay,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut builder = Builder::new();
        builder
            .put_i32(self.version)
            .put_u64(self.services)
            .put_bytes(&self.time.to_le_bytes());
        self.addr_recv.write(&mut builder, AddressLayout::WithServices);
        self.addr_from.write(&mut builder, AddressLayout::WithServices);
        builder
            .put_bytes(&self.nonce)
            .put_var_string(&self.client)
            .put_i32(self.height);
        if let Some(relay) = self.relay {
            builder.put_u8(relay as u8);
        }
        builder.build()
    }
}

/// A `/Satoshi:0.8.5/` peer at protocol 70001, as captured on mainnet.
#[cfg(test)]
pub(crate) const VERSION_70001: &str = "7111010001000000000000006017d65200000000010000000000000000000000000000000000ffff4581caaac2e7010000000000000000000000000000000000ffffb78d744f208d351351d2b1e1b0400f2f5361746f7368693a302e382e352fec470400";
