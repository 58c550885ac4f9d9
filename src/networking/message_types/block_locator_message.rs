use crate::crypto::{serialize_hex, serialize_hex_list, Sha256Hash};
use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use serde::Serialize;

///
/// Data Object for `getblocks` and `getheaders`, which share one layout:
/// version (int32), a varint-counted list of locator hashes, and a stop hash.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockLocatorMessage {
    pub version: i32,
    #[serde(serialize_with = "serialize_hex_list")]
    pub hashes: Vec<Sha256Hash>,
    #[serde(serialize_with = "serialize_hex")]
    pub hash_stop: Sha256Hash,
}

impl BlockLocatorMessage {
    pub fn new(version: i32, hashes: Vec<Sha256Hash>, hash_stop: Sha256Hash) -> Self {
        BlockLocatorMessage {
            version,
            hashes,
            hash_stop,
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<BlockLocatorMessage, DecodeError> {
        let mut cursor = Cursor::new(bytes);

        let version = cursor.read_i32()?;
        let count = cursor.read_var_int()?;
        let mut hashes = Vec::with_capacity(cursor.capacity_for(count, 32));
        for _ in 0..count {
            hashes.push(cursor.read_array::<32>()?);
        }
        let hash_stop = cursor.read_array::<32>()?;

        cursor.finish(BlockLocatorMessage {
            version,
            hashes,
            hash_stop,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut builder = Builder::new();
        builder
            .put_i32(self.version)
            .put_var_int(self.hashes.len() as u64);
        for hash in &self.hashes {
            builder.put_bytes(hash);
        }
        builder.put_bytes(&self.hash_stop);
        builder.build()
    }
}
