use crate::crypto::{double_hash, serialize_hex, Sha256Hash};
use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use crate::time::datetime_from_unix;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 80 header bytes plus at least one byte of transaction count.
pub const MIN_HEADER_LEN: usize = 81;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub version: i32,
    #[serde(serialize_with = "serialize_hex")]
    pub prev_block: Sha256Hash,
    #[serde(serialize_with = "serialize_hex")]
    pub merkle_root: Sha256Hash,
    pub timestamp: DateTime<Utc>,
    pub bits: u32,
    #[serde(serialize_with = "serialize_hex")]
    pub nonce: [u8; 4],
    pub tx_count: u64,
}

impl BlockHeader {
    fn write(&self, builder: &mut Builder) {
        builder
            .put_i32(self.version)
            .put_bytes(&self.prev_block)
            .put_bytes(&self.merkle_root)
            .put_u32(self.timestamp.timestamp() as u32)
            .put_u32(self.bits)
            .put_bytes(&self.nonce);
    }

    /// Double SHA-256 of the 80 header bytes, transaction count excluded.
    pub fn hash(&self) -> Sha256Hash {
        let mut builder = Builder::new();
        self.write(&mut builder);
        double_hash(&builder.build())
    }
}

///
/// Data Object for `headers`: a varint count of block headers, each followed
/// by its own varint transaction count.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadersMessage {
    pub headers: Vec<BlockHeader>,
}

impl HeadersMessage {
    pub fn new(headers: Vec<BlockHeader>) -> Self {
        HeadersMessage { headers }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<HeadersMessage, DecodeError> {
        let mut cursor = Cursor::new(bytes);

        let count = cursor.read_var_int()?;
        let mut headers = Vec::with_capacity(cursor.capacity_for(count, MIN_HEADER_LEN));
        for _ in 0..count {
            let version = cursor.read_i32()?;
            let prev_block = cursor.read_array::<32>()?;
            let merkle_root = cursor.read_array::<32>()?;
            let seconds = cursor.read_u32()? as i64;
            let timestamp =
                datetime_from_unix(seconds).ok_or(DecodeError::InvalidTimestamp(seconds))?;
            let bits = cursor.read_u32()?;
            let nonce = cursor.read_array::<4>()?;
            let tx_count = cursor.read_var_int()?;
            headers.push(BlockHeader {
                version,
                prev_block,
                merkle_root,
                timestamp,
                bits,
                nonce,
                tx_count,
            });
        }

        cursor.finish(HeadersMessage { headers })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut builder = Builder::new();
        builder.put_var_int(self.headers.len() as u64);
        for header in &self.headers {
            header.write(&mut builder);
            builder.put_var_int(header.tx_count);
        }
        builder.build()
    }
}
