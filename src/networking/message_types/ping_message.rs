use crate::crypto::serialize_hex;
use crate::networking::cursor::{Cursor, DecodeError};
use serde::Serialize;

///
/// Data Object for `ping` and `pong`: an 8-byte nonce the pong echoes back.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PingMessage {
    #[serde(serialize_with = "serialize_hex")]
    pub nonce: [u8; 8],
}

impl PingMessage {
    pub fn new(nonce: [u8; 8]) -> Self {
        PingMessage { nonce }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<PingMessage, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let nonce = cursor.read_array::<8>()?;
        cursor.finish(PingMessage { nonce })
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.nonce.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_message_serialize() {
        let ping = PingMessage::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let bytes = ping.serialize();
        assert_eq!(PingMessage::deserialize(&bytes).unwrap(), ping);
        assert!(PingMessage::deserialize(&bytes[..7]).is_err());
    }
}
