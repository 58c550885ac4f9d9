use serde::Serializer;
use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

pub fn hash(data: &[u8]) -> Sha256Hash {
    let mut output = [0u8; 32];
    output.copy_from_slice(Sha256::digest(data).as_slice());
    output
}

/// SHA-256 applied twice. Transaction identifiers and block hashes on the
/// Bitcoin network are computed this way.
pub fn double_hash(data: &[u8]) -> Sha256Hash {
    hash(&hash(data))
}

pub fn generate_nonce() -> [u8; 8] {
    rand::random::<[u8; 8]>()
}

//
// serde helpers so byte fields show up as hex in JSON output
//
pub fn serialize_hex<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn serialize_hex_list<T, S>(list: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.collect_seq(list.iter().map(hex::encode))
}
