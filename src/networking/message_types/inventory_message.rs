use crate::crypto::{serialize_hex, Sha256Hash};
use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use serde::Serialize;

pub const INVENTORY_ITEM_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryType {
    Unknown,
    Transaction,
    Block,
}

impl InventoryType {
    pub fn from_code(code: u32) -> InventoryType {
        match code {
            1 => InventoryType::Transaction,
            2 => InventoryType::Block,
            _ => InventoryType::Unknown,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            InventoryType::Unknown => 0,
            InventoryType::Transaction => 1,
            InventoryType::Block => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InventoryItem {
    pub kind: InventoryType,
    #[serde(serialize_with = "serialize_hex")]
    pub hash: Sha256Hash,
}

impl InventoryItem {
    pub fn new(kind: InventoryType, hash: Sha256Hash) -> Self {
        InventoryItem { kind, hash }
    }

    pub fn transaction(hash: Sha256Hash) -> Self {
        InventoryItem::new(InventoryType::Transaction, hash)
    }

    pub fn block(hash: Sha256Hash) -> Self {
        InventoryItem::new(InventoryType::Block, hash)
    }
}

///
/// Data Object for `inv`, `notfound` and `getdata`, which share a layout:
/// a varint count, then `count` × (type: uint32, hash: 32 bytes).
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryMessage {
    pub items: Vec<InventoryItem>,
}

impl InventoryMessage {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        InventoryMessage { items }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<InventoryMessage, DecodeError> {
        let mut cursor = Cursor::new(bytes);

        let count = cursor.read_var_int()?;
        let mut items = Vec::with_capacity(cursor.capacity_for(count, INVENTORY_ITEM_LEN));
        for _ in 0..count {
            let kind = InventoryType::from_code(cursor.read_u32()?);
            let hash = cursor.read_array::<32>()?;
            items.push(InventoryItem { kind, hash });
        }

        cursor.finish(InventoryMessage { items })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut builder = Builder::new();
        builder.put_var_int(self.items.len() as u64);
        for item in &self.items {
            builder.put_u32(item.kind.code()).put_bytes(&item.hash);
        }
        builder.build()
    }
}
