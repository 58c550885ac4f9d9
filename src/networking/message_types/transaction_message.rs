use crate::crypto::{double_hash, serialize_hex, Sha256Hash};
use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutPoint {
    #[serde(serialize_with = "serialize_hex")]
    pub hash: Sha256Hash,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxInput {
    pub previous_output: OutPoint,
    #[serde(serialize_with = "serialize_hex")]
    pub script: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutput {
    pub value: u64,
    #[serde(serialize_with = "serialize_hex")]
    pub script: Vec<u8>,
}

///
/// Data Object for `tx`.
///
/// The identifier is the double SHA-256 of the exact payload received. It is
/// computed, never checked against any chain.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
    #[serde(skip)]
    pub raw: Vec<u8>,
    #[serde(serialize_with = "serialize_hex")]
    pub hash: Sha256Hash,
}

impl Transaction {
    pub fn new(version: i32, inputs: Vec<TxInput>, outputs: Vec<TxOutput>, lock_time: u32) -> Self {
        let mut transaction = Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            raw: vec![],
            hash: [0; 32],
        };
        transaction.raw = transaction.serialize();
        transaction.hash = double_hash(&transaction.raw);
        transaction
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction, DecodeError> {
        let mut cursor = Cursor::new(bytes);

        let version = cursor.read_i32()?;

        // 32-byte hash + index + empty script + sequence
        let input_count = cursor.read_var_int()?;
        let mut inputs = Vec::with_capacity(cursor.capacity_for(input_count, 41));
        for _ in 0..input_count {
            let hash = cursor.read_array::<32>()?;
            let index = cursor.read_u32()?;
            let script = cursor.read_var_bytes()?.to_vec();
            let sequence = cursor.read_u32()?;
            inputs.push(TxInput {
                previous_output: OutPoint { hash, index },
                script,
                sequence,
            });
        }

        let output_count = cursor.read_var_int()?;
        let mut outputs = Vec::with_capacity(cursor.capacity_for(output_count, 9));
        for _ in 0..output_count {
            let value = cursor.read_u64()?;
            let script = cursor.read_var_bytes()?.to_vec();
            outputs.push(TxOutput { value, script });
        }

        let lock_time = cursor.read_u32()?;

        cursor.finish(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            raw: bytes.to_vec(),
            hash: double_hash(bytes),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut builder = Builder::new();
        builder
            .put_i32(self.version)
            .put_var_int(self.inputs.len() as u64);
        for input in &self.inputs {
            builder
                .put_bytes(&input.previous_output.hash)
                .put_u32(input.previous_output.index)
                .put_var_bytes(&input.script)
                .put_u32(input.sequence);
        }
        builder.put_var_int(self.outputs.len() as u64);
        for output in &self.outputs {
            builder.put_u64(output.value).put_var_bytes(&output.script);
        }
        builder.put_u32(self.lock_time);
        builder.build()
    }
}

#[cfg(test)]
pub(crate) fn sample_transaction() -> Transaction {
    Transaction::new(
        1,
        vec![TxInput {
            previous_output: OutPoint {
                hash: [0x11; 32],
                index: 0,
            },
            script: vec![0x47, 0x30, 0x44, 0x02, 0x20],
            sequence: 0xFFFF_FFFF,
        }],
        vec![
            TxOutput {
                value: 5_000_000_000,
                script: vec![0x76, 0xa9, 0x14],
            },
            TxOutput {
                value: 1_000,
                script: vec![0x6a],
            },
        ],
        0,
    )
}
