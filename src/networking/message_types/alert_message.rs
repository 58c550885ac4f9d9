use crate::crypto::serialize_hex;
use crate::networking::builder::Builder;
use crate::networking::cursor::{Cursor, DecodeError};
use crate::time::WireTime;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The only alert format this node understands.
pub const ALERT_VERSION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDetails {
    pub relay_until: WireTime,
    pub expiration: WireTime,
    pub uuid: i32,
    pub cancel: i32,
    pub cancel_set: Vec<i32>,
    pub min_version: i32,
    pub max_version: i32,
    pub subversion_set: Vec<String>,
    pub priority: i32,
    pub comment: String,
    pub status_bar: String,
    #[serde(serialize_with = "serialize_hex")]
    pub reserved: Vec<u8>,
}

///
/// Data Object for `alert`.
///
/// ```bytes
/// varint  message length
/// ..      message
/// varint  signature length
/// ..      signature
/// ```
///
/// The message is a nested record starting with an int32 version. Only
/// version 1 messages carry `details`; the signature is kept but never
/// verified.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub version: i32,
    pub details: Option<AlertDetails>,
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
}

impl Alert {
    pub fn deserialize(bytes: &[u8]) -> Result<Alert, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let message = cursor.read_var_bytes()?;
        let signature = cursor.read_var_bytes()?.to_vec();
        cursor.finish(())?;

        let mut cursor = Cursor::new(message);
        let version = cursor.read_i32()?;
        let details = if version == ALERT_VERSION {
            Some(AlertDetails {
                relay_until: WireTime::from_le_bytes(cursor.read_array::<8>()?),
                expiration: WireTime::from_le_bytes(cursor.read_array::<8>()?),
                uuid: cursor.read_i32()?,
                cancel: cursor.read_i32()?,
                cancel_set: {
                    let count = cursor.read_var_int()?;
                    let mut set = Vec::with_capacity(cursor.capacity_for(count, 4));
                    for _ in 0..count {
                        set.push(cursor.read_i32()?);
                    }
                    set
                },
                min_version: cursor.read_i32()?,
                max_version: cursor.read_i32()?,
                subversion_set: {
                    let count = cursor.read_var_int()?;
                    let mut set = Vec::with_capacity(cursor.capacity_for(count, 1));
                    for _ in 0..count {
                        set.push(cursor.read_var_string()?);
                    }
                    set
                },
                priority: cursor.read_i32()?,
                comment: cursor.read_var_string()?,
                status_bar: cursor.read_var_string()?,
                reserved: cursor.read_var_bytes()?.to_vec(),
            })
        } else {
            None
        };

        cursor.finish(Alert {
            version,
            details,
            signature,
        })
    }

    /// The nested message. Messages of an unknown version are written back
    /// with their version only.
    pub fn serialize_message(&self) -> Vec<u8> {
        let mut builder = Builder::new();
        builder.put_i32(self.version);
        if let Some(details) = &self.details {
            builder
                .put_bytes(&details.relay_until.to_le_bytes())
                .put_bytes(&details.expiration.to_le_bytes())
                .put_i32(details.uuid)
                .put_i32(details.cancel)
                .put_var_int(details.cancel_set.len() as u64);
            for uuid in &details.cancel_set {
                builder.put_i32(*uuid);
            }
            builder
                .put_i32(details.min_version)
                .put_i32(details.max_version)
                .put_var_int(details.subversion_set.len() as u64);
            for subversion in &details.subversion_set {
                builder.put_var_string(subversion);
            }
            builder
                .put_i32(details.priority)
                .put_var_string(&details.comment)
                .put_var_string(&details.status_bar)
                .put_var_bytes(&details.reserved);
        }
        builder.build()
    }

    pub fn serialize(&self) -> Vec<u8> {
        Builder::new()
            .put_var_bytes(&self.serialize_message())
            .put_var_bytes(&self.signature)
            .build()
    }

    pub fn uuid(&self) -> Option<i32> {
        self.details.as_ref().map(|details| details.uuid)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.details {
            Some(details) => details.expiration.is_before(now),
            None => true,
        }
    }

    /// True if `other` cancels this alert, either through its `cancel`
    /// watermark or by naming this alert in its `cancel_set`.
    pub fn is_cancelled_by(&self, other: &Alert) -> bool {
        match (&self.details, &other.details) {
            (Some(mine), Some(theirs)) => {
                mine.uuid < theirs.cancel || theirs.cancel_set.contains(&mine.uuid)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_alert(uuid: i32, cancel: i32, cancel_set: Vec<i32>, expiration: i64) -> Alert {
    use crate::time::datetime_from_unix;

    Alert {
        version: ALERT_VERSION,
        details: Some(AlertDetails {
            relay_until: WireTime::from(datetime_from_unix(expiration).unwrap()),
            expiration: WireTime::from(datetime_from_unix(expiration).unwrap()),
            uuid,
            cancel,
            cancel_set,
            min_version: 0,
            max_version: 70001,
            subversion_set: vec!["/Satoshi:0.8.5/".to_string()],
            priority: 100,
            comment: String::new(),
            status_bar: format!("alert {}", uuid),
            reserved: vec![],
        }),
        signature: vec![0x30, 0x45, 0x02, 0x21],
    }
}
