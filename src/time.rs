use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

pub fn datetime_from_unix(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

/// An 8-byte time field as it appears in version and alert payloads.
///
/// Values whose high 4 bytes are zero are ordinary Unix timestamps. Anything
/// else is kept as the raw bytes so it can be written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireTime {
    Unix(DateTime<Utc>),
    Raw(#[serde(serialize_with = "crate::crypto::serialize_hex")] [u8; 8]),
}

impl WireTime {
    pub fn from_le_bytes(bytes: [u8; 8]) -> WireTime {
        if bytes[4..8] == [0, 0, 0, 0] {
            let seconds = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            if let Some(datetime) = datetime_from_unix(seconds as i64) {
                return WireTime::Unix(datetime);
            }
        }
        WireTime::Raw(bytes)
    }

    pub fn to_le_bytes(&self) -> [u8; 8] {
        match self {
            WireTime::Unix(datetime) => (datetime.timestamp() as u64).to_le_bytes(),
            WireTime::Raw(bytes) => *bytes,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            WireTime::Unix(datetime) => Some(*datetime),
            WireTime::Raw(_) => None,
        }
    }

    /// A raw (non-collapsible) value never counts as past.
    pub fn is_before(&self, now: DateTime<Utc>) -> bool {
        match self {
            WireTime::Unix(datetime) => *datetime < now,
            WireTime::Raw(_) => false,
        }
    }
}

impl From<DateTime<Utc>> for WireTime {
    fn from(datetime: DateTime<Utc>) -> Self {
        WireTime::Unix(datetime)
    }
}
