use crate::networking::message_types::alert_message::{Alert, ALERT_VERSION};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertRejected {
    #[error("unsupported alert version {0}")]
    UnsupportedVersion(i32),
    #[error("alert {0} has already expired")]
    Expired(i32),
}

///
/// Live network alerts, at most one per uuid.
///
/// Accepting an alert first removes every stored alert it cancels, through
/// either its `cancel` watermark or its `cancel_set`.
///
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: BTreeMap<i32, Alert>,
}

impl AlertStore {
    pub fn new() -> Self {
        AlertStore {
            alerts: BTreeMap::new(),
        }
    }

    /// Stores `alert` and returns the uuids it cancelled.
    pub fn insert(&mut self, alert: Alert, now: DateTime<Utc>) -> Result<Vec<i32>, AlertRejected> {
        let details = match (&alert.details, alert.version) {
            (Some(details), ALERT_VERSION) => details,
            _ => return Err(AlertRejected::UnsupportedVersion(alert.version)),
        };
        let uuid = details.uuid;
        if alert.is_expired(now) {
            return Err(AlertRejected::Expired(uuid));
        }

        let cancelled: Vec<i32> = self
            .alerts
            .values()
            .filter(|stored| stored.is_cancelled_by(&alert))
            .filter_map(|stored| stored.uuid())
            .collect();
        for cancelled_uuid in &cancelled {
            self.alerts.remove(cancelled_uuid);
        }

        self.alerts.insert(uuid, alert);
        Ok(cancelled)
    }

    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|_, alert| !alert.is_expired(now));
        before - self.alerts.len()
    }

    pub fn contains(&self, uuid: i32) -> bool {
        self.alerts.contains_key(&uuid)
    }

    /// Stored alerts in uuid order.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
