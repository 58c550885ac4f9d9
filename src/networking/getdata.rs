//!
//! Batched `getdata` requests.
//!
//! Requests for one peer pile up until 50 items are waiting or a second
//! passes without a new request, then go out as one `getdata`. Replies
//! (`tx`, `block`, `notfound`) are counted against the batch and every caller
//! that contributed to it receives the same result once the peer has answered
//! for every item.
//!
use crate::networking::message_types::inventory_message::{InventoryItem, InventoryMessage};
use crate::networking::message_types::transaction_message::Transaction;
use crate::networking::network::{Network, NetworkState};
use crate::networking::peer::PeerId;
use crate::networking::timers::{TimerId, TimerKind};
use crate::networking::transport::PeerSelector;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, event, Level};

pub const GETDATA_DEBOUNCE: Duration = Duration::from_secs(1);
pub const GETDATA_BATCH_LIMIT: usize = 50;
pub const GETDATA_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

pub const GETDATA_COMMAND: &str = "getdata";
pub const BLOCK_COMMAND: &str = "block";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetDataError {
    #[error("peer returned none of the requested items")]
    NoResults,
    #[error("peer did not answer the getdata request in time")]
    PeerUnresponsive,
    #[error("network is shutting down")]
    ShutdownInProgress,
    #[error("peer disconnected before answering")]
    PeerDisconnected,
    #[error("no connection to peer {0}")]
    UnknownPeer(PeerId),
    #[error("network is no longer running")]
    NetworkStopped,
}

/// One item the peer sent back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum InventoryReply {
    Transaction(Transaction),
    Block(#[serde(serialize_with = "crate::crypto::serialize_hex")] Vec<u8>),
}

/// `None` marks an item the peer reported as not found.
pub type GetDataResult = Result<Vec<Option<InventoryReply>>, GetDataError>;
pub type Responder = oneshot::Sender<GetDataResult>;

/// A sent `getdata` waiting for its replies.
#[derive(Debug)]
pub struct InFlight {
    pub outstanding: usize,
    pub results: Vec<Option<InventoryReply>>,
    pub callbacks: Vec<Responder>,
    pub watchdog: TimerId,
}

#[derive(Debug, Default)]
pub struct GetDataBatch {
    pub pending_items: Vec<InventoryItem>,
    pub pending_callbacks: Vec<Responder>,
    pub debounce: Option<TimerId>,
    pub in_flight: Option<InFlight>,
}

impl GetDataBatch {
    pub fn is_idle(&self) -> bool {
        self.pending_items.is_empty()
            && self.pending_callbacks.is_empty()
            && self.in_flight.is_none()
    }

    /// Hands `error` to every caller, queued or in flight.
    pub fn fail_all(&mut self, error: GetDataError) -> Vec<TimerId> {
        let mut timers: Vec<TimerId> = self.debounce.take().into_iter().collect();
        self.pending_items.clear();
        respond_all(std::mem::take(&mut self.pending_callbacks), Err(error.clone()));
        if let Some(in_flight) = self.in_flight.take() {
            timers.push(in_flight.watchdog);
            respond_all(in_flight.callbacks, Err(error));
        }
        timers
    }
}

fn respond_all(callbacks: Vec<Responder>, result: GetDataResult) {
    for callback in callbacks {
        // the caller may have stopped waiting
        let _ = callback.send(result.clone());
    }
}

impl Network {
    ///
    /// Queues `items` for `peer`. `responder` is answered once the batch the
    /// items end up in completes or fails.
    ///
    pub(crate) fn request_data(
        &mut self,
        peer: PeerId,
        items: Vec<InventoryItem>,
        force: bool,
        responder: Responder,
    ) {
        if self.state() == NetworkState::ShuttingDown {
            let _ = responder.send(Err(GetDataError::ShutdownInProgress));
            return;
        }
        let batch = match self.peers.get_mut(&peer) {
            Some(peer_state) => &mut peer_state.getdata,
            None => {
                let _ = responder.send(Err(GetDataError::UnknownPeer(peer)));
                return;
            }
        };
        batch.pending_items.extend(items);
        batch.pending_callbacks.push(responder);
        let ready = force || batch.pending_items.len() >= GETDATA_BATCH_LIMIT;
        let previous = batch.debounce.take();

        if let Some(timer) = previous {
            self.timers.cancel(timer);
        }
        if ready {
            self.flush_getdata(peer);
        } else {
            let timer = self
                .timers
                .schedule(GETDATA_DEBOUNCE, TimerKind::GetDataDebounce(peer));
            if let Some(peer_state) = self.peers.get_mut(&peer) {
                peer_state.getdata.debounce = Some(timer);
            }
        }
    }

    ///
    /// Sends everything queued for `peer` as one `getdata`. While an earlier
    /// batch is still in flight the queue stays put and goes out when that
    /// batch completes.
    ///
    pub(crate) fn flush_getdata(&mut self, peer: PeerId) {
        let shutting_down = self.state() == NetworkState::ShuttingDown;
        let batch = match self.peers.get_mut(&peer) {
            Some(peer_state) => &mut peer_state.getdata,
            None => return,
        };
        if let Some(timer) = batch.debounce.take() {
            self.timers.cancel(timer);
        }
        if shutting_down {
            batch.pending_items.clear();
            respond_all(
                std::mem::take(&mut batch.pending_callbacks),
                Err(GetDataError::ShutdownInProgress),
            );
            return;
        }
        if batch.in_flight.is_some() {
            debug!("getdata for {} deferred until the current batch completes", peer);
            return;
        }

        let items = std::mem::take(&mut batch.pending_items);
        let callbacks = std::mem::take(&mut batch.pending_callbacks);
        if items.is_empty() {
            respond_all(callbacks, Err(GetDataError::NoResults));
            return;
        }

        let outstanding = items.len();
        let watchdog = self
            .timers
            .schedule(GETDATA_REPLY_TIMEOUT, TimerKind::GetDataWatchdog(peer));
        if let Some(peer_state) = self.peers.get_mut(&peer) {
            peer_state.getdata.in_flight = Some(InFlight {
                outstanding,
                results: Vec::with_capacity(outstanding),
                callbacks,
                watchdog,
            });
        }
        event!(Level::DEBUG, "sending getdata for {} items to {}", outstanding, peer);
        self.send_raw(
            PeerSelector::One(peer),
            GETDATA_COMMAND,
            InventoryMessage::new(items).serialize(),
        );
    }

    /// A `tx` or `block` answering the batch in flight.
    pub(crate) fn receive_getdata_item(&mut self, peer: PeerId, reply: InventoryReply) {
        self.count_getdata_reply(peer, 0, Some(reply));
    }

    pub(crate) fn receive_notfound(&mut self, peer: PeerId, missing: usize) {
        self.count_getdata_reply(peer, missing, None);
    }

    fn count_getdata_reply(&mut self, peer: PeerId, missing: usize, reply: Option<InventoryReply>) {
        let in_flight = match self
            .peers
            .get_mut(&peer)
            .and_then(|peer_state| peer_state.getdata.in_flight.as_mut())
        {
            Some(in_flight) => in_flight,
            None => return,
        };

        if reply.is_none() {
            // the notfound message itself takes one slot back, which the
            // per-reply decrement below consumes again
            in_flight.outstanding = (in_flight.outstanding + 1).saturating_sub(missing);
            in_flight.results.extend((0..missing).map(|_| None));
        } else {
            in_flight.results.push(reply);
        }
        in_flight.outstanding = in_flight.outstanding.saturating_sub(1);

        if in_flight.outstanding == 0 {
            self.complete_getdata(peer);
        }
    }

    fn complete_getdata(&mut self, peer: PeerId) {
        let in_flight = match self
            .peers
            .get_mut(&peer)
            .and_then(|peer_state| peer_state.getdata.in_flight.take())
        {
            Some(in_flight) => in_flight,
            None => return,
        };
        self.timers.cancel(in_flight.watchdog);

        let result = if in_flight.results.iter().all(Option::is_none) {
            Err(GetDataError::NoResults)
        } else {
            Ok(in_flight.results)
        };
        respond_all(in_flight.callbacks, result);
        self.flush_deferred_getdata(peer);
    }

    pub(crate) fn getdata_timed_out(&mut self, peer: PeerId) {
        let in_flight = match self
            .peers
            .get_mut(&peer)
            .and_then(|peer_state| peer_state.getdata.in_flight.take())
        {
            Some(in_flight) => in_flight,
            None => return,
        };
        event!(Level::INFO, "peer {} did not answer getdata in time", peer);
        respond_all(in_flight.callbacks, Err(GetDataError::PeerUnresponsive));
        self.flush_deferred_getdata(peer);
    }

    /// Sends a queue that built up while a batch was in flight, unless its
    /// debounce timer is still running.
    fn flush_deferred_getdata(&mut self, peer: PeerId) {
        let deferred = self.peers.get(&peer).map_or(false, |peer_state| {
            !peer_state.getdata.pending_callbacks.is_empty()
                && peer_state.getdata.debounce.is_none()
        });
        if deferred {
            self.flush_getdata(peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::message_types::inventory_message::InventoryType;
    use crate::networking::message_types::transaction_message::sample_transaction;
    use crate::networking::transport::TransportCommand;
    use crate::test_utilities::test_manager::TestManager;
    use tokio::time::{sleep, timeout};

    fn items(count: usize) -> Vec<InventoryItem> {
        (0..count)
            .map(|i| InventoryItem::transaction([i as u8; 32]))
            .collect()
    }

    fn notfound(count: usize) -> Vec<u8> {
        InventoryMessage::new(items(count)).serialize()
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_waits_for_quiet_period() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let handle = manager.handle.clone();
        tokio::spawn(async move { handle.get_data(peer, items(10), false).await });

        sleep(Duration::from_millis(900)).await;
        assert_eq!(manager.try_next_command(), None);

        let command = timeout(Duration::from_millis(150), manager.next_command())
            .await
            .unwrap();
        match command {
            TransportCommand::Send {
                peers,
                command,
                payload,
            } => {
                assert_eq!(peers, PeerSelector::One(peer));
                assert_eq!(command, GETDATA_COMMAND);
                assert_eq!(InventoryMessage::deserialize(&payload).unwrap().items, items(10));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_requests_restart_the_debounce() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let first = manager.handle.clone();
        tokio::spawn(async move { first.get_data(peer, items(1), false).await });
        sleep(Duration::from_millis(600)).await;
        let second = manager.handle.clone();
        tokio::spawn(async move { second.get_data(peer, items(2), false).await });

        // 1200ms after the first request, 600ms after the second
        sleep(Duration::from_millis(600)).await;
        assert_eq!(manager.try_next_command(), None);

        let (_, payload) = manager.expect_send().await;
        assert_eq!(InventoryMessage::deserialize(&payload).unwrap().items.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_limit_sends_immediately() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let handle = manager.handle.clone();
        tokio::spawn(async move { handle.get_data(peer, items(GETDATA_BATCH_LIMIT), false).await });

        sleep(Duration::from_millis(1)).await;
        let (command, payload) = manager.expect_send_now();
        assert_eq!(command, GETDATA_COMMAND);
        assert_eq!(
            InventoryMessage::deserialize(&payload).unwrap().items.len(),
            GETDATA_BATCH_LIMIT
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_limit_overrides_a_running_debounce() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let first = manager.handle.clone();
        tokio::spawn(async move { first.get_data(peer, items(10), false).await });
        sleep(Duration::from_millis(300)).await;
        assert_eq!(manager.try_next_command(), None);

        let second = manager.handle.clone();
        tokio::spawn(async move { second.get_data(peer, items(45), false).await });
        sleep(Duration::from_millis(1)).await;
        let (command, payload) = manager.expect_send_now();
        assert_eq!(command, GETDATA_COMMAND);
        assert_eq!(InventoryMessage::deserialize(&payload).unwrap().items.len(), 55);

        // past the point where the first debounce would have fired
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(manager.try_next_command(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_reach_every_caller() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let first = manager.handle.clone();
        let first = tokio::spawn(async move { first.get_data(peer, items(1), false).await });
        sleep(Duration::from_millis(1)).await;
        let second = manager.handle.clone();
        let second = tokio::spawn(async move { second.get_data(peer, items(2), true).await });
        manager.expect_send().await;

        let transaction = sample_transaction();
        manager.deliver(peer, "tx", transaction.serialize());
        manager.deliver(peer, "notfound", notfound(1));
        manager.deliver(peer, BLOCK_COMMAND, vec![1, 2, 3]);

        let expected = vec![
            Some(InventoryReply::Transaction(transaction)),
            None,
            Some(InventoryReply::Block(vec![1, 2, 3])),
        ];
        assert_eq!(first.await.unwrap(), Ok(expected.clone()));
        assert_eq!(second.await.unwrap(), Ok(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_notfound_for_everything_is_an_error() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let handle = manager.handle.clone();
        let request = tokio::spawn(async move { handle.get_data(peer, items(10), true).await });
        manager.expect_send().await;

        manager.deliver(peer, "notfound", notfound(10));
        assert_eq!(request.await.unwrap(), Err(GetDataError::NoResults));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_trips_the_watchdog() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let handle = manager.handle.clone();
        let request = tokio::spawn(async move { handle.get_data(peer, items(3), true).await });
        manager.expect_send().await;
        manager.deliver(peer, "tx", sample_transaction().serialize());

        assert_eq!(request.await.unwrap(), Err(GetDataError::PeerUnresponsive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_batch_waits_for_the_first() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let first = manager.handle.clone();
        let first = tokio::spawn(async move { first.get_data(peer, items(1), true).await });
        manager.expect_send().await;
        let second = manager.handle.clone();
        let second = tokio::spawn(async move { second.get_data(peer, items(2), true).await });
        sleep(Duration::from_millis(1)).await;
        assert_eq!(manager.try_next_command(), None);

        manager.deliver(peer, "tx", sample_transaction().serialize());
        assert!(first.await.unwrap().is_ok());

        let (_, payload) = manager.expect_send().await;
        assert_eq!(InventoryMessage::deserialize(&payload).unwrap().items.len(), 2);
        manager.deliver(peer, "notfound", notfound(2));
        assert_eq!(second.await.unwrap(), Err(GetDataError::NoResults));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_fails_pending_requests() {
        let mut manager = TestManager::new();
        let peer = manager.connect_active_peer("10.0.0.1:8333").await;

        let handle = manager.handle.clone();
        let request = tokio::spawn(async move { handle.get_data(peer, items(1), false).await });
        sleep(Duration::from_millis(10)).await;
        manager.disconnect(peer);

        assert_eq!(request.await.unwrap(), Err(GetDataError::PeerDisconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_peer_is_rejected() {
        let manager = TestManager::new();
        let result = manager.handle.get_data(PeerId::new(), items(1), true).await;
        assert!(matches!(result, Err(GetDataError::UnknownPeer(_))));
    }

    #[test]
    fn test_fail_all_reports_every_timer() {
        let mut batch = GetDataBatch::default();
        assert!(batch.is_idle());
        let (sender, mut receiver) = oneshot::channel();
        batch.pending_items.push(InventoryItem::new(InventoryType::Block, [7; 32]));
        batch.pending_callbacks.push(sender);

        assert!(batch.fail_all(GetDataError::PeerDisconnected).is_empty());
        assert_eq!(receiver.try_recv().unwrap(), Err(GetDataError::PeerDisconnected));
        assert!(batch.is_idle());
    }
}
