use crate::networking::peer::PeerId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// The four timer families the reactor waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    HandshakeWatchdog(PeerId),
    GetDataDebounce(PeerId),
    GetDataWatchdog(PeerId),
    AddrPoll,
    AlertRebroadcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub id: TimerId,
    pub kind: TimerKind,
}

///
/// One-shot timers backed by spawned sleep tasks. A timer reports back on the
/// channel returned by [`Timers::new`] when it fires.
///
/// A timer counts only while its id is registered. [`Timers::cancel`] aborts
/// the task and forgets the id, so a timer that fired just before it was
/// cancelled is rejected by [`Timers::accept`].
///
#[derive(Debug)]
pub struct Timers {
    next_id: u64,
    active: HashMap<TimerId, JoinHandle<()>>,
    fired_sender: mpsc::UnboundedSender<TimerFired>,
}

impl Timers {
    pub fn new() -> (Timers, mpsc::UnboundedReceiver<TimerFired>) {
        let (fired_sender, fired_receiver) = mpsc::unbounded_channel();
        (
            Timers {
                next_id: 0,
                active: HashMap::new(),
                fired_sender,
            },
            fired_receiver,
        )
    }

    pub fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let fired_sender = self.fired_sender.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            // the reactor may already be gone during shutdown
            let _ = fired_sender.send(TimerFired { id, kind });
        });
        self.active.insert(id, handle);
        id
    }

    /// Cancelling an id that already fired or was never issued does nothing.
    pub fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.active.remove(&id) {
            handle.abort();
        }
    }

    /// Claims a fired timer. Returns false for a timer that was cancelled
    /// after its task had already sent.
    pub fn accept(&mut self, fired: &TimerFired) -> bool {
        self.active.remove(&fired.id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.active.drain() {
            handle.abort();
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
