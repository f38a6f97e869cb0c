//! Channel Wrapper.
//!
//! `ChannelState` holds the open/close conditions and the captured fault;
//! `tokio::sync::watch` stands in for a condition variable here — it is
//! level-triggered and retains the last value, so "signaled exactly once,
//! never missed" holds even if `wait_open`/`wait_close` are called after
//! the signal already fired, and any number of clones of the receiver can
//! observe the same transition.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::Error;
use crate::status::ExitStatus;

/// The session's channel registry: live channels keyed by local channel id,
/// guarded by one mutex shared across every channel. Entries are inserted
/// by the open-with-retry driver and removed by the pump task once its
/// channel closes; `disconnected()` drains whatever is left so no waiter is
/// ever orphaned by a dead transport.
#[derive(Clone, Default)]
pub(crate) struct ChannelRegistry(Arc<tokio::sync::Mutex<HashMap<russh::ChannelId, Arc<ChannelState>>>>);

impl ChannelRegistry {
    pub(crate) fn default_registry() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, id: russh::ChannelId, state: Arc<ChannelState>) {
        self.0.lock().await.insert(id, state);
    }

    pub(crate) async fn remove(&self, id: &russh::ChannelId) {
        self.0.lock().await.remove(id);
    }

    /// Remove and return every still-registered channel, for use by the
    /// transport's disconnect hook.
    pub(crate) async fn drain(&self) -> Vec<Arc<ChannelState>> {
        self.0.lock().await.drain().map(|(_, state)| state).collect()
    }
}

pub(crate) struct ChannelState {
    fault: Mutex<Option<Error>>,
    status: Mutex<ExitStatus>,
    open_tx: watch::Sender<bool>,
    open_rx: watch::Receiver<bool>,
    close_tx: watch::Sender<bool>,
    close_rx: watch::Receiver<bool>,
}

impl ChannelState {
    pub(crate) fn new() -> Arc<Self> {
        let (open_tx, open_rx) = watch::channel(false);
        let (close_tx, close_rx) = watch::channel(false);
        Arc::new(Self {
            fault: Mutex::new(None),
            status: Mutex::new(ExitStatus::new()),
            open_tx,
            open_rx,
            close_tx,
            close_rx,
        })
    }

    /// Capture a fault. Only the first call sticks — "fault is written only
    /// under the relevant per-channel mutex", never overwritten once set.
    pub(crate) fn capture_fault(&self, err: Error) {
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(err);
        }
    }

    pub(crate) fn fault(&self) -> Option<Error> {
        self.fault.lock().clone()
    }

    /// Mutate the exit status. Called at most once by the exit-status or
    /// exit-signal handler.
    pub(crate) fn with_status_mut(&self, f: impl FnOnce(&mut ExitStatus)) {
        f(&mut self.status.lock());
    }

    /// Signal the open condition. Idempotent — subsequent calls are no-ops
    /// since the watch channel only needs to transition once.
    pub(crate) fn signal_open(&self) {
        let _ = self.open_tx.send(true);
    }

    /// Signal the close condition. Open failure and close both signal the
    /// close condition so no waiter is ever left blocked; callers should
    /// also call `signal_open` alongside this when the failure happened
    /// during the open handshake.
    pub(crate) fn signal_close(&self) {
        let _ = self.close_tx.send(true);
    }

    /// Block until the open condition fires, then rethrow the captured
    /// fault if one was set.
    pub(crate) async fn wait_open(&self) -> crate::Result<()> {
        let mut rx = self.open_rx.clone();
        if !*rx.borrow() {
            let _ = rx.changed().await;
        }
        match self.fault() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Block until the close condition fires, then return the fault (if
    /// any) or the final exit status.
    pub(crate) async fn wait_close(&self) -> crate::Result<ExitStatus> {
        let mut rx = self.close_rx.clone();
        if !*rx.borrow() {
            let _ = rx.changed().await;
        }
        match self.fault() {
            Some(e) => Err(e),
            None => Ok(self.status.lock().clone()),
        }
    }

    /// Non-blocking peek: the status if the close condition has already
    /// fired, `None` otherwise.
    pub(crate) fn wait_close_if_ready(&self) -> Option<ExitStatus> {
        if *self.close_rx.borrow() {
            Some(self.status.lock().clone())
        } else {
            None
        }
    }
}

/// Per-channel state: the transport-level open/close handshake plus the
/// captured fault, shared between the open-with-retry driver, the pump
/// task, and the waiter.
pub struct ChannelWrapper {
    pub(crate) id: russh::ChannelId,
    pub(crate) state: Arc<ChannelState>,
}

impl ChannelWrapper {
    pub(crate) fn new(id: russh::ChannelId, state: Arc<ChannelState>) -> Self {
        Self { id, state }
    }

    /// Block until the server has confirmed or refused the channel, then
    /// rethrow the captured fault if the open failed.
    pub async fn wait_open(&self) -> crate::Result<()> {
        self.state.wait_open().await
    }

    /// Block until the waiter's close condition fires.
    pub async fn wait(&self) -> crate::Result<ExitStatus> {
        self.state.wait_close().await
    }
}
