//! Waiter Task.
//!
//! One task per channel. Its body is deliberately thin in this port: the
//! actual I/O plumbing and the exit-status/exit-signal bookkeeping happen
//! in the pump task (`pump.rs`), since that's the task that actually holds
//! the `russh::Channel` and dispatches its messages. The waiter's job is
//! purely to be the caller's join point: any caller that holds the waiter
//! may read its status after join. Session teardown (`handler.rs`'s
//! `disconnected` hook draining the channel registry) signals every
//! channel's close condition on shutdown, so an abandoned waiter never
//! blocks forever.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::channel::ChannelState;
use crate::status::ExitStatus;

/// The caller's join point for a remote command: blocks until the channel's
/// close condition fires and yields the terminal [`ExitStatus`].
pub struct Waiter {
    state: Arc<ChannelState>,
    join: AsyncMutex<Option<JoinHandle<crate::Result<ExitStatus>>>>,
}

impl Waiter {
    pub(crate) fn spawn(state: Arc<ChannelState>) -> Self {
        let task_state = state.clone();
        let join = tokio::spawn(async move { task_state.wait_close().await });
        Self {
            state,
            join: AsyncMutex::new(Some(join)),
        }
    }

    /// Block until the remote process has exited (or the channel died
    /// before termination info arrived), and return its terminal status.
    ///
    /// Safe to call more than once, including concurrently: the first call
    /// joins the background task, every subsequent call observes the same
    /// result through the shared close condition.
    pub async fn wait(&self) -> crate::Result<ExitStatus> {
        let mut guard = self.join.lock().await;
        match guard.take() {
            Some(handle) => handle.await.unwrap_or_else(|join_err| {
                Err(crate::Error::Transport(format!(
                    "waiter task panicked: {join_err}"
                )))
            }),
            None => self.state.wait_close().await,
        }
    }

    /// Peek at the terminal status without blocking, if it's already known.
    pub fn try_status(&self) -> Option<ExitStatus> {
        self.state.wait_close_if_ready()
    }
}
