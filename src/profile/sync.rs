use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

/// Stop flag shared between the CLI and background watcher tasks
///
/// Backed by a `watch` channel holding the flag, so a waiter that subscribes
/// after `shutdown` still sees it.
pub struct ShutdownSignal {
    stopped: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stopped: watch::Sender::new(false),
        })
    }

    /// Sleep for `timeout` unless shutdown comes first
    ///
    /// Returns `true` if shutdown was signaled.
    pub async fn wait_timeout_or_shutdown(&self, timeout: Duration) -> bool {
        let mut rx = self.stopped.subscribe();
        // the sender lives in `self`, so `wait_for` cannot see a closed channel
        tokio::time::timeout(timeout, rx.wait_for(|stopped| *stopped))
            .await
            .is_ok()
    }

    pub fn is_shutdown(&self) -> bool {
        *self.stopped.borrow()
    }

    pub fn shutdown(&self) {
        self.stopped.send_replace(true);
    }
}
