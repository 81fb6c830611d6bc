//! Background sweep thread.

use super::registry::Registry;
use crate::error::{KeylockError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Owns the collector thread. Dropping it stops and joins the thread.
#[derive(Debug)]
pub(crate) struct Collector {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Collector {
    pub(crate) fn spawn(registry: Arc<Registry>, interval: Duration) -> Result<Self> {
        let (shutdown, signal) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("keylock-gc".to_string())
            .spawn(move || run(&registry, interval, &signal))
            .map_err(|e| {
                KeylockError::RuntimeError(format!("failed to spawn collector thread: {}", e))
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        // Disconnecting the channel wakes the thread immediately.
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("lock collector thread panicked");
        }
    }
}

fn run(registry: &Registry, interval: Duration, signal: &Receiver<()>) {
    tracing::debug!(?interval, "lock collector started");

    loop {
        match signal.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        // A failed pass leaves the map as it was; the next tick tries again.
        match panic::catch_unwind(AssertUnwindSafe(|| registry.sweep())) {
            Ok(0) => {}
            Ok(removed) => {
                tracing::debug!(removed, remaining = registry.len(), "swept idle lock entries");
            }
            Err(_) => tracing::warn!("lock sweep panicked, retrying on next tick"),
        }
    }

    tracing::debug!("lock collector stopped");
}
