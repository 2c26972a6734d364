//! Gate between the state owner and observers.
//!
//! `close()` takes the channels out under the same lock `publish()` sends
//! under, so once it returns nothing can be delivered anymore.

use std::sync::Mutex;

use tokio::sync::{broadcast, watch};
use tracing::trace;

use rover_telemetry::SyncState;

struct Channels {
    latest: watch::Sender<SyncState>,
    changes: broadcast::Sender<SyncState>,
}

pub(crate) struct Notifier {
    channels: Mutex<Option<Channels>>,
}

impl Notifier {
    /// Creates the gate and the latest-value receiver kept by the owner.
    pub(crate) fn new(capacity: usize) -> (Self, watch::Receiver<SyncState>) {
        let (latest, latest_rx) = watch::channel(SyncState::default());
        let (changes, _) = broadcast::channel(capacity.max(1));
        let notifier = Self {
            channels: Mutex::new(Some(Channels { latest, changes })),
        };
        (notifier, latest_rx)
    }

    /// Publishes a new state. Returns `false` once closed.
    pub(crate) fn publish(&self, state: SyncState) -> bool {
        let Ok(guard) = self.channels.lock() else {
            return false;
        };
        let Some(ch) = guard.as_ref() else {
            trace!("notifier closed, dropping state change");
            return false;
        };
        ch.latest.send_replace(state.clone());
        // No subscribers is fine.
        let _ = ch.changes.send(state);
        true
    }

    /// Receiver of every change, in order. Already closed if the gate is.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SyncState> {
        if let Ok(guard) = self.channels.lock()
            && let Some(ch) = guard.as_ref()
        {
            return ch.changes.subscribe();
        }
        let (_, rx) = broadcast::channel(1);
        rx
    }

    /// Closes both channels. Idempotent.
    pub(crate) fn close(&self) {
        let mut guard = match self.channels.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.channels.lock().map_or(true, |g| g.is_none())
    }
}
