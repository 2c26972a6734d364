//! The telemetry synchronizer.
//!
//! One owning task holds the [`TelemetryState`]. The bootstrap task and the
//! stream task only send it [`SyncEvent`]s, so the state has a single
//! writer and events are applied strictly in the order they arrive.

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rover_api::Client;
use rover_telemetry::{SyncState, TelemetryState};

use crate::notifier::Notifier;
use crate::stream;
use crate::types::{SyncConfig, SyncError, SyncEvent};

/// Inbound event queue depth between the transport tasks and the state owner.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Keeps one merged view of the rover's sensors live.
///
/// Lifetime is explicit: [`start`](Self::start) once, [`stop`](Self::stop)
/// any number of times. Dropping the synchronizer stops it, so the stream
/// never outlives its owner.
pub struct Synchronizer {
    client: Client,
    stream_url: Url,
    config: SyncConfig,
    notifier: Arc<Notifier>,
    latest: watch::Receiver<SyncState>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl Synchronizer {
    /// Creates a synchronizer for the rover behind `client`.
    ///
    /// The stream URL is derived from the client's base URL.
    pub fn new(client: Client, config: SyncConfig) -> Result<Self, SyncError> {
        let stream_url = rover_api::stream_url(client.base_url())?;
        let (notifier, latest) = Notifier::new(config.notify_capacity);
        Ok(Self {
            client,
            stream_url,
            config,
            notifier: Arc::new(notifier),
            latest,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            started: false,
        })
    }

    /// Overrides the telemetry stream URL (e.g. when it is proxied separately).
    pub fn with_stream_url(mut self, url: Url) -> Self {
        self.stream_url = url;
        self
    }

    /// The telemetry stream URL in use.
    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }

    /// Issues the bootstrap read and opens the stream.
    ///
    /// May be called once; must be called from within a Tokio runtime.
    /// Transport failures are never returned here, they show up in
    /// [`SyncState::status`].
    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.started {
            return Err(SyncError::AlreadyStarted);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        self.started = true;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        self.tasks.push(runtime.spawn(drive(
            events_rx,
            self.notifier.clone(),
            self.cancel.clone(),
        )));

        let client = self.client.clone();
        let bootstrap_tx = events_tx.clone();
        self.tasks.push(runtime.spawn(async move {
            match client.fetch_sensors().await {
                Ok(snapshot) => {
                    let _ = bootstrap_tx.send(SyncEvent::Bootstrap(snapshot)).await;
                }
                Err(e) => warn!(error = %e, "sensor bootstrap read failed"),
            }
        }));

        self.tasks.push(runtime.spawn(stream::run(
            self.stream_url.clone(),
            self.config.clone(),
            events_tx,
            self.cancel.clone(),
        )));

        info!(
            base = %self.client.base_url(),
            stream = %self.stream_url,
            "telemetry synchronizer started"
        );
        Ok(())
    }

    /// Tears down the stream and any pending bootstrap read.
    ///
    /// Idempotent and safe before [`start`](Self::start). No notification
    /// is delivered after this returns; [`current`](Self::current) keeps
    /// the last state.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.notifier.close();
        let running = !self.tasks.is_empty();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if running {
            info!("telemetry synchronizer stopped");
        }
    }

    /// Point-in-time copy of the merged state.
    pub fn current(&self) -> SyncState {
        self.latest.borrow().clone()
    }

    /// Latest-value receiver; intermediate states may be skipped.
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.latest.clone()
    }

    /// Receiver of every state change, in order.
    ///
    /// Closed once the synchronizer stops. A subscriber that falls more
    /// than `notify_capacity` changes behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncState> {
        self.notifier.subscribe()
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the synchronizer has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.notifier.is_closed()
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Applies events to the state and publishes every change.
async fn drive(
    mut events: mpsc::Receiver<SyncEvent>,
    notifier: Arc<Notifier>,
    cancel: CancellationToken,
) {
    let mut state = TelemetryState::new();

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            ev = events.recv() => match ev {
                Some(ev) => ev,
                None => break,
            },
        };

        if apply(&mut state, event) && !notifier.publish(state.view()) {
            break;
        }
    }

    debug!(
        status = %state.status(),
        discarded = state.discarded_frames(),
        "telemetry state owner finished"
    );
}

/// Routes one event to the state. Returns whether observers must be notified.
fn apply(state: &mut TelemetryState, event: SyncEvent) -> bool {
    match event {
        SyncEvent::Bootstrap(snapshot) => state.on_bootstrap(snapshot),
        SyncEvent::Opened => state.on_open(),
        SyncEvent::Frame(raw) => state.on_message(&raw).notifies(),
        SyncEvent::Oversized(len) => state.on_oversized(len).notifies(),
        SyncEvent::Closed => state.on_close(),
        SyncEvent::Errored => state.on_error(),
        SyncEvent::Failed => state.on_failed(),
    }
}
