//! Public types for the telemetry synchronizer.

use std::time::Duration;

use rand::Rng;

use rover_protocol::SensorSnapshot;
use rover_protocol::constants::WS_READ_DEADLINE;

/// Errors from the synchronizer's own API.
///
/// Transport failures never show up here: they are absorbed and surfaced
/// through [`ConnectionStatus`](rover_telemetry::ConnectionStatus).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("synchronizer already started")]
    AlreadyStarted,

    #[error("no Tokio runtime available")]
    NoRuntime,

    #[error(transparent)]
    Api(#[from] rover_api::ApiError),
}

/// Events fed to the task that owns the telemetry state.
#[derive(Debug)]
pub(crate) enum SyncEvent {
    /// Bootstrap read succeeded.
    Bootstrap(SensorSnapshot),
    /// Stream handshake completed.
    Opened,
    /// Inbound text frame, in arrival order.
    Frame(String),
    /// Text frame dropped unread for exceeding the size limit (its length).
    Oversized(usize),
    /// Peer closed the stream.
    Closed,
    /// Stream broke (I/O error, read deadline, failed reconnect attempt).
    Errored,
    /// No more reconnect attempts will be made.
    Failed,
}

/// Configuration for automatic reconnection with exponential backoff.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
    /// Consecutive failed attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
            max_attempts: Some(20),
        }
    }
}

impl ReconnectConfig {
    /// Calculates the delay for a given attempt number (1-based),
    /// with ±25% jitter so a fleet of dashboards does not reconnect in lockstep.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        let jitter = capped * 0.25;
        let offset: f64 = rand::thread_rng().gen_range(-1.0..1.0);
        let with_jitter = (capped + jitter * offset).max(0.05);
        Duration::from_secs_f64(with_jitter)
    }

    /// Whether `attempt` (1-based) is past the retry budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }
}

/// Synchronizer settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub reconnect: ReconnectConfig,
    /// Silence on the stream longer than this counts as a dead link.
    pub read_deadline: Duration,
    /// Buffered change notifications per subscriber before it lags.
    pub notify_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            read_deadline: WS_READ_DEADLINE,
            notify_capacity: 64,
        }
    }
}
