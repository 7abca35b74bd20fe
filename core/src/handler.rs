//! Per-delivery skew detection.
//!
//! Each delivery moves `received -> parsed -> (persisted | discarded)`:
//!
//! ```text
//! payload --parse--> Envelope --skew <= threshold--> Discarded(WithinThreshold)
//!    |                  |
//!    |                  +--skew > threshold--> AnomalyLog::append --> Persisted
//!    +--DecodeError / TimestampParseError--> Discarded(Malformed)
//! ```
//!
//! Nothing escapes a delivery: every failure ends as a log line.

use chrono::{DateTime, Local};
use tracing::{debug, error, warn};

use driftwatch_config::ListenerConfig;
use driftwatch_types::{AnomalyRecord, Envelope, Skew, Threshold};

use crate::persist::{AnomalyLog, FileSyncPolicy};

/// Entry point the delivery source calls once per received payload.
///
/// Implementations run to completion on the calling thread and must tolerate
/// concurrent calls for distinct deliveries. Acknowledgment stays with the
/// source.
pub trait Handler: Send + Sync {
    fn handle(&self, payload: &[u8]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Payload or reported timestamp could not be parsed.
    Malformed,
    WithinThreshold,
}

/// Terminal state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Skew exceeded the threshold. `written` is `None` when the append failed.
    Persisted { written: Option<usize> },
    Discarded(DiscardReason),
}

#[derive(Debug)]
pub struct SkewHandler {
    threshold: Threshold,
    log: AnomalyLog,
}

impl SkewHandler {
    #[must_use]
    pub fn new(threshold: Threshold, log: AnomalyLog) -> Self {
        Self { threshold, log }
    }

    #[must_use]
    pub fn from_config(config: &ListenerConfig) -> Self {
        let sync = if config.sync_writes {
            FileSyncPolicy::SyncData
        } else {
            FileSyncPolicy::SkipSync
        };
        Self::new(config.threshold(), AnomalyLog::new(&config.log_path, sync))
    }

    #[must_use]
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    #[must_use]
    pub fn log(&self) -> &AnomalyLog {
        &self.log
    }

    /// Process one payload as if it had been received at `observed`.
    pub fn handle_at(&self, payload: &[u8], observed: DateTime<Local>) -> Outcome {
        debug!(payload = %String::from_utf8_lossy(payload), "Received delivery");

        let envelope = match Envelope::parse(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("Discarding delivery: {err}");
                return Outcome::Discarded(DiscardReason::Malformed);
            }
        };

        let msg_id = envelope.id();
        let skew = Skew::between(observed, envelope.reported());
        if !skew.exceeds(self.threshold) {
            debug!(%msg_id, %skew, "Skew within threshold");
            return Outcome::Discarded(DiscardReason::WithinThreshold);
        }

        warn!(
            %msg_id,
            %skew,
            threshold = %self.threshold,
            rpt_time = envelope.rpt_time(),
            "Skew exceeds threshold"
        );
        let record = AnomalyRecord::new(envelope, observed, skew);
        match self.log.append(&record) {
            Ok(bytes) => {
                debug!(%msg_id, bytes, path = %self.log.path().display(), "Anomaly recorded");
                Outcome::Persisted {
                    written: Some(bytes),
                }
            }
            Err(err) => {
                error!(%msg_id, "Dropping anomaly record: {err}");
                Outcome::Persisted { written: None }
            }
        }
    }
}

impl Handler for SkewHandler {
    fn handle(&self, payload: &[u8]) {
        let observed = Local::now();
        self.handle_at(payload, observed);
    }
}
