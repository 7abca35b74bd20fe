//! Skew detection core for driftwatch.
//!
//! - **`handler`**: the per-delivery state machine ([`SkewHandler`])
//! - **`persist`**: the append-only anomaly log ([`AnomalyLog`])
//! - **`source`**: a newline-delimited delivery source ([`LineSource`])

pub mod handler;
pub mod persist;
pub mod source;

pub use handler::{DiscardReason, Handler, Outcome, SkewHandler};
pub use persist::{AnomalyLog, FileSyncPolicy, PersistError};
pub use source::{LineSource, SourceStats};
