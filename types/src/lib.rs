//! Core domain types for driftwatch.
//!
//! This crate contains pure domain types with no IO and no async: the inbound
//! envelope, reported-time parsing, skew measurement and rendering, and the
//! anomaly record written to the log. Everything here can be used from any
//! layer of the application.

mod envelope;
mod ids;
mod record;
mod skew;
mod timestamp;

pub use envelope::{DecodeError, Envelope, ParseError};
pub use ids::MessageId;
pub use record::AnomalyRecord;
pub use skew::{Skew, Threshold, render_duration};
pub use timestamp::{
    REPORTED_TIME_FORMAT, TimestampParseError, format_observed, parse_reported_time,
};
