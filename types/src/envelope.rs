//! Inbound message envelope.
//!
//! ```json
//! {
//!     "trx_name": "eqp_data",
//!     "msg_id": 1670285870,
//!     "rpt_time": "2022-12-06T00:17:50.463511",
//!     "box_code": "2205107750",
//!     "data": { "eqp_code": "MPTEST-BNL-12", "params": [{ "k": "eqp_echo", "v": 1 }] }
//! }
//! ```
//!
//! Only `msg_id` and `rpt_time` are interpreted. Every other field is carried
//! verbatim so it can be re-emitted in an anomaly record.

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ids::MessageId;
use crate::timestamp::{TimestampParseError, parse_reported_time};

/// Payload is not a well-formed JSON object with the expected field types.
#[derive(Debug, Error)]
#[error("malformed envelope: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Timestamp(#[from] TimestampParseError),
}

/// A decoded message with its reported time resolved to a local instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    id: MessageId,
    rpt_time: String,
    reported: DateTime<Local>,
    fields: Map<String, Value>,
}

impl Envelope {
    /// Decode a raw delivery payload.
    ///
    /// A missing `msg_id` decodes as 0. A missing `rpt_time` is treated as an
    /// empty string and fails timestamp parsing. Other fields keep their
    /// exact JSON text, including numbers wider than 64 bits.
    pub fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let mut fields: Map<String, Value> =
            serde_json::from_slice(payload).map_err(DecodeError::from)?;
        let id: MessageId = take_field(&mut fields, "msg_id")?;
        let rpt_time: String = take_field(&mut fields, "rpt_time")?;
        let reported = parse_reported_time(&rpt_time)?;
        Ok(Self {
            id,
            rpt_time,
            reported,
            fields,
        })
    }

    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The reported time exactly as the producer sent it.
    #[must_use]
    pub fn rpt_time(&self) -> &str {
        &self.rpt_time
    }

    #[must_use]
    pub fn reported(&self) -> DateTime<Local> {
        self.reported
    }

    /// Fields other than `msg_id` and `rpt_time`.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn into_parts(self) -> (MessageId, String, Map<String, Value>) {
        (self.id, self.rpt_time, self.fields)
    }
}

/// Remove `key` from the object and decode it, or use the default when absent.
fn take_field<T>(fields: &mut Map<String, Value>, key: &str) -> Result<T, DecodeError>
where
    T: DeserializeOwned + Default,
{
    match fields.remove(key) {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}
