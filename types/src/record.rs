use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::ids::MessageId;
use crate::skew::Skew;
use crate::timestamp::format_observed;

/// Keys derived at receipt. They replace any same-named producer fields.
const DERIVED_KEYS: [&str; 2] = ["now", "duration"];

/// An envelope enriched with the observed time and rendered skew.
///
/// Serializes to a single JSON object: `msg_id`, `rpt_time`, `now`,
/// `duration`, then the producer's remaining fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    msg_id: MessageId,
    rpt_time: String,
    #[serde(serialize_with = "serialize_observed")]
    now: DateTime<Local>,
    duration: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl AnomalyRecord {
    #[must_use]
    pub fn new(envelope: Envelope, observed: DateTime<Local>, skew: Skew) -> Self {
        let (msg_id, rpt_time, mut fields) = envelope.into_parts();
        for key in DERIVED_KEYS {
            fields.remove(key);
        }
        Self {
            msg_id,
            rpt_time,
            now: observed,
            duration: skew.to_string(),
            fields,
        }
    }

    /// One newline-terminated JSON object.
    pub fn to_json_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

fn serialize_observed<S: Serializer>(
    observed: &DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_observed(observed))
}
