//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local, TimeDelta};
use serde_json::{Value, json};

use driftwatch_core::{AnomalyLog, FileSyncPolicy, SkewHandler};
use driftwatch_types::{REPORTED_TIME_FORMAT, Threshold};

/// Handler writing to `<dir>/diff.log`.
pub fn handler_in(dir: &Path, threshold_secs: u64) -> SkewHandler {
    SkewHandler::new(
        Threshold::from_secs(threshold_secs),
        AnomalyLog::new(dir.join("diff.log"), FileSyncPolicy::default()),
    )
}

/// Reported time formatted the way producers send it.
pub fn rpt_time(at: DateTime<Local>) -> String {
    at.naive_local().format(REPORTED_TIME_FORMAT).to_string()
}

/// A telemetry payload shaped like the equipment feed.
pub fn telemetry_payload(msg_id: i64, reported: DateTime<Local>) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "trx_name": "eqp_data",
        "msg_id": msg_id,
        "token": "",
        "rpt_time": rpt_time(reported),
        "box_code": "2205107750",
        "encrypt": 0,
        "data": {
            "eqp_code": "MPTEST-BNL-12",
            "product_model": "",
            "product_code": "",
            "params": [
                { "k": "eqp_echo", "v": 1 },
                { "k": "EQP_STATUS", "v": "IDLE" }
            ]
        }
    }))
    .expect("payload serializes")
}

/// Payload reported `secs` seconds before now.
pub fn skewed_payload(msg_id: i64, secs: i64) -> Vec<u8> {
    telemetry_payload(msg_id, Local::now() - TimeDelta::seconds(secs))
}

/// Parse every line of the anomaly log; a missing file is an empty log.
pub fn read_records(path: &Path) -> Vec<Value> {
    match fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is one JSON object"))
            .collect(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => panic!("failed to read {}: {err}", path.display()),
    }
}
