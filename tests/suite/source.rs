//! Line source feeding the real handler

use std::sync::Arc;

use driftwatch_core::{LineSource, SourceStats};

use crate::common::{handler_in, read_records, skewed_payload};

fn feed(lines: &[Vec<u8>]) -> Vec<u8> {
    let mut input = Vec::new();
    for line in lines {
        input.extend_from_slice(line);
        input.push(b'\n');
    }
    input
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stdin_style_feed_records_only_anomalies() {
    let dir = tempfile::tempdir().unwrap();
    let handler = Arc::new(handler_in(dir.path(), 5));
    let input = feed(&[
        skewed_payload(1, 10),
        skewed_payload(2, 0),
        b"garbage".to_vec(),
        Vec::new(),
        skewed_payload(3, 3_600),
    ]);

    let stats = LineSource::new(input.as_slice())
        .run(Arc::clone(&handler))
        .await
        .unwrap();

    assert_eq!(stats, SourceStats { delivered: 4, skipped: 1 });
    let mut ids: Vec<i64> = read_records(handler.log().path())
        .iter()
        .map(|record| record["msg_id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_lines_through_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let handler = Arc::new(handler_in(dir.path(), 5));
    let lines: Vec<Vec<u8>> = (0..100).map(|id| skewed_payload(id, 45)).collect();
    let input = feed(&lines);

    let stats = LineSource::new(input.as_slice())
        .run(Arc::clone(&handler))
        .await
        .unwrap();

    assert_eq!(stats.delivered, 100);
    let records = read_records(handler.log().path());
    assert_eq!(records.len(), 100);
    assert!(records.iter().all(|record| record["now"].is_string()));
}
