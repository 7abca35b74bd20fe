//! Concurrent deliveries against a single anomaly log

use std::collections::BTreeSet;
use std::sync::Arc;

use driftwatch_core::Handler;

use crate::common::{handler_in, read_records, skewed_payload};

const DELIVERIES: i64 = 100;

#[test]
fn hundred_simultaneous_anomalies_yield_hundred_lines() {
    let dir = tempfile::tempdir().unwrap();
    let handler: Arc<dyn Handler> = Arc::new(handler_in(dir.path(), 5));
    let barrier = Arc::new(std::sync::Barrier::new(DELIVERIES as usize));

    let threads: Vec<_> = (0..DELIVERIES)
        .map(|msg_id| {
            let handler = Arc::clone(&handler);
            let barrier = Arc::clone(&barrier);
            let payload = skewed_payload(msg_id, 60);
            std::thread::spawn(move || {
                barrier.wait();
                handler.handle(&payload);
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let text = std::fs::read_to_string(dir.path().join("diff.log")).unwrap();
    assert!(text.ends_with('\n'));
    assert_eq!(text.lines().count(), DELIVERIES as usize);

    let ids: BTreeSet<i64> = read_records(&dir.path().join("diff.log"))
        .iter()
        .map(|record| record["msg_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, (0..DELIVERIES).collect::<BTreeSet<_>>());
}

#[test]
fn mixed_concurrent_deliveries_only_record_anomalies() {
    let dir = tempfile::tempdir().unwrap();
    let handler = handler_in(dir.path(), 5);

    std::thread::scope(|scope| {
        for msg_id in 0..DELIVERIES {
            let handler = &handler;
            scope.spawn(move || match msg_id % 3 {
                0 => handler.handle(&skewed_payload(msg_id, 120)),
                1 => handler.handle(&skewed_payload(msg_id, 0)),
                _ => handler.handle(b"{\"msg_id\":"),
            });
        }
    });

    let records = read_records(handler.log().path());
    let expected = (0..DELIVERIES).filter(|id| id % 3 == 0).count();
    assert_eq!(records.len(), expected);
    assert!(
        records
            .iter()
            .all(|record| record["msg_id"].as_i64().unwrap() % 3 == 0)
    );
}
