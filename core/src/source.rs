//! Newline-delimited delivery source.
//!
//! Stands in for a queue subscription: every non-blank line read from the
//! underlying reader is one delivery. Deliveries are handed to the handler on
//! the blocking pool, so they run in parallel and finish in no particular
//! order. At most `max_in_flight` deliveries run at once; the next line is not
//! read until one of them returns. The source never looks at outcomes and
//! never acknowledges anything.

use std::future::{Future, pending};
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::handler::Handler;

/// Matches tokio's default cap on blocking-pool threads.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Payloads handed to the handler.
    pub delivered: u64,
    /// Blank lines skipped.
    pub skipped: u64,
}

pub struct LineSource<R> {
    reader: BufReader<R>,
    max_in_flight: usize,
}

impl<R: AsyncRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Bound concurrent deliveries. Zero is treated as one.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Deliver every line until EOF, then wait for in-flight deliveries.
    pub async fn run<H>(self, handler: Arc<H>) -> io::Result<SourceStats>
    where
        H: Handler + 'static,
    {
        self.run_until(handler, pending()).await
    }

    /// Like [`run`](Self::run), but stop reading once `shutdown` resolves.
    ///
    /// Deliveries already dispatched still complete. A line that was only
    /// partially read when shutdown fired is dropped.
    pub async fn run_until<H, F>(mut self, handler: Arc<H>, shutdown: F) -> io::Result<SourceStats>
    where
        H: Handler + 'static,
        F: Future<Output = ()>,
    {
        let mut stats = SourceStats::default();
        let mut in_flight = JoinSet::new();
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        tokio::pin!(shutdown);

        loop {
            let mut line = Vec::new();
            let read = tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, no further deliveries will be read");
                    break;
                }
                read = self.reader.read_until(b'\n', &mut line) => read,
            };

            let read = match read {
                Ok(read) => read,
                Err(err) => {
                    drain(&mut in_flight).await;
                    return Err(err);
                }
            };
            if read == 0 {
                break;
            }

            let payload = trim_line_ending(line);
            if payload.iter().all(u8::is_ascii_whitespace) {
                stats.skipped += 1;
                continue;
            }

            // `permits` is never closed.
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            stats.delivered += 1;
            let handler = Arc::clone(&handler);
            in_flight.spawn_blocking(move || {
                let _permit = permit;
                handler.handle(&payload);
            });

            while let Some(result) = in_flight.try_join_next() {
                report(result);
            }
        }

        debug!(in_flight = in_flight.len(), "Waiting for in-flight deliveries");
        drain(&mut in_flight).await;
        Ok(stats)
    }
}

fn trim_line_ending(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    line
}

async fn drain(in_flight: &mut JoinSet<()>) {
    while let Some(result) = in_flight.join_next().await {
        report(result);
    }
}

fn report(result: Result<(), JoinError>) {
    if let Err(err) = result {
        error!("Delivery task failed: {err}");
    }
}
