//! Per-task progress tracking
//!
//! A [`ProgressTracker`] counts bytes as they flow through a task's stream and turns
//! them into time-gated [`ProgressSnapshot`]s: at most one per sampling interval
//! while the transfer runs, plus one final snapshot at 100% when the stream ends.
//! Only the final snapshot feeds [`TaskStats`](crate::types::TaskStats).

use futures::StreamExt;
use std::time::Duration;
use tokio::time::Instant;

use crate::source::ByteStream;
use crate::types::ProgressSnapshot;

/// Derives progress snapshots for a single transfer
///
/// One tracker is created per task; nothing is shared across tasks.
#[derive(Debug)]
pub struct ProgressTracker {
    /// Declared total length, if known up front
    total_bytes: Option<u64>,
    /// Minimum time between two intermediate snapshots
    interval: Duration,
    /// When the transfer started
    started: Instant,
    /// Bytes seen so far
    transferred: u64,
    /// Time of the previous snapshot (or start)
    last_sample_at: Instant,
    /// Byte count at the previous snapshot (or 0)
    last_sample_bytes: u64,
}

impl ProgressTracker {
    /// Start tracking a transfer of `total_bytes` (if known), sampling every `interval`
    pub fn new(total_bytes: Option<u64>, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            total_bytes: total_bytes.filter(|&total| total > 0),
            interval,
            started: now,
            transferred: 0,
            last_sample_at: now,
            last_sample_bytes: 0,
        }
    }

    /// Declared total length, if known
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// Bytes counted so far
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Count `bytes` more and return a snapshot if the sampling interval has elapsed
    ///
    /// Never returns a snapshot once the declared total is reached; that one is
    /// left to [`finish`](Self::finish) so there is a single 100% snapshot.
    pub fn record(&mut self, bytes: u64) -> Option<ProgressSnapshot> {
        self.transferred = self.transferred.saturating_add(bytes);

        if let Some(total) = self.total_bytes
            && self.transferred >= total
        {
            return None;
        }

        let now = Instant::now();
        if now.duration_since(self.last_sample_at) < self.interval {
            return None;
        }

        Some(self.sample(now, false))
    }

    /// Produce the final snapshot for a completed transfer
    ///
    /// When the total was unknown it becomes the transferred count.
    pub fn finish(&mut self) -> ProgressSnapshot {
        if self.total_bytes.is_none() {
            self.total_bytes = Some(self.transferred);
        }
        self.sample(Instant::now(), true)
    }

    fn sample(&mut self, now: Instant, complete: bool) -> ProgressSnapshot {
        let elapsed = now.duration_since(self.started);
        let window = now.duration_since(self.last_sample_at);
        let delta = self.transferred - self.last_sample_bytes;

        let instant_speed_bps = if window.as_secs_f64() > 0.0 {
            delta as f64 / window.as_secs_f64()
        } else {
            0.0
        };

        let total = self.total_bytes.unwrap_or(0);
        let remaining_bytes = if complete {
            0
        } else {
            total.saturating_sub(self.transferred)
        };

        let percentage = if complete {
            100.0
        } else if total > 0 {
            (self.transferred as f64 * 100.0) / total as f64
        } else {
            0.0
        };

        let average_speed = if elapsed.as_secs_f64() > 0.0 {
            self.transferred as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let eta_ms = if total > 0 && average_speed > 0.0 {
            ((remaining_bytes as f64 / average_speed) * 1000.0) as u64
        } else {
            0
        };

        self.last_sample_at = now;
        self.last_sample_bytes = self.transferred;

        ProgressSnapshot {
            transferred_bytes: self.transferred,
            total_bytes: if complete { self.transferred } else { total },
            remaining_bytes,
            percentage,
            elapsed_ms: elapsed.as_millis() as u64,
            eta_ms,
            instant_speed_bps,
        }
    }
}

/// Receives snapshots from a tracked stream
///
/// Called inline from the stream as chunks pass through, so snapshots for a task
/// are delivered in order and before the consumer observes the end of the stream.
pub trait ProgressSink: Send + 'static {
    /// An intermediate snapshot
    fn progress(&mut self, snapshot: ProgressSnapshot);

    /// The final 100% snapshot
    fn complete(&mut self, snapshot: ProgressSnapshot);
}

struct TrackedState<S> {
    inner: ByteStream,
    tracker: ProgressTracker,
    sink: S,
    done: bool,
}

/// Wrap `inner` so every chunk is counted by `tracker` and snapshots reach `sink`
///
/// The returned stream yields an error instead of ending normally when the byte
/// count disagrees with a declared total (short read or overrun); in that case no
/// final snapshot is produced.
pub fn track_stream<S: ProgressSink>(
    inner: ByteStream,
    tracker: ProgressTracker,
    sink: S,
) -> ByteStream {
    let state = TrackedState {
        inner,
        tracker,
        sink,
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        match state.inner.next().await {
            Some(Ok(chunk)) => {
                let snapshot = state.tracker.record(chunk.len() as u64);

                if let Some(total) = state.tracker.total_bytes()
                    && state.tracker.transferred() > total
                {
                    state.done = true;
                    let err = std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "stream delivered more than the declared {} bytes",
                            total
                        ),
                    );
                    return Some((Err(err), state));
                }

                if let Some(snapshot) = snapshot {
                    state.sink.progress(snapshot);
                }
                Some((Ok(chunk), state))
            }
            Some(Err(e)) => {
                state.done = true;
                Some((Err(e), state))
            }
            None => {
                state.done = true;
                if let Some(total) = state.tracker.total_bytes()
                    && state.tracker.transferred() < total
                {
                    let err = std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!(
                            "stream ended after {} of {} bytes",
                            state.tracker.transferred(),
                            total
                        ),
                    );
                    return Some((Err(err), state));
                }

                let snapshot = state.tracker.finish();
                state.sink.complete(snapshot);
                None
            }
        }
    })
    .boxed()
}
