//! Custom test assertions for integration tests

use std::path::Path;
use std::time::Duration;
use media_dl::{ErrorRecord, Event, TaskId, TaskResult};
use tokio::sync::broadcast;

/// Result of waiting for a task to finish
#[derive(Debug)]
pub enum WaitResult {
    /// Task finished successfully
    Finished(Box<TaskResult>),
    /// Task failed with an error record
    Failed(ErrorRecord),
    /// Timeout waiting for the terminal event
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for a task's terminal event on an existing subscription
///
/// Subscribe before enqueueing, otherwise the terminal event may already have
/// been broadcast.
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<Event>,
    id: TaskId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Finished { result }) if result.id == id => {
                    return WaitResult::Finished(Box::new(result));
                }
                Ok(Event::Error { error }) if error.id == id => {
                    return WaitResult::Failed(error);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Progress percentages reported for `id`, in order
pub fn progress_percentages(events: &[Event], id: TaskId) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress {
                id: event_id,
                snapshot,
                ..
            } if *event_id == id => Some(snapshot.percentage),
            _ => None,
        })
        .collect()
}

/// Drain every event currently buffered on the subscription
pub fn drain(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Assert that a file exists with exactly the expected contents
pub fn assert_file_contents(path: &Path, expected: &[u8]) {
    assert!(path.exists(), "expected output file {}", path.display());
    let actual = std::fs::read(path).expect("Failed to read output file");
    assert_eq!(
        actual.len(),
        expected.len(),
        "size mismatch for {}",
        path.display()
    );
    assert!(actual == expected, "contents differ for {}", path.display());
}
