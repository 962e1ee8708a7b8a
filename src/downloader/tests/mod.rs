//! Queue behaviour tests against in-process collaborators.

use super::*;
use crate::downloader::test_helpers::*;
use crate::error::ErrorKind;
use crate::types::{TaskMode, TaskOutcome};
use std::time::Duration;

mod lifecycle;
mod queue_processor;

/// Await a task's outcome receiver, failing the test after 5 seconds
async fn outcome(rx: tokio::sync::oneshot::Receiver<TaskOutcome>) -> TaskOutcome {
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("timed out waiting for outcome")
        .expect("outcome sender dropped")
}

/// Wait until the queue is idle, failing the test after 5 seconds
async fn idle(downloader: &MediaDownloader) {
    tokio::time::timeout(Duration::from_secs(5), downloader.wait_until_idle())
        .await
        .expect("queue did not become idle");
}
