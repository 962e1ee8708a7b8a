//! Shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::Result;
use crate::types::Event;

use super::{MediaDownloader, invoke_callback};
use super::queue::cancelled_record;

/// How long shutdown waits for running tasks to wind down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new tasks (`enqueue` returns `Error::ShuttingDown`)
    /// 2. Cancels every pending task, delivering a `Cancelled` outcome for each
    /// 3. Signals cancellation to all running tasks
    /// 4. Waits for running tasks to deliver their outcome, with a timeout (30 seconds)
    /// 5. Stops the queue processor and emits `Event::Shutdown`
    ///
    /// Calling it again after the first shutdown is a no-op.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok(())`; a timeout while waiting for running tasks
    /// is logged rather than returned.
    pub async fn shutdown(&self) -> Result<()> {
        // 1. Stop accepting new tasks
        if !self.queue_state.accepting_new.swap(false, Ordering::SeqCst) {
            tracing::debug!("Shutdown already performed");
            return Ok(());
        }
        tracing::info!("Initiating graceful shutdown");

        // 2. Drain pending tasks and 3. signal running ones, in one critical section
        let drained = {
            let mut inner = self.queue_state.inner.lock().await;
            let mut drained = Vec::with_capacity(inner.pending.len());

            while let Some(task) = inner.pending.pop_front() {
                let record = cancelled_record(
                    task.id,
                    &task.descriptor.source_id,
                    "cancelled by shutdown before start",
                );
                invoke_callback(task.on_complete, task.id, Err(record.clone()));
                self.queue_state.publish_total(&inner, &self.events);
                drained.push(record);
            }

            tracing::debug!(
                active_count = inner.active.len(),
                "Signaling cancellation to all running tasks"
            );
            for (id, active) in inner.active.iter() {
                tracing::debug!(task_id = id.0, source_id = %active.source_id, "Signaling cancellation");
                active.cancel_token.cancel();
            }

            drained
        };

        if !drained.is_empty() {
            tracing::info!(cancelled = drained.len(), "Cancelled pending tasks");
        }
        for record in drained {
            self.emit_terminal(Err(record));
        }

        // 4. Wait for running tasks to deliver their outcome
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_until_idle()).await {
            Ok(()) => tracing::info!("All running tasks finished"),
            Err(_) => tracing::warn!("Timeout waiting for running tasks, proceeding with shutdown"),
        }

        // 5. Stop the processor and announce shutdown
        self.queue_state.shutdown_token.cancel();
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
