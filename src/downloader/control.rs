//! Task control - cancellation of pending and running tasks.

use crate::error::{Error, Result};
use crate::types::TaskId;

use super::{MediaDownloader, invoke_callback};
use super::queue::cancelled_record;

impl MediaDownloader {
    /// Cancel a task
    ///
    /// A pending task is removed from the queue and its outcome, an
    /// [`ErrorRecord`](crate::ErrorRecord) of kind `Cancelled`, is delivered right away
    /// through the callback, `QueueSize` and `Error` event. A running task is signalled
    /// through its cancellation token; its runner stops at the next await point and
    /// delivers the same kind of outcome, removing any partial output file.
    ///
    /// Either way the task produces exactly one terminal event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the task is neither pending nor running (it may
    /// already have finished).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(downloader: MediaDownloader, id: TaskId) -> Result<()> {
    /// downloader.cancel(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: TaskId) -> Result<()> {
        let record = {
            let mut inner = self.queue_state.inner.lock().await;

            if let Some(active) = inner.active.get(&id) {
                tracing::info!(task_id = id.0, source_id = %active.source_id, "Cancelling running task");
                active.cancel_token.cancel();
                return Ok(());
            }

            let Some(position) = inner.pending.iter().position(|task| task.id == id) else {
                return Err(Error::NotFound(id.to_string()));
            };
            let Some(task) = inner.pending.remove(position) else {
                return Err(Error::NotFound(id.to_string()));
            };

            tracing::info!(task_id = id.0, source_id = %task.descriptor.source_id, "Cancelled pending task");
            let record = cancelled_record(id, &task.descriptor.source_id, "cancelled before start");
            invoke_callback(task.on_complete, id, Err(record.clone()));
            self.queue_state.publish_total(&inner, &self.events);
            record
        };

        self.emit_terminal(Err(record));
        Ok(())
    }
}
