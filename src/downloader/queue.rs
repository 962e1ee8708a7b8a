//! Task admission, completion delivery, and queue statistics.

use std::sync::atomic::Ordering;

use crate::error::{Error, ErrorKind, Result};
use crate::types::{ErrorRecord, Event, QueueStats, TaskDescriptor, TaskId, TaskOutcome};

use super::{MediaDownloader, QueuedTask, invoke_callback};

impl MediaDownloader {
    /// Add a task to the queue
    ///
    /// Admission never waits for a slot: the task is appended to the pending list and
    /// picked up in FIFO order once fewer than `queue_parallelism` tasks are running.
    /// `on_complete` receives the terminal outcome exactly once, before the
    /// `QueueSize` and `Finished`/`Error` events for that completion are broadcast.
    ///
    /// The callback runs while the queue lock is held; it must return quickly and
    /// must not wait on the downloader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun.
    pub async fn enqueue<F>(&self, task: TaskDescriptor, on_complete: F) -> Result<TaskId>
    where
        F: FnOnce(TaskOutcome) + Send + 'static,
    {
        let id = {
            let mut inner = self.queue_state.inner.lock().await;

            // Checked under the lock so shutdown's drain sees every admitted task
            if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
                return Err(Error::ShuttingDown);
            }

            let id = TaskId(self.queue_state.next_id.fetch_add(1, Ordering::SeqCst));
            self.emit_event(Event::Queued {
                id,
                source_id: task.source_id.clone(),
                mode: task.mode,
            });

            tracing::info!(
                task_id = id.0,
                source_id = %task.source_id,
                mode = ?task.mode,
                "Task queued"
            );

            inner.pending.push_back(QueuedTask {
                id,
                descriptor: task,
                on_complete: Box::new(on_complete),
            });
            self.queue_state.publish_total(&inner, &self.events);
            id
        };

        self.queue_state.work_available.notify_one();
        Ok(id)
    }

    /// Add a task and get a receiver for its outcome
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(downloader: MediaDownloader) -> Result<()> {
    /// let (id, done) = downloader
    ///     .submit(TaskDescriptor::raw("https://example.com/video.mp4", None))
    ///     .await?;
    /// if let Ok(Ok(result)) = done.await {
    ///     println!("{} saved to {}", id, result.output_path.display());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(
        &self,
        task: TaskDescriptor,
    ) -> Result<(TaskId, tokio::sync::oneshot::Receiver<TaskOutcome>)> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let id = self
            .enqueue(task, move |outcome| {
                // The receiver may have been dropped, the outcome still goes out as an event
                tx.send(outcome).ok();
            })
            .await?;
        Ok((id, rx))
    }

    /// Queue an audio-extract task with no completion callback
    ///
    /// Follow the outcome through [`subscribe`](Self::subscribe).
    pub async fn submit_audio_task(
        &self,
        source_id: impl Into<String>,
        destination_name: Option<String>,
    ) -> Result<TaskId> {
        self.enqueue(TaskDescriptor::audio(source_id, destination_name), |_| {})
            .await
    }

    /// Queue a raw-stream task with no completion callback
    pub async fn submit_raw_task(
        &self,
        source_id: impl Into<String>,
        destination_name: Option<String>,
    ) -> Result<TaskId> {
        self.enqueue(TaskDescriptor::raw(source_id, destination_name), |_| {})
            .await
    }

    /// Current queue occupancy
    pub async fn stats(&self) -> QueueStats {
        let inner = self.queue_state.inner.lock().await;
        QueueStats {
            active: inner.active.len(),
            pending: inner.pending.len(),
            capacity: self.queue_state.capacity,
        }
    }

    /// Number of tasks not yet terminal (`active + pending`)
    pub async fn queue_size(&self) -> usize {
        self.queue_state.inner.lock().await.total()
    }

    /// Wait until no task is pending or running
    ///
    /// Returns immediately when the queue is already empty.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.queue_state.total_tx.subscribe();
        // The sender lives as long as the downloader, so this cannot fail while we hold it
        rx.wait_for(|total| *total == 0).await.ok();
    }

    /// Deliver the outcome of an active task and free its place in the queue
    ///
    /// Order: remove from the active map, run the callback, broadcast `QueueSize`,
    /// then broadcast `Finished` or `Error`.
    pub(crate) async fn settle_task(&self, id: TaskId, outcome: TaskOutcome) {
        {
            let mut inner = self.queue_state.inner.lock().await;
            let Some(active) = inner.active.remove(&id) else {
                tracing::warn!(task_id = id.0, "Settled task was not active");
                return;
            };
            invoke_callback(active.on_complete, id, outcome.clone());
            self.queue_state.publish_total(&inner, &self.events);
        }

        self.emit_terminal(outcome);
    }

    /// Broadcast the terminal event for an outcome
    pub(crate) fn emit_terminal(&self, outcome: TaskOutcome) {
        match outcome {
            Ok(result) => self.emit_event(Event::Finished { result }),
            Err(error) => self.emit_event(Event::Error { error }),
        }
    }
}

/// Error record for a task cancelled before it produced anything
pub(crate) fn cancelled_record(id: TaskId, source_id: &str, message: &str) -> ErrorRecord {
    ErrorRecord {
        id,
        source_id: source_id.to_string(),
        kind: ErrorKind::Cancelled,
        message: message.to_string(),
        partial: None,
    }
}
