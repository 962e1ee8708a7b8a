//! Queue processor - moves pending tasks into free slots and spawns their runners.

use tokio_util::sync::CancellationToken;

use crate::types::{Event, TaskDescriptor, TaskId};

use super::task::{TaskContext, run_task};
use super::{ActiveTask, MediaDownloader};

impl MediaDownloader {
    /// Start the queue processor task
    ///
    /// This method spawns a background task that continuously:
    /// 1. Acquires a permit from the concurrency limiter (respects `queue_parallelism`)
    /// 2. Waits for the oldest pending task and moves it into the active map
    /// 3. Spawns a runner for that task, which holds the permit until the outcome is delivered
    /// 4. Repeats until shutdown
    ///
    /// Dispatching does not change `active + pending`, so no `QueueSize` is emitted here.
    pub(crate) fn start_queue_processor(&self) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();
        let shutdown = self.queue_state.shutdown_token.clone();
        let concurrent_limit = self.queue_state.concurrent_limit.clone();

        tokio::spawn(async move {
            loop {
                // Acquire a permit from the semaphore (blocks if at capacity)
                let permit = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    permit = concurrent_limit.clone().acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => break, // Semaphore closed
                    },
                };

                let Some((id, descriptor, cancel_token)) =
                    downloader.next_pending(&shutdown).await
                else {
                    break;
                };

                tracing::info!(
                    task_id = id.0,
                    source_id = %descriptor.source_id,
                    "Task started"
                );
                downloader.emit_event(Event::Started {
                    id,
                    source_id: descriptor.source_id.clone(),
                });

                let ctx = TaskContext {
                    id,
                    descriptor,
                    config: downloader.config.clone(),
                    events: downloader.events.clone(),
                    collaborators: downloader.collaborators.clone(),
                    cancel_token,
                };

                let runner = downloader.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = run_task(ctx).await;
                    runner.settle_task(id, outcome).await;
                });
            }

            tracing::debug!("Queue processor stopped");
        })
    }

    /// Wait for the oldest pending task and register it as active
    ///
    /// Returns `None` when shutdown is signalled first.
    async fn next_pending(
        &self,
        shutdown: &CancellationToken,
    ) -> Option<(TaskId, TaskDescriptor, CancellationToken)> {
        loop {
            // Registered before checking the queue so a concurrent enqueue is not missed
            let notified = self.queue_state.work_available.notified();

            {
                let mut inner = self.queue_state.inner.lock().await;
                if let Some(task) = inner.pending.pop_front() {
                    let cancel_token = CancellationToken::new();
                    inner.active.insert(
                        task.id,
                        ActiveTask {
                            source_id: task.descriptor.source_id.clone(),
                            cancel_token: cancel_token.clone(),
                            on_complete: task.on_complete,
                        },
                    );
                    return Some((task.id, task.descriptor, cancel_token));
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = notified => {}
            }
        }
    }
}
