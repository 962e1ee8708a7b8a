//! Task context - shared state for one task and the progress sink it streams through.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::events::EventHub;
use crate::progress::ProgressSink;
use crate::types::{Event, PartialResult, ProgressSnapshot, TaskDescriptor, TaskId, TaskStage};

use super::super::Collaborators;

/// Shared context for a single task, reducing parameter passing between helpers.
pub(crate) struct TaskContext {
    pub(crate) id: TaskId,
    pub(crate) descriptor: TaskDescriptor,
    pub(crate) config: Arc<Config>,
    pub(crate) events: EventHub,
    pub(crate) collaborators: Collaborators,
    pub(crate) cancel_token: CancellationToken,
}

/// Mutable progress of a run, readable after the run future has been dropped.
#[derive(Debug)]
pub(super) struct RunState {
    pub(super) stage: TaskStage,
    /// What was resolved so far; `None` until resolution succeeds
    pub(super) partial: Option<PartialResult>,
}

impl RunState {
    pub(super) fn new() -> Self {
        Self {
            stage: TaskStage::Resolving,
            partial: None,
        }
    }

    /// Record a stage transition
    pub(super) fn enter(&mut self, ctx: &TaskContext, stage: TaskStage) {
        tracing::debug!(
            task_id = ctx.id.0,
            source_id = %ctx.descriptor.source_id,
            from = ?self.stage,
            stage = ?stage,
            "Task stage transition"
        );
        self.stage = stage;
    }

    /// Whether an output file may exist on disk
    pub(super) fn output_started(&self) -> bool {
        matches!(self.stage, TaskStage::Encoding | TaskStage::Saving)
    }
}

/// Forwards a task's snapshots to the event hub and keeps the final one
pub(super) struct EventSink {
    id: TaskId,
    source_id: String,
    events: EventHub,
    final_tx: watch::Sender<Option<ProgressSnapshot>>,
}

impl EventSink {
    /// Create a sink and the receiver that will hold the final 100% snapshot
    pub(super) fn new(ctx: &TaskContext) -> (Self, watch::Receiver<Option<ProgressSnapshot>>) {
        let (final_tx, final_rx) = watch::channel(None);
        let sink = Self {
            id: ctx.id,
            source_id: ctx.descriptor.source_id.clone(),
            events: ctx.events.clone(),
            final_tx,
        };
        (sink, final_rx)
    }

    fn emit(&self, snapshot: ProgressSnapshot) {
        self.events.emit(Event::Progress {
            id: self.id,
            source_id: self.source_id.clone(),
            snapshot,
        });
    }
}

impl ProgressSink for EventSink {
    fn progress(&mut self, snapshot: ProgressSnapshot) {
        tracing::debug!(
            task_id = self.id.0,
            transferred = snapshot.transferred_bytes,
            total = snapshot.total_bytes,
            percentage = snapshot.percentage,
            "Progress"
        );
        self.emit(snapshot);
    }

    fn complete(&mut self, snapshot: ProgressSnapshot) {
        tracing::debug!(
            task_id = self.id.0,
            transferred = snapshot.transferred_bytes,
            elapsed_ms = snapshot.elapsed_ms,
            "Stream complete"
        );
        self.emit(snapshot.clone());
        self.final_tx.send_replace(Some(snapshot));
    }
}
