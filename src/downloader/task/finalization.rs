//! Task finalization - turn the run result into the terminal outcome.

use crate::error::{Error, ErrorKind};
use crate::types::{ErrorRecord, PartialResult, TaskOutcome, TaskResult, TaskStage};

use super::context::{RunState, TaskContext};

/// Build the terminal outcome for a finished run.
///
/// On failure the error kind is derived from the stage the run was in, a partial
/// result is attached when resolution had succeeded, and a partially written
/// output file is removed.
pub(super) async fn finalize_task(
    ctx: &TaskContext,
    mut run: RunState,
    result: crate::Result<TaskResult>,
) -> TaskOutcome {
    let id = ctx.id;

    match result {
        Ok(result) => {
            tracing::info!(
                task_id = id.0,
                source_id = %result.source_id,
                output = %result.output_path.display(),
                bytes = result.stats.transferred_bytes,
                runtime_ms = result.stats.runtime_ms,
                "Task finished"
            );
            Ok(result)
        }
        Err(e) => {
            let kind = e.classify(run.stage.failure_kind());

            if run.output_started() {
                remove_partial_output(ctx, run.partial.as_ref()).await;
            }

            if kind == ErrorKind::Cancelled {
                tracing::info!(
                    task_id = id.0,
                    source_id = %ctx.descriptor.source_id,
                    stage = ?run.stage,
                    "Task cancelled"
                );
            } else {
                tracing::error!(
                    task_id = id.0,
                    source_id = %ctx.descriptor.source_id,
                    stage = ?run.stage,
                    kind = %kind,
                    error = %e,
                    "Task failed"
                );
            }

            run.enter(ctx, TaskStage::Failed);
            Err(ErrorRecord {
                id,
                source_id: ctx.descriptor.source_id.clone(),
                kind,
                message: failure_message(&e),
                partial: run.partial,
            })
        }
    }
}

fn failure_message(e: &Error) -> String {
    match e {
        Error::Cancelled => "cancelled".to_string(),
        other => other.to_string(),
    }
}

/// Best-effort removal of a partially written output file
async fn remove_partial_output(ctx: &TaskContext, partial: Option<&PartialResult>) {
    let Some(path) = partial.and_then(|p| p.output_path.as_ref()) else {
        return;
    };

    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(task_id = ctx.id.0, path = %path.display(), "Removed partial output");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                task_id = ctx.id.0,
                path = %path.display(),
                error = %e,
                "Failed to remove partial output"
            );
        }
    }
}
