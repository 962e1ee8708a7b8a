//! Task orchestration - stage sequencing for a single task.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::progress::{ProgressTracker, track_stream};
use crate::transcode::TrackMetadata;
use crate::types::{PartialResult, TaskMode, TaskResult, TaskStage, TaskStats};
use crate::utils::{destination_path, sanitize_filename, split_artist_title};

use super::context::{EventSink, RunState, TaskContext};
use super::finalization::finalize_task;

/// Core task runner -- drives one task to its terminal outcome.
///
/// Stages:
/// 1. Resolving: look up title, length, thumbnail and extension
/// 2. Streaming: open the byte stream and wrap it in a progress tracker
/// 3. Encoding (audio extract) or Saving (raw stream)
/// 4. Done, or Failed with the error kind of the stage that failed
///
/// Cancellation is honoured at every await point.
pub(crate) async fn run_task(ctx: TaskContext) -> crate::types::TaskOutcome {
    let mut run = RunState::new();

    let result = {
        let work = execute(&ctx, &mut run);
        tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => Err(Error::Cancelled),
            result = work => result,
        }
    };

    finalize_task(&ctx, run, result).await
}

async fn execute(ctx: &TaskContext, run: &mut RunState) -> Result<TaskResult> {
    let source_id = ctx.descriptor.source_id.as_str();

    // Stage 1: resolve
    let resolved = ctx.collaborators.resolver.resolve(source_id).await?;

    let resolved_title = sanitize_filename(&resolved.display_title);
    let (artist, title) = split_artist_title(&resolved_title);
    let output_path = destination_path(
        ctx.config.output_dir(),
        ctx.descriptor.explicit_destination(),
        &resolved_title,
        resolved.extension.as_deref(),
        ctx.descriptor.mode,
        ctx.id,
    );
    run.partial = Some(PartialResult {
        resolved_title: Some(resolved_title.clone()),
        artist: Some(artist.clone()),
        title: Some(title.clone()),
        thumbnail_url: resolved.thumbnail_url.clone(),
        output_path: Some(output_path.clone()),
    });

    // Stage 2: open the stream
    run.enter(ctx, TaskStage::Streaming);
    let media = ctx
        .collaborators
        .streamer
        .open_stream(&resolved, &ctx.config.download.video_quality)
        .await?;

    let total_bytes = media.total_bytes.or(resolved.total_bytes);
    let tracker = ProgressTracker::new(total_bytes, ctx.config.download.progress_interval);
    let (sink, final_snapshot) = EventSink::new(ctx);
    let input = track_stream(media.stream, tracker, sink);

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Write(format!(
                "failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Stage 3: encode or save
    match ctx.descriptor.mode {
        TaskMode::AudioExtract => {
            run.enter(ctx, TaskStage::Encoding);
            let metadata = TrackMetadata::new(title.clone(), artist.clone());
            ctx.collaborators
                .transcoder
                .transcode(input, &output_path, &metadata)
                .await?;
        }
        TaskMode::RawStream => {
            run.enter(ctx, TaskStage::Saving);
            ctx.collaborators
                .storage
                .write_stream(input, &output_path)
                .await?;
        }
    }

    // Only the final 100% snapshot feeds the stats
    let snapshot = final_snapshot.borrow().clone().ok_or_else(|| {
        Error::Other("output finished before the input stream was fully consumed".into())
    })?;

    run.enter(ctx, TaskStage::Done);
    Ok(TaskResult {
        id: ctx.id,
        source_id: source_id.to_string(),
        mode: ctx.descriptor.mode,
        output_path,
        resolved_title,
        artist,
        title,
        thumbnail_url: resolved.thumbnail_url,
        stats: TaskStats::from_final_snapshot(&snapshot),
        completed_at: Utc::now(),
    })
}
