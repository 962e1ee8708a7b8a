//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ErrorKind;

/// Unique identifier for a queued task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// What to do with the fetched bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    /// Transcode to a single-track MP3 tagged with title/artist
    AudioExtract,
    /// Save the stream as-is
    RawStream,
}

impl TaskMode {
    /// Default file extension for outputs produced in this mode, when the
    /// resolved resource does not suggest one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            TaskMode::AudioExtract => "mp3",
            TaskMode::RawStream => "mp4",
        }
    }
}

/// One unit of work, immutable once enqueued
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Opaque identifier or URL of the remote resource
    pub source_id: String,
    /// Explicit output file name; derived from the resolved title when `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
    /// Transcode-to-audio or save-as-is
    pub mode: TaskMode,
}

impl TaskDescriptor {
    /// Describe an audio extraction task
    pub fn audio(source_id: impl Into<String>, destination_name: Option<String>) -> Self {
        Self {
            source_id: source_id.into(),
            destination_name,
            mode: TaskMode::AudioExtract,
        }
    }

    /// Describe a raw stream save task
    pub fn raw(source_id: impl Into<String>, destination_name: Option<String>) -> Self {
        Self {
            source_id: source_id.into(),
            destination_name,
            mode: TaskMode::RawStream,
        }
    }

    /// Explicit destination name, treating an empty string as absent
    pub fn explicit_destination(&self) -> Option<&str> {
        self.destination_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// Point-in-time progress measurement for one task's byte transfer
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Bytes transferred so far
    pub transferred_bytes: u64,
    /// Total bytes expected (0 when unknown)
    pub total_bytes: u64,
    /// Bytes still expected (0 when total unknown)
    pub remaining_bytes: u64,
    /// Completion percentage in [0, 100]; exactly 100 only once the transfer is complete
    pub percentage: f64,
    /// Milliseconds since the transfer started
    pub elapsed_ms: u64,
    /// Estimated milliseconds remaining (0 when total unknown or speed is zero)
    pub eta_ms: u64,
    /// Throughput over the window since the previous snapshot
    pub instant_speed_bps: f64,
}

impl ProgressSnapshot {
    /// Whether this snapshot marks the completed transfer
    pub fn is_complete(&self) -> bool {
        self.percentage >= 100.0
    }
}

/// Transfer statistics for a finished task, taken from its final snapshot
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Total bytes transferred
    pub transferred_bytes: u64,
    /// Transfer runtime in milliseconds
    pub runtime_ms: u64,
    /// Average speed over the whole transfer, rounded to two decimals
    pub average_speed_bps: f64,
}

impl TaskStats {
    /// Build stats from the final (100%) snapshot of a transfer
    pub fn from_final_snapshot(snapshot: &ProgressSnapshot) -> Self {
        let average = if snapshot.elapsed_ms > 0 {
            snapshot.transferred_bytes as f64 / (snapshot.elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };
        Self {
            transferred_bytes: snapshot.transferred_bytes,
            runtime_ms: snapshot.elapsed_ms,
            average_speed_bps: (average * 100.0).round() / 100.0,
        }
    }
}

/// Terminal record for a successful task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task ID
    pub id: TaskId,
    /// Source identifier the task was created with
    pub source_id: String,
    /// Execution mode
    pub mode: TaskMode,
    /// Path of the written file
    pub output_path: PathBuf,
    /// Cleaned display title of the resource
    pub resolved_title: String,
    /// Artist derived from the title (best effort)
    pub artist: String,
    /// Track title derived from the title (best effort)
    pub title: String,
    /// Thumbnail URL, when the resolver provided one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Transfer statistics from the final progress snapshot
    pub stats: TaskStats,
    /// When the task finished
    pub completed_at: DateTime<Utc>,
}

/// Whatever was known about a task before it failed
///
/// Diagnostic only; never a substitute for a [`TaskResult`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    /// Cleaned display title, if resolution succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_title: Option<String>,
    /// Derived artist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Derived track title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Thumbnail URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Destination path that was being written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

/// Terminal record for a failed task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Task ID
    pub id: TaskId,
    /// Source identifier the task was created with
    pub source_id: String,
    /// Failure classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Metadata resolved before the failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialResult>,
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "task {} ({}) failed [{}]: {}",
            self.id, self.source_id, self.kind, self.message
        )
    }
}

/// Terminal outcome of a task: exactly one of result or error
pub type TaskOutcome = std::result::Result<TaskResult, ErrorRecord>;

/// Stage of the per-task state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStage {
    /// Looking up resource metadata
    Resolving,
    /// Opening the byte stream
    Streaming,
    /// Piping the stream through the transcoder
    Encoding,
    /// Writing the stream straight to disk
    Saving,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl TaskStage {
    /// Failure kind attributed to errors raised while in this stage
    pub fn failure_kind(&self) -> ErrorKind {
        match self {
            TaskStage::Resolving => ErrorKind::ResolveFailed,
            TaskStage::Streaming => ErrorKind::StreamFailed,
            TaskStage::Encoding => ErrorKind::TranscodeFailed,
            TaskStage::Saving | TaskStage::Done | TaskStage::Failed => ErrorKind::WriteFailed,
        }
    }
}

/// Queue occupancy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks currently running
    pub active: usize,
    /// Tasks waiting for a free slot
    pub pending: usize,
    /// Maximum number of tasks that may run at once
    pub capacity: usize,
}

impl QueueStats {
    /// Tasks not yet terminal (`active + pending`)
    pub fn total(&self) -> usize {
        self.active + self.pending
    }
}

/// Events broadcast by the downloader
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted into the queue
    Queued {
        /// Task ID
        id: TaskId,
        /// Source identifier
        source_id: String,
        /// Execution mode
        mode: TaskMode,
    },

    /// Number of tasks not yet terminal changed
    QueueSize {
        /// New `active + pending` total
        total: usize,
    },

    /// Task took a free slot and started running
    Started {
        /// Task ID
        id: TaskId,
        /// Source identifier
        source_id: String,
    },

    /// Progress snapshot for a running task
    Progress {
        /// Task ID
        id: TaskId,
        /// Source identifier
        source_id: String,
        /// The snapshot
        snapshot: ProgressSnapshot,
    },

    /// Task finished successfully
    Finished {
        /// Terminal result
        result: TaskResult,
    },

    /// Task failed (including cancellation)
    Error {
        /// Terminal error record
        error: ErrorRecord,
    },

    /// Downloader shutting down
    Shutdown,
}

impl Event {
    /// Task this event belongs to, if any
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Event::Queued { id, .. } | Event::Started { id, .. } | Event::Progress { id, .. } => {
                Some(*id)
            }
            Event::Finished { result } => Some(result.id),
            Event::Error { error } => Some(error.id),
            Event::QueueSize { .. } | Event::Shutdown => None,
        }
    }

    /// Whether this is a task's terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Finished { .. } | Event::Error { .. })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_parses_and_displays() {
        let id: TaskId = "42".parse().unwrap();
        assert_eq!(id, TaskId(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(u64::from(id), 42);
    }

    #[test]
    fn empty_destination_name_counts_as_absent() {
        let task = TaskDescriptor::audio("abc", Some("   ".to_string()));
        assert_eq!(task.explicit_destination(), None);

        let task = TaskDescriptor::raw("abc", Some("clip.webm".to_string()));
        assert_eq!(task.explicit_destination(), Some("clip.webm"));
    }

    #[test]
    fn stats_come_from_final_snapshot() {
        let snapshot = ProgressSnapshot {
            transferred_bytes: 1000,
            total_bytes: 1000,
            remaining_bytes: 0,
            percentage: 100.0,
            elapsed_ms: 3000,
            eta_ms: 0,
            instant_speed_bps: 12.0,
        };
        let stats = TaskStats::from_final_snapshot(&snapshot);
        assert_eq!(stats.transferred_bytes, 1000);
        assert_eq!(stats.runtime_ms, 3000);
        assert_eq!(stats.average_speed_bps, 333.33);
    }

    #[test]
    fn stats_with_zero_runtime_report_zero_speed() {
        let snapshot = ProgressSnapshot {
            transferred_bytes: 100,
            total_bytes: 100,
            percentage: 100.0,
            ..Default::default()
        };
        assert_eq!(TaskStats::from_final_snapshot(&snapshot).average_speed_bps, 0.0);
    }

    #[test]
    fn stage_failure_kinds() {
        assert_eq!(TaskStage::Resolving.failure_kind(), ErrorKind::ResolveFailed);
        assert_eq!(TaskStage::Streaming.failure_kind(), ErrorKind::StreamFailed);
        assert_eq!(TaskStage::Encoding.failure_kind(), ErrorKind::TranscodeFailed);
        assert_eq!(TaskStage::Saving.failure_kind(), ErrorKind::WriteFailed);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(Event::QueueSize { total: 3 }).unwrap();
        assert_eq!(json["type"], "queue_size");
        assert_eq!(json["total"], 3);

        let json = serde_json::to_value(Event::Shutdown).unwrap();
        assert_eq!(json["type"], "shutdown");
    }

    #[test]
    fn terminal_events_carry_their_task_id() {
        let error = ErrorRecord {
            id: TaskId(7),
            source_id: "src".to_string(),
            kind: ErrorKind::ResolveFailed,
            message: "boom".to_string(),
            partial: None,
        };
        let event = Event::Error { error };
        assert!(event.is_terminal());
        assert_eq!(event.task_id(), Some(TaskId(7)));
        assert!(!Event::QueueSize { total: 0 }.is_terminal());
    }
}
