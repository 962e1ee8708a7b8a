//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`queue`] - Admission, completion delivery and queue statistics
//! - [`control`] - Task cancellation
//! - [`lifecycle`] - Shutdown coordination
//! - [`queue_processor`] - Dispatching pending tasks into free slots
//! - [`task`] - Execution of a single task (resolve, stream, encode or save)

mod control;
mod lifecycle;
mod queue;
mod queue_processor;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};

use crate::config::{Config, ToolsConfig};
use crate::error::{Error, Result};
use crate::events::EventHub;
use crate::source::{HttpSource, Resolver, Streamer};
use crate::storage::{FileStorage, Storage};
use crate::transcode::{FfmpegTranscoder, NoOpTranscoder, Transcoder};
use crate::types::{Event, TaskDescriptor, TaskId, TaskOutcome};

/// Callback receiving a task's terminal outcome
///
/// Runs while the queue lock is held, so it must return quickly and must not
/// wait on the downloader.
pub(crate) type CompletionCallback = Box<dyn FnOnce(TaskOutcome) + Send + 'static>;

/// Run a completion callback, containing any panic it raises
///
/// Called with the queue lock held; a panicking callback must not skip the
/// `QueueSize` broadcast and terminal event that follow it.
pub(crate) fn invoke_callback(callback: CompletionCallback, id: TaskId, outcome: TaskOutcome) {
    let result =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || callback(outcome)));
    if let Err(panic) = result {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(task_id = id.0, panic = %message, "Completion callback panicked");
    }
}

/// A task waiting for a free slot
pub(crate) struct QueuedTask {
    pub(crate) id: TaskId,
    pub(crate) descriptor: TaskDescriptor,
    pub(crate) on_complete: CompletionCallback,
}

/// A task holding a slot
pub(crate) struct ActiveTask {
    pub(crate) source_id: String,
    pub(crate) cancel_token: tokio_util::sync::CancellationToken,
    pub(crate) on_complete: CompletionCallback,
}

/// Pending list and active map, always mutated together under one lock
#[derive(Default)]
pub(crate) struct QueueInner {
    /// Tasks waiting for a slot, oldest first
    pub(crate) pending: VecDeque<QueuedTask>,
    /// Tasks currently running
    pub(crate) active: HashMap<TaskId, ActiveTask>,
}

impl QueueInner {
    /// Tasks not yet terminal
    pub(crate) fn total(&self) -> usize {
        self.pending.len() + self.active.len()
    }
}

/// Queue and task state management
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Pending and active tasks (protected by Mutex)
    pub(crate) inner: Arc<tokio::sync::Mutex<QueueInner>>,
    /// Semaphore limiting concurrently running tasks (one permit per active task)
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Configured parallelism
    pub(crate) capacity: usize,
    /// Wakes the queue processor when a task is enqueued
    pub(crate) work_available: Arc<tokio::sync::Notify>,
    /// Latest `active + pending` total, for idle waiting
    pub(crate) total_tx: Arc<tokio::sync::watch::Sender<usize>>,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Next task ID to hand out
    pub(crate) next_id: Arc<AtomicU64>,
    /// Stops the queue processor
    pub(crate) shutdown_token: tokio_util::sync::CancellationToken,
}

impl QueueState {
    pub(crate) fn new(capacity: usize) -> Self {
        let (total_tx, _rx) = tokio::sync::watch::channel(0usize);
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(QueueInner::default())),
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(capacity)),
            capacity,
            work_available: Arc::new(tokio::sync::Notify::new()),
            total_tx: Arc::new(total_tx),
            accepting_new: Arc::new(AtomicBool::new(true)),
            next_id: Arc::new(AtomicU64::new(1)),
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Broadcast the current total after a total-changing mutation
    ///
    /// Must be called while still holding the lock that guarded the mutation, so
    /// the emitted totals form the same sequence as the mutations.
    pub(crate) fn publish_total(&self, inner: &QueueInner, events: &EventHub) {
        let total = inner.total();
        self.total_tx.send_replace(total);
        events.emit(Event::QueueSize { total });
    }
}

/// External collaborators a task runs against
///
/// The queue only sees these traits; [`Collaborators::from_config`] wires the
/// shipped implementations (HTTP source, ffmpeg, local files).
#[derive(Clone)]
pub struct Collaborators {
    /// Looks up resource metadata
    pub resolver: Arc<dyn Resolver>,
    /// Opens the byte stream for a resolved resource
    pub streamer: Arc<dyn Streamer>,
    /// Encodes audio-extract tasks
    pub transcoder: Arc<dyn Transcoder>,
    /// Writes raw-stream tasks
    pub storage: Arc<dyn Storage>,
}

impl Collaborators {
    /// Build the default collaborators for `config`
    ///
    /// - [`HttpSource`] as resolver and streamer
    /// - ffmpeg from `ffmpeg_path`, else from PATH when `search_path` is set,
    ///   else [`NoOpTranscoder`]
    /// - [`FileStorage`]
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = Arc::new(HttpSource::new(&config.http)?);
        Ok(Self {
            resolver: source.clone(),
            streamer: source,
            transcoder: select_transcoder(&config.tools),
            storage: Arc::new(FileStorage),
        })
    }

    /// Use one value as both resolver and streamer, with the given transcoder and storage
    pub fn with_source<S>(
        source: S,
        transcoder: Arc<dyn Transcoder>,
        storage: Arc<dyn Storage>,
    ) -> Self
    where
        S: Resolver + Streamer + 'static,
    {
        let source = Arc::new(source);
        Self {
            resolver: source.clone(),
            streamer: source,
            transcoder,
            storage,
        }
    }

    /// Replace the transcoder
    pub fn transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Replace the storage
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }
}

fn select_transcoder(tools: &ToolsConfig) -> Arc<dyn Transcoder> {
    let transcoder: Arc<dyn Transcoder> = if let Some(ref ffmpeg_path) = tools.ffmpeg_path {
        // Use explicitly configured binary path
        Arc::new(FfmpegTranscoder::new(
            ffmpeg_path.clone(),
            tools.extra_output_args.clone(),
        ))
    } else if tools.search_path {
        // Search PATH for ffmpeg binary
        match FfmpegTranscoder::from_path() {
            Some(t) => Arc::new(t.with_extra_args(tools.extra_output_args.clone())),
            None => {
                tracing::warn!("ffmpeg not found in PATH, audio extraction is disabled");
                Arc::new(NoOpTranscoder)
            }
        }
    } else {
        // No binary configured and PATH search disabled
        Arc::new(NoOpTranscoder)
    };

    let caps = transcoder.capabilities();
    tracing::info!(
        transcoder = transcoder.name(),
        can_encode_audio = caps.can_encode_audio,
        "Transcoder initialized"
    );
    transcoder
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Event hub shared with every running task
    pub(crate) events: EventHub,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Resolver, streamer, transcoder and storage
    pub(crate) collaborators: Collaborators,
    /// Queue and task state management
    pub(crate) queue_state: QueueState,
}

impl MediaDownloader {
    /// Create a downloader with the default collaborators
    ///
    /// Validates the configuration, creates the output directory, and starts the
    /// queue processor. Must be called from within a tokio runtime.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, MediaDownloader, TaskDescriptor};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default()).await?;
    ///     let (_id, done) = downloader
    ///         .submit(TaskDescriptor::audio("https://example.com/clip.webm", None))
    ///         .await?;
    ///     match done.await? {
    ///         Ok(result) => println!("saved {}", result.output_path.display()),
    ///         Err(error) => eprintln!("failed: {}", error),
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let collaborators = Collaborators::from_config(&config)?;
        Self::with_collaborators(config, collaborators).await
    }

    /// Create a downloader running tasks against custom collaborators
    pub async fn with_collaborators(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        // Ensure output directory exists
        tokio::fs::create_dir_all(config.output_dir())
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.output_dir().display(),
                        e
                    ),
                ))
            })?;

        let events = EventHub::new(config.download.event_buffer);
        let queue_state = QueueState::new(config.download.queue_parallelism);

        let downloader = Self {
            events,
            config: Arc::new(config),
            collaborators,
            queue_state,
        };

        downloader.start_queue_processor();

        tracing::info!(
            capacity = downloader.queue_state.capacity,
            output_dir = %downloader.config.output_dir().display(),
            "Media downloader started"
        );

        Ok(downloader)
    }

    /// Subscribe to downloader events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events emitted
    /// after it subscribed. A subscriber that falls behind by more than `event_buffer`
    /// events receives a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, Event, MediaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             if let Event::Progress { id, snapshot, .. } = event {
    ///                 println!("{}: {:.1}%", id, snapshot.percentage);
    ///             }
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Subscribe as a `Stream` of events, skipping lag notifications
    pub fn events(&self) -> impl tokio_stream::Stream<Item = Event> + Send + Unpin + 'static {
        self.events.stream()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    pub(crate) fn emit_event(&self, event: Event) {
        self.events.emit(event);
    }
}
