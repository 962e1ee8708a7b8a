//! # media-dl
//!
//! Bounded-concurrency media download and transcode queue.
//!
//! Tasks name a remote resource and a mode: extract the audio track to a tagged MP3,
//! or save the raw byte stream. The queue runs at most `queue_parallelism` tasks at
//! once, reports progress while bytes flow, and delivers each task's outcome exactly
//! once, both to a per-task callback and to the event channel.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Sensible defaults** - `Config::default()` works out of the box
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Pluggable** - Resolution, streaming, encoding and storage sit behind traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, Event, MediaDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.queue_parallelism = 2;
//!
//!     let downloader = MediaDownloader::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             match event {
//!                 Event::Finished { result } => println!("done: {}", result.output_path.display()),
//!                 Event::Error { error } => eprintln!("failed: {}", error),
//!                 _ => {}
//!             }
//!         }
//!     });
//!
//!     downloader
//!         .submit_audio_task("https://example.com/media/Artist%20-%20Song.webm", None)
//!         .await?;
//!     downloader.wait_until_idle().await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Event broadcasting
pub mod events;
/// Progress tracking
pub mod progress;
/// Resource resolution and byte streams
pub mod source;
/// Output storage
pub mod storage;
/// Audio transcoding
pub mod transcode;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, QualityPreset, VideoQuality};
pub use downloader::{Collaborators, MediaDownloader};
pub use error::{Error, ErrorKind, Result};
pub use events::EventHub;
pub use progress::{ProgressSink, ProgressTracker, track_stream};
pub use source::{ByteStream, HttpSource, MediaStream, ResolvedResource, Resolver, Streamer};
pub use storage::{FileStorage, Storage};
pub use transcode::{
    FfmpegTranscoder, NoOpTranscoder, TrackMetadata, TranscodeCapabilities, Transcoder,
};
pub use types::{
    ErrorRecord, Event, PartialResult, ProgressSnapshot, QueueStats, TaskDescriptor, TaskId,
    TaskMode, TaskOutcome, TaskResult, TaskStage, TaskStats,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which cancels queued and running tasks.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::default()).await?;
///     downloader
///         .submit_raw_task("https://example.com/video.mp4", None)
///         .await?;
///
///     // Run until SIGTERM/SIGINT
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments; a failed source never fires
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    let interrupt = async {
        match signal(SignalKind::interrupt()) {
            Ok(mut sigint) => {
                sigint.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not register SIGINT handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = terminate => tracing::info!("Received SIGTERM signal"),
        _ = interrupt => tracing::info!("Received SIGINT signal (Ctrl+C)"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
