//! Audio transcoding
//!
//! Audio-extract tasks pipe the source byte stream through a [`Transcoder`] that
//! writes an MP3 file with title and artist tags. Implementations:
//!
//! - [`FfmpegTranscoder`]: runs an external `ffmpeg` binary, reading from stdin
//! - [`NoOpTranscoder`]: stand-in when no encoder is available, every call fails
//!   with `Error::NotSupported`
//!
//! ## Usage
//!
//! ```no_run
//! use media_dl::transcode::{FfmpegTranscoder, TrackMetadata, Transcoder};
//! use media_dl::source::ByteStream;
//! use std::path::Path;
//!
//! # async fn run(input: ByteStream) -> Result<(), Box<dyn std::error::Error>> {
//! let transcoder = FfmpegTranscoder::from_path().expect("ffmpeg not found");
//! let metadata = TrackMetadata::new("Song", "Band");
//! transcoder.transcode(input, Path::new("out.mp3"), &metadata).await?;
//! # Ok(())
//! # }
//! ```

mod cli;
mod noop;
mod traits;

pub use cli::FfmpegTranscoder;
pub use noop::NoOpTranscoder;
pub use traits::{TrackMetadata, TranscodeCapabilities, Transcoder};
