//! No-op transcoder for graceful degradation

use super::traits::{TrackMetadata, TranscodeCapabilities, Transcoder};
use crate::source::ByteStream;
use async_trait::async_trait;
use std::path::Path;

/// Transcoder used when no ffmpeg binary is available or configured
///
/// Audio-extract tasks fail with `Error::NotSupported`, which is reported as
/// a transcode failure. Raw-stream tasks are unaffected.
///
/// # Examples
///
/// ```
/// use media_dl::transcode::{NoOpTranscoder, TrackMetadata, Transcoder};
/// use futures::StreamExt;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let input = futures::stream::empty().boxed();
/// let result = NoOpTranscoder
///     .transcode(input, Path::new("out.mp3"), &TrackMetadata::new("t", "a"))
///     .await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct NoOpTranscoder;

#[async_trait]
impl Transcoder for NoOpTranscoder {
    async fn transcode(
        &self,
        _input: ByteStream,
        _output: &Path,
        _metadata: &TrackMetadata,
    ) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "Audio extraction requires an external ffmpeg binary. \
             Configure ffmpeg_path in config or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn capabilities(&self) -> TranscodeCapabilities {
        TranscodeCapabilities {
            can_encode_audio: false,
        }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
