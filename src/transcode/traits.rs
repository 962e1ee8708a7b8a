//! Traits and types for audio transcoding

use async_trait::async_trait;
use std::path::Path;

use crate::source::ByteStream;

/// Tags written into the encoded file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track title
    pub title: String,
    /// Performing artist
    pub artist: String,
}

impl TrackMetadata {
    /// Build metadata from a title and artist
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

/// Capabilities of a transcoder implementation
#[derive(Debug, Clone, Copy)]
pub struct TranscodeCapabilities {
    /// Can encode audio to MP3
    pub can_encode_audio: bool,
}

/// Trait for turning a media byte stream into a tagged MP3 file
///
/// The transcoder consumes `input` to the end. A failing input stream must
/// surface as [`Error::Stream`](crate::Error::Stream) so the task reports a
/// stream failure rather than an encoder failure.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode `input` into an MP3 at `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input stream yields an error (`Error::Stream`)
    /// - The encoder cannot be started or exits unsuccessfully (`Error::Transcode`)
    /// - No encoder is available (`Error::NotSupported`)
    async fn transcode(
        &self,
        input: ByteStream,
        output: &Path,
        metadata: &TrackMetadata,
    ) -> crate::Result<()>;

    /// Query capabilities of this transcoder
    fn capabilities(&self) -> TranscodeCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
