//! Resource resolution and byte streaming
//!
//! The queue treats "find out what a source identifier points to" and "give me its
//! bytes" as black-box capabilities behind two traits:
//! - [`Resolver`] turns a source identifier into [`ResolvedResource`] metadata
//! - [`Streamer`] opens a [`MediaStream`] for a resolved resource
//!
//! [`HttpSource`] implements both for plain HTTP(S) URLs.

mod http;

pub use http::HttpSource;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::config::VideoQuality;

/// Byte stream consumed by transcoders and storage
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Metadata describing a remote resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResource {
    /// Source identifier the resource was resolved from
    pub source_id: String,
    /// Human-readable title, before any cleaning
    pub display_title: String,
    /// Total length in bytes, if the resolver knows it
    pub total_bytes: Option<u64>,
    /// Thumbnail URL, if any
    pub thumbnail_url: Option<String>,
    /// Suggested file extension for the raw bytes (without the dot)
    pub extension: Option<String>,
    /// Location the streamer should fetch the bytes from
    pub location: String,
}

/// An opened byte stream
pub struct MediaStream {
    /// Total length in bytes, if known up front
    pub total_bytes: Option<u64>,
    /// The bytes
    pub stream: ByteStream,
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// Looks up metadata for a source identifier
///
/// # Errors
///
/// Implementations return [`Error::Resolve`](crate::Error::Resolve) (or a network/IO
/// error) when the resource does not exist or cannot be reached.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `source_id` into resource metadata
    async fn resolve(&self, source_id: &str) -> crate::Result<ResolvedResource>;
}

/// Opens byte streams for resolved resources
#[async_trait]
pub trait Streamer: Send + Sync {
    /// Open the byte stream for `resource`, preferring the rendition named by `quality`
    ///
    /// The returned stream's items report transport failures as `Err`; the
    /// stream ends normally only when all bytes were delivered.
    async fn open_stream(
        &self,
        resource: &ResolvedResource,
        quality: &VideoQuality,
    ) -> crate::Result<MediaStream>;
}
