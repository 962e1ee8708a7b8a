//! HTTP(S) source backed by reqwest

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use std::time::Duration;

use super::{MediaStream, ResolvedResource, Resolver, Streamer};
use crate::config::{HttpConfig, VideoQuality};
use crate::error::{Error, Result};
use crate::utils::{extract_filename_from_headers, split_extension};

/// Resolver and streamer for direct HTTP(S) URLs
///
/// Resolution issues a `HEAD` request (falling back to `GET` when the server does
/// not allow `HEAD`) and takes the title from the Content-Disposition file name or
/// the last URL path segment. The length comes from `Content-Length`. There is only
/// one rendition per URL, so the quality hint is ignored.
///
/// Requests must produce their headers within the request timeout. A stream body
/// may take as long as it needs, but fails once no chunk arrives for the read
/// timeout.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    request_timeout: Duration,
    read_timeout: Duration,
}

impl HttpSource {
    /// Create a source with a client built from `config`
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            request_timeout: config.timeout,
            read_timeout: config.read_timeout,
        })
    }

    /// Create a source around an existing client, with the default timeouts
    pub fn with_client(client: reqwest::Client) -> Self {
        let defaults = HttpConfig::default();
        Self {
            client,
            request_timeout: defaults.timeout,
            read_timeout: defaults.read_timeout,
        }
    }
}

#[async_trait]
impl Resolver for HttpSource {
    async fn resolve(&self, source_id: &str) -> Result<ResolvedResource> {
        let url = url::Url::parse(source_id)
            .map_err(|e| Error::Resolve(format!("invalid URL '{}': {}", source_id, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Resolve(format!(
                "unsupported URL scheme '{}' in '{}'",
                url.scheme(),
                source_id
            )));
        }

        let mut response = self
            .client
            .head(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| Error::Resolve(describe_request_error(&e, source_id)))?;

        if matches!(
            response.status(),
            reqwest::StatusCode::METHOD_NOT_ALLOWED | reqwest::StatusCode::NOT_IMPLEMENTED
        ) {
            tracing::debug!(url = %source_id, "HEAD not allowed, probing with GET");
            response = self
                .client
                .get(url.clone())
                .timeout(self.request_timeout)
                .send()
                .await
                .map_err(|e| Error::Resolve(describe_request_error(&e, source_id)))?;
        }

        if !response.status().is_success() {
            return Err(Error::Resolve(format!(
                "HTTP {} resolving {}",
                response.status(),
                source_id
            )));
        }

        let headers = response.headers();
        let filename = extract_filename_from_headers(headers, source_id);
        let (display_title, extension) = split_extension(&filename);
        let extension = extension.or_else(|| extension_from_content_type(headers));

        Ok(ResolvedResource {
            source_id: source_id.to_string(),
            display_title,
            total_bytes: header_content_length(headers),
            thumbnail_url: None,
            extension,
            location: response.url().to_string(),
        })
    }
}

#[async_trait]
impl Streamer for HttpSource {
    async fn open_stream(
        &self,
        resource: &ResolvedResource,
        quality: &VideoQuality,
    ) -> Result<MediaStream> {
        tracing::debug!(
            url = %resource.location,
            quality = %quality,
            "Opening HTTP stream (single rendition, quality hint ignored)"
        );

        // A per-request timeout would also cover the body, so only the headers are bounded here
        let response = tokio::time::timeout(
            self.request_timeout,
            self.client.get(&resource.location).send(),
        )
        .await
        .map_err(|_| Error::Stream(format!("timeout requesting '{}'", resource.location)))?
        .map_err(|e| Error::Stream(describe_request_error(&e, &resource.location)))?;

        if !response.status().is_success() {
            return Err(Error::Stream(format!(
                "HTTP {} fetching {}",
                response.status(),
                resource.location
            )));
        }

        let total_bytes = header_content_length(response.headers()).or(resource.total_bytes);
        let read_timeout = self.read_timeout;
        let stream = tokio_stream::StreamExt::timeout(response.bytes_stream(), read_timeout)
            .map(move |chunk| match chunk {
                Ok(Ok(bytes)) => Ok(bytes),
                Ok(Err(e)) => Err(std::io::Error::other(e)),
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no data received for {:?}", read_timeout),
                )),
            })
            .boxed();

        Ok(MediaStream {
            total_bytes,
            stream,
        })
    }
}

fn describe_request_error(e: &reqwest::Error, url: &str) -> String {
    if e.is_timeout() {
        format!("timeout requesting '{}'", url)
    } else if e.is_connect() {
        format!("connection failed for '{}': {}", url, e)
    } else {
        format!("request to '{}' failed: {}", url, e)
    }
}

fn header_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&len| len > 0)
}

fn extension_from_content_type(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.as_str() {
        "video/mp4" => "mp4",
        "video/webm" | "audio/webm" => "webm",
        "video/x-matroska" => "mkv",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/ogg" => "ogg",
        _ => return None,
    };
    Some(ext.to_string())
}
