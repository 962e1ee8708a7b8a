//! Output storage for raw-stream tasks

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{Error, Result};
use crate::source::ByteStream;

/// Destination for a task's raw bytes
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write the whole stream to `path`, returning the number of bytes written
    ///
    /// # Errors
    ///
    /// - `Error::Stream` if the input stream yields an error
    /// - `Error::Write` if the file cannot be created or written
    async fn write_stream(&self, input: ByteStream, path: &Path) -> Result<u64>;
}

/// Storage writing straight to the local filesystem
///
/// Parent directories are created on demand and an existing file at the target
/// path is replaced. Data is flushed and synced before returning.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStorage;

#[async_trait]
impl Storage for FileStorage {
    async fn write_stream(&self, mut input: ByteStream, path: &Path) -> Result<u64> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Write(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| Error::Write(format!("failed to create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        let mut written = 0u64;

        while let Some(chunk) = input.next().await {
            let chunk = chunk.map_err(|e| Error::Stream(e.to_string()))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| Error::Write(format!("failed to write {}: {}", path.display(), e)))?;
            written += chunk.len() as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| Error::Write(format!("failed to flush {}: {}", path.display(), e)))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| Error::Write(format!("failed to sync {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), bytes = written, "stream written to disk");
        Ok(written)
    }
}
