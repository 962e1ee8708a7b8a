//! Shared test helpers: in-process collaborators and a downloader wired to them.

use crate::config::Config;
use crate::downloader::{Collaborators, MediaDownloader};
use crate::error::{Error, Result};
use crate::source::{ByteStream, MediaStream, ResolvedResource, Resolver, Streamer};
use crate::storage::FileStorage;
use crate::transcode::{TrackMetadata, TranscodeCapabilities, Transcoder};
use crate::types::{Event, TaskId};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

/// Scripted behaviour for one source id
#[derive(Clone)]
pub(crate) struct MockMedia {
    pub(crate) title: String,
    pub(crate) thumbnail_url: Option<String>,
    pub(crate) extension: Option<String>,
    pub(crate) body: Vec<u8>,
    pub(crate) chunk_size: usize,
    pub(crate) chunk_delay: Duration,
    /// Declared length; defaults to the body length
    pub(crate) declared_total: Option<u64>,
    pub(crate) fail_open: bool,
    /// Yield an I/O error after this many chunks
    pub(crate) fail_after_chunks: Option<usize>,
    /// Resolution waits for a permit on this semaphore
    pub(crate) gate: Option<Arc<tokio::sync::Semaphore>>,
}

impl MockMedia {
    pub(crate) fn new(title: &str, len: usize) -> Self {
        Self {
            title: title.to_string(),
            thumbnail_url: None,
            extension: None,
            body: (0..len).map(|i| (i % 251) as u8).collect(),
            chunk_size: 10,
            chunk_delay: Duration::from_millis(1),
            declared_total: None,
            fail_open: false,
            fail_after_chunks: None,
            gate: None,
        }
    }

    pub(crate) fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub(crate) fn extension(mut self, ext: &str) -> Self {
        self.extension = Some(ext.to_string());
        self
    }

    pub(crate) fn thumbnail(mut self, url: &str) -> Self {
        self.thumbnail_url = Some(url.to_string());
        self
    }

    pub(crate) fn declared_total(mut self, total: u64) -> Self {
        self.declared_total = Some(total);
        self
    }

    pub(crate) fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) fn fail_after_chunks(mut self, chunks: usize) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }

    pub(crate) fn gated(mut self, gate: Arc<tokio::sync::Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Tracks how many streams are open at once
#[derive(Clone, Default)]
pub(crate) struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    fn enter(&self) -> ProbeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        ProbeGuard(self.current.clone())
    }

    pub(crate) fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

struct ProbeGuard(Arc<AtomicUsize>);

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resolver + streamer serving scripted media from memory
///
/// Unknown source ids fail resolution.
#[derive(Clone, Default)]
pub(crate) struct MockSource {
    media: Arc<Mutex<HashMap<String, MockMedia>>>,
    pub(crate) probe: ConcurrencyProbe,
}

impl MockSource {
    pub(crate) fn add(&self, source_id: &str, media: MockMedia) {
        self.media
            .lock()
            .unwrap()
            .insert(source_id.to_string(), media);
    }

    fn get(&self, source_id: &str) -> Option<MockMedia> {
        self.media.lock().unwrap().get(source_id).cloned()
    }
}

#[async_trait]
impl Resolver for MockSource {
    async fn resolve(&self, source_id: &str) -> Result<ResolvedResource> {
        let media = self
            .get(source_id)
            .ok_or_else(|| Error::Resolve(format!("unknown source '{}'", source_id)))?;

        if let Some(gate) = &media.gate {
            gate.acquire().await.map(|p| p.forget()).ok();
        }

        Ok(ResolvedResource {
            source_id: source_id.to_string(),
            display_title: media.title.clone(),
            total_bytes: Some(media.body.len() as u64),
            thumbnail_url: media.thumbnail_url.clone(),
            extension: media.extension.clone(),
            location: format!("mock://{}", source_id),
        })
    }
}

#[async_trait]
impl Streamer for MockSource {
    async fn open_stream(
        &self,
        resource: &ResolvedResource,
        _quality: &crate::config::VideoQuality,
    ) -> Result<MediaStream> {
        let media = self
            .get(&resource.source_id)
            .ok_or_else(|| Error::Stream(format!("unknown source '{}'", resource.source_id)))?;
        if media.fail_open {
            return Err(Error::Stream("connection refused".into()));
        }

        let total_bytes = Some(
            media
                .declared_total
                .unwrap_or(media.body.len() as u64),
        );
        let chunks: Vec<Bytes> = media
            .body
            .chunks(media.chunk_size.max(1))
            .map(Bytes::copy_from_slice)
            .collect();
        let guard = self.probe.enter();
        let delay = media.chunk_delay;
        let fail_after = media.fail_after_chunks;

        let stream = futures::stream::unfold(
            (chunks.into_iter(), 0usize, guard),
            move |(mut chunks, sent, guard)| async move {
                if fail_after == Some(sent) {
                    let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
                    return Some((Err(err), (Vec::new().into_iter(), sent + 1, guard)));
                }
                let chunk = chunks.next()?;
                tokio::time::sleep(delay).await;
                Some((Ok(chunk), (chunks, sent + 1, guard)))
            },
        )
        .boxed();

        Ok(MediaStream {
            total_bytes,
            stream,
        })
    }
}

/// Transcoder that copies its input to the output file and records each call
#[derive(Clone, Default)]
pub(crate) struct MockTranscoder {
    pub(crate) calls: Arc<Mutex<Vec<(PathBuf, TrackMetadata)>>>,
    /// Fail with a transcode error after consuming the input
    pub(crate) fail: bool,
    /// Return without reading the input
    pub(crate) skip_input: bool,
}

impl MockTranscoder {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<(PathBuf, TrackMetadata)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode(
        &self,
        mut input: ByteStream,
        output: &Path,
        metadata: &TrackMetadata,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((output.to_path_buf(), metadata.clone()));

        if self.skip_input {
            return Ok(());
        }

        let mut file = tokio::fs::File::create(output).await?;
        while let Some(chunk) = input.next().await {
            let chunk = chunk.map_err(|e| Error::Stream(e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if self.fail {
            return Err(Error::Transcode("encoder exited with status 1".into()));
        }
        Ok(())
    }

    fn capabilities(&self) -> TranscodeCapabilities {
        TranscodeCapabilities {
            can_encode_audio: true,
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// A downloader wired to in-process collaborators
pub(crate) struct TestHarness {
    pub(crate) downloader: MediaDownloader,
    pub(crate) source: MockSource,
    pub(crate) transcoder: MockTranscoder,
    pub(crate) output_dir: PathBuf,
    /// Kept alive for the lifetime of the harness
    pub(crate) _temp_dir: tempfile::TempDir,
}

/// Test configuration writing into `dir` with a 10ms sampling interval
pub(crate) fn test_config(dir: &Path, capacity: usize) -> Config {
    let mut config = Config::default();
    config.download.output_dir = dir.join("out");
    config.download.queue_parallelism = capacity;
    config.download.progress_interval = Duration::from_millis(10);
    config.tools.search_path = false;
    config
}

/// Create a downloader with `capacity` slots and a mock transcoder
pub(crate) async fn create_test_downloader(capacity: usize) -> TestHarness {
    create_test_downloader_with(capacity, MockTranscoder::default()).await
}

/// Create a downloader with `capacity` slots and the given mock transcoder
pub(crate) async fn create_test_downloader_with(
    capacity: usize,
    transcoder: MockTranscoder,
) -> TestHarness {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path(), capacity);
    let output_dir = config.download.output_dir.clone();
    let source = MockSource::default();

    let collaborators = Collaborators::with_source(
        source.clone(),
        Arc::new(transcoder.clone()),
        Arc::new(FileStorage),
    );
    let downloader = MediaDownloader::with_collaborators(config, collaborators)
        .await
        .unwrap();

    TestHarness {
        downloader,
        source,
        transcoder,
        output_dir,
        _temp_dir: temp_dir,
    }
}

/// Receive the next event, failing the test after 5 seconds
pub(crate) async fn next_event(rx: &mut broadcast::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Collect events until `count` terminal events have been seen
pub(crate) async fn collect_until_terminal(
    rx: &mut broadcast::Receiver<Event>,
    count: usize,
) -> Vec<Event> {
    let mut events = Vec::new();
    let mut terminal = 0;
    while terminal < count {
        let event = next_event(rx).await;
        if event.is_terminal() {
            terminal += 1;
        }
        events.push(event);
    }
    events
}

/// `QueueSize` totals in emission order
pub(crate) fn queue_sizes(events: &[Event]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::QueueSize { total } => Some(*total),
            _ => None,
        })
        .collect()
}

/// Events belonging to one task, in emission order
pub(crate) fn events_for(events: &[Event], id: TaskId) -> Vec<Event> {
    events
        .iter()
        .filter(|e| e.task_id() == Some(id))
        .cloned()
        .collect()
}
