//! Test configuration helpers for creating downloaders in temporary directories

use std::time::Duration;
use tempfile::TempDir;
use media_dl::{Config, MediaDownloader};

/// Build a configuration writing into `temp_dir` with `parallelism` slots
///
/// PATH lookup for ffmpeg is disabled so results do not depend on the host;
/// set `tools.ffmpeg_path` explicitly in tests that need a real encoder.
pub fn create_test_config(temp_dir: &TempDir, parallelism: usize) -> Config {
    let mut config = Config::default();
    config.download.output_dir = temp_dir.path().join("downloads");
    config.download.queue_parallelism = parallelism;
    config.download.progress_interval = Duration::from_millis(20);
    config.tools.search_path = false;
    config.http.timeout = Duration::from_secs(10);
    config
}

/// Create a downloader with the default collaborators and a fresh temp dir
///
/// The returned `TempDir` must be kept alive for the duration of the test.
pub async fn create_test_downloader(parallelism: usize) -> (MediaDownloader, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&temp_dir, parallelism);
    let downloader = MediaDownloader::new(config)
        .await
        .expect("Failed to create downloader");
    (downloader, temp_dir)
}

/// Locate an ffmpeg binary for encoder tests
pub fn ffmpeg_binary() -> Option<std::path::PathBuf> {
    which::which("ffmpeg").ok()
}
