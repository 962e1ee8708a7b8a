//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Queue and output configuration
///
/// Groups settings related to where files land and how many tasks run at once.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory for finished files (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum number of tasks running at once (default: 1)
    ///
    /// This only bounds concurrency. The pending queue itself is unbounded.
    #[serde(default = "default_queue_parallelism")]
    pub queue_parallelism: usize,

    /// Interval between progress snapshots for a running task (default: 1000ms)
    #[serde(
        default = "default_progress_interval",
        rename = "progress_interval_ms",
        with = "duration_ms_serde"
    )]
    pub progress_interval: Duration,

    /// Quality hint handed to the streamer when it has several renditions to choose from
    #[serde(default)]
    pub video_quality: VideoQuality,

    /// Capacity of the event broadcast buffer (default: 1000)
    ///
    /// Subscribers that fall further behind than this receive `RecvError::Lagged`.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            queue_parallelism: default_queue_parallelism(),
            progress_interval: default_progress_interval(),
            video_quality: VideoQuality::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// External tool configuration (ffmpeg)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for ffmpeg if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Extra output arguments appended after the built-in encoder arguments
    ///
    /// Example: `["-b:a", "192k"]`
    #[serde(default)]
    pub extra_output_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
            extra_output_args: Vec::new(),
        }
    }
}

/// HTTP client settings used by the built-in [`HttpSource`](crate::source::HttpSource)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Time allowed for a request to produce its response headers (default: 300s)
    ///
    /// Applies to resolution requests and to opening a stream. It does not bound
    /// the body transfer; see [`read_timeout`](Self::read_timeout).
    #[serde(
        default = "default_request_timeout",
        rename = "timeout_secs",
        with = "duration_serde"
    )]
    pub timeout: Duration,

    /// Connect timeout (default: 30s)
    #[serde(
        default = "default_connect_timeout",
        rename = "connect_timeout_secs",
        with = "duration_serde"
    )]
    pub connect_timeout: Duration,

    /// Longest gap allowed between two body chunks of a stream (default: 60s)
    #[serde(
        default = "default_read_timeout",
        rename = "read_timeout_secs",
        with = "duration_serde"
    )]
    pub read_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Main configuration for MediaDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) - output directory, parallelism, progress sampling
/// - [`tools`](ToolsConfig) - ffmpeg discovery and extra arguments
/// - [`http`](HttpConfig) - timeouts and user agent for the HTTP source
///
/// All sub-config fields are flattened for serialization, so the JSON form is a
/// single flat object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Queue and output settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool settings
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// HTTP client settings
    #[serde(flatten)]
    pub http: HttpConfig,
}

impl Config {
    /// Output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Check the configuration for values the queue cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key when:
    /// - `queue_parallelism` is zero
    /// - `progress_interval_ms` is zero
    /// - `event_buffer` is zero
    /// - `read_timeout_secs` is zero
    pub fn validate(&self) -> Result<()> {
        if self.download.queue_parallelism == 0 {
            return Err(Error::Config {
                message: "queue_parallelism must be at least 1".to_string(),
                key: Some("queue_parallelism".to_string()),
            });
        }
        if self.download.progress_interval.is_zero() {
            return Err(Error::Config {
                message: "progress_interval_ms must be greater than 0".to_string(),
                key: Some("progress_interval_ms".to_string()),
            });
        }
        if self.download.event_buffer == 0 {
            return Err(Error::Config {
                message: "event_buffer must be at least 1".to_string(),
                key: Some("event_buffer".to_string()),
            });
        }
        if self.http.read_timeout.is_zero() {
            return Err(Error::Config {
                message: "read_timeout_secs must be greater than 0".to_string(),
                key: Some("read_timeout_secs".to_string()),
            });
        }
        Ok(())
    }
}

/// Named quality presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// Smallest available rendition
    Lowest,
    /// Best available rendition
    Highest,
}

/// Quality hint for sources that offer several renditions
///
/// Accepts `"lowest"`, `"highest"`, a numeric format code, or any other string
/// the streamer understands. Sources with a single rendition ignore it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoQuality {
    /// `"lowest"` or `"highest"`
    Preset(QualityPreset),
    /// Numeric format code
    Format(u32),
    /// Free-form label interpreted by the streamer
    Label(String),
}

impl Default for VideoQuality {
    fn default() -> Self {
        VideoQuality::Preset(QualityPreset::Highest)
    }
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoQuality::Preset(QualityPreset::Lowest) => f.write_str("lowest"),
            VideoQuality::Preset(QualityPreset::Highest) => f.write_str("highest"),
            VideoQuality::Format(code) => write!(f, "{}", code),
            VideoQuality::Label(label) => f.write_str(label),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_queue_parallelism() -> usize {
    1
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_event_buffer() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    format!("media-dl/{}", env!("CARGO_PKG_VERSION"))
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
