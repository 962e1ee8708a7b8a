//! ffmpeg-based transcoder using an external binary

use super::traits::{TrackMetadata, TranscodeCapabilities, Transcoder};
use crate::error::Error;
use crate::source::ByteStream;
use async_trait::async_trait;
use futures::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

/// Transcoder that pipes the input stream into `ffmpeg` and encodes MP3
///
/// The input is written to ffmpeg's stdin while the process runs, so nothing is
/// buffered to disk before encoding. Video streams are dropped (`-vn`), audio is
/// encoded with libmp3lame and tagged with ID3v2.4 title and artist frames.
///
/// # Examples
///
/// ```no_run
/// use media_dl::transcode::FfmpegTranscoder;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let transcoder = FfmpegTranscoder::new(PathBuf::from("/usr/bin/ffmpeg"), Vec::new());
///
/// // Or auto-discover from PATH
/// let transcoder = FfmpegTranscoder::from_path().expect("ffmpeg not found in PATH");
/// ```
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
    extra_output_args: Vec<String>,
}

impl FfmpegTranscoder {
    /// Create a transcoder with an explicit binary path
    ///
    /// # Arguments
    ///
    /// * `binary_path` - Path to the ffmpeg binary
    /// * `extra_output_args` - Arguments appended after the built-in encoder arguments
    pub fn new(binary_path: PathBuf, extra_output_args: Vec<String>) -> Self {
        Self {
            binary_path,
            extra_output_args,
        }
    }

    /// Attempt to find ffmpeg in PATH
    ///
    /// Returns `None` when the binary is not found.
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg")
            .ok()
            .map(|path| Self::new(path, Vec::new()))
    }

    /// Append extra output arguments, e.g. `["-b:a", "192k"]`
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_output_args = args;
        self
    }

    /// Path of the ffmpeg binary this transcoder runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn build_args(&self, output: &Path, metadata: &TrackMetadata) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "pipe:0",
            "-vn",
            "-acodec",
            "libmp3lame",
            "-id3v2_version",
            "4",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push("-metadata".into());
        args.push(format!("title={}", metadata.title).into());
        args.push("-metadata".into());
        args.push(format!("artist={}", metadata.artist).into());
        args.extend(self.extra_output_args.iter().map(OsString::from));
        args.push("-f".into());
        args.push("mp3".into());
        args.push("-y".into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

/// How feeding ffmpeg's stdin ended
enum PumpOutcome {
    /// Whole input written and stdin closed
    Complete,
    /// ffmpeg closed its stdin before the input ended
    EncoderClosed,
}

async fn pump_input(mut input: ByteStream, mut stdin: ChildStdin) -> crate::Result<PumpOutcome> {
    while let Some(chunk) = input.next().await {
        let chunk = chunk.map_err(|e| Error::Stream(e.to_string()))?;
        if let Err(e) = stdin.write_all(&chunk).await {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(PumpOutcome::EncoderClosed);
            }
            return Err(Error::Transcode(format!(
                "Failed to write to ffmpeg stdin: {}",
                e
            )));
        }
    }

    // Closing stdin signals end of input
    stdin.shutdown().await.ok();
    Ok(PumpOutcome::Complete)
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: ByteStream,
        output: &Path,
        metadata: &TrackMetadata,
    ) -> crate::Result<()> {
        let mut child = Command::new(&self.binary_path)
            .args(self.build_args(output, metadata))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::ExternalTool("ffmpeg stdin was not captured".into()))?;

        let (pumped, waited) = tokio::join!(pump_input(input, stdin), child.wait_with_output());

        // An input failure is reported as such even if ffmpeg also failed on the truncated data
        let pumped = pumped?;
        let output_status = waited
            .map_err(|e| Error::ExternalTool(format!("Failed to wait for ffmpeg: {}", e)))?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(Error::Transcode(format!(
                "ffmpeg exited with {}: {}",
                output_status.status,
                stderr.trim()
            )));
        }

        if let PumpOutcome::EncoderClosed = pumped {
            return Err(Error::Transcode(
                "ffmpeg stopped reading input before the stream ended".into(),
            ));
        }

        tracing::debug!(output = %output.display(), "ffmpeg transcode finished");
        Ok(())
    }

    fn capabilities(&self) -> TranscodeCapabilities {
        TranscodeCapabilities {
            can_encode_audio: true,
        }
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
