//! Utility functions for file names, titles, and destination paths

use std::path::{Path, PathBuf};

use crate::types::{TaskId, TaskMode};

/// Characters removed from every file name
///
/// Apostrophe, pipe, slash, question mark, colon and semicolon are the set the
/// title cleaner has always stripped; the rest are rejected by common filesystems.
const FORBIDDEN_FILENAME_CHARS: &[char] = &[
    '\'', '|', '/', '?', ':', ';', '\\', '<', '>', '*', '"',
];

/// Longest file name (in bytes) most filesystems accept
const MAX_FILENAME_BYTES: usize = 255;

/// Artist used when a title has no `-` separator
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Remove characters that are unsafe in file names
///
/// Strips `' | / ? : ;`, backslash, `< > * "` and control characters, trims
/// surrounding whitespace and trailing dots, and caps the result at 255 bytes
/// (on a char boundary). Applying it twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use media_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Back In Black?"), "ACDC Back In Black");
/// assert_eq!(sanitize_filename("it's | fine;"), "its  fine");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();

    let mut cleaned = trim_filename(&cleaned).to_string();

    if cleaned.len() > MAX_FILENAME_BYTES {
        let mut cut = MAX_FILENAME_BYTES;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
        cleaned = trim_filename(&cleaned).to_string();
    }

    cleaned
}

/// Strip leading whitespace and any trailing run of dots and whitespace
fn trim_filename(name: &str) -> &str {
    name.trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

/// Split a display title into `(artist, title)`
///
/// Best-effort convention for "Artist - Title" style names, not a metadata parser:
/// the text before the first `-` is the artist, the text between the first and
/// second `-` is the title. Without a `-`, the artist is `"Unknown"` and the
/// whole string is the title.
///
/// # Examples
///
/// ```
/// use media_dl::utils::split_artist_title;
///
/// assert_eq!(split_artist_title("Artist - Title"), ("Artist".into(), "Title".into()));
/// assert_eq!(split_artist_title("JustATitle"), ("Unknown".into(), "JustATitle".into()));
/// assert_eq!(split_artist_title("A - B - C"), ("A".into(), "B".into()));
/// ```
pub fn split_artist_title(display_title: &str) -> (String, String) {
    let mut parts = display_title.split('-');
    match (parts.next(), parts.next()) {
        (Some(artist), Some(title)) => (artist.trim().to_string(), title.trim().to_string()),
        _ => (UNKNOWN_ARTIST.to_string(), display_title.to_string()),
    }
}

/// Compute where a task writes its output
///
/// An explicit destination name wins (sanitized, so it cannot escape `output_dir`).
/// Otherwise the name is the sanitized resolved title plus an extension: `mp3` for
/// audio extraction, the resolved extension (or `mp4`) for raw saves. An empty
/// title falls back to `download-<id>`.
pub fn destination_path(
    output_dir: &Path,
    explicit_name: Option<&str>,
    resolved_title: &str,
    resolved_extension: Option<&str>,
    mode: TaskMode,
    id: TaskId,
) -> PathBuf {
    if let Some(name) = explicit_name {
        let name = sanitize_filename(name);
        if !name.is_empty() {
            return output_dir.join(name);
        }
    }

    let stem = match sanitize_filename(resolved_title) {
        stem if stem.is_empty() => format!("download-{}", id),
        stem => stem,
    };

    let extension = match mode {
        TaskMode::AudioExtract => mode.default_extension().to_string(),
        TaskMode::RawStream => resolved_extension
            .map(sanitize_filename)
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| mode.default_extension().to_string()),
    };

    output_dir.join(format!("{}.{}", stem, extension))
}

/// Extract a file name from HTTP response headers
///
/// Tries the Content-Disposition header (`filename=` then RFC 5987 `filename*=`),
/// falls back to the last URL path segment, and finally to `"download"`.
/// The extension is kept; use [`split_extension`] to separate it.
pub fn extract_filename_from_headers(headers: &reqwest::header::HeaderMap, url: &str) -> String {
    if let Some(content_disposition) = headers.get(reqwest::header::CONTENT_DISPOSITION)
        && let Ok(value) = content_disposition.to_str()
    {
        // Format: attachment; filename="file.mp4" or filename*=UTF-8''file.mp4
        for part in value.split(';') {
            let part = part.trim();
            if let Some(filename) = part.strip_prefix("filename=") {
                let filename = filename.trim_matches('"');
                if !filename.is_empty() {
                    return filename.to_string();
                }
            } else if let Some(filename) = part.strip_prefix("filename*=") {
                // charset'lang'encoded-filename
                if let Some(idx) = filename.rfind('\'')
                    && let Ok(decoded) = urlencoding::decode(&filename[idx + 1..])
                    && !decoded.is_empty()
                {
                    return decoded.into_owned();
                }
            }
        }
    }

    if let Ok(parsed_url) = url::Url::parse(url)
        && let Some(mut segments) = parsed_url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
    {
        return urlencoding::decode(last_segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| last_segment.to_string());
    }

    "download".to_string()
}

/// Split `name.ext` into `("name", Some("ext"))`
pub fn split_extension(filename: &str) -> (String, Option<String>) {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    (stem, extension)
}
