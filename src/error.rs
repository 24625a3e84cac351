//! Custom error types for vodframes

use thiserror::Error;

/// Main error type for vodframes operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Frame {0} has no logged capture time")]
    FrameNotLogged(i64),

    #[error("No broadcast recorded at or before {0}")]
    NoBroadcastFound(String),

    #[error("Malformed playlist at line {line}: {reason}")]
    MalformedPlaylist { line: usize, reason: String },

    #[error("No segment of broadcast {broadcast_id} covers {target}")]
    SegmentNotFound { broadcast_id: i64, target: String },

    #[error("Playable URL resolution failed: {0}")]
    Resolution(String),

    #[error("Playlist fetch failed: {0}")]
    Fetch(String),

    #[error("Segment download failed with HTTP {status}: {url}")]
    Download { url: String, status: u16 },

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("OCR engine failed: {0}")]
    Ocr(String),

    #[error("External tool '{program}' could not be started: {reason}")]
    ToolUnavailable { program: String, reason: String },
}

impl Error {
    /// Whether the failure only concerns the frame being processed.
    ///
    /// Frame-local errors are logged against the frame id and the run moves on;
    /// anything else (broken preconditions, network trouble, missing tools)
    /// halts the run. Re-running is always safe because finished artifacts are
    /// kept on disk.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Error::FrameNotLogged(_)
                | Error::SegmentNotFound { .. }
                | Error::Resolution(_)
                | Error::Decode(_)
                | Error::Ocr(_)
                | Error::Image(_)
        )
    }
}

/// Result type alias for vodframes
pub type Result<T> = std::result::Result<T, Error>;
