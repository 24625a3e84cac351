//! External tool adapters
//!
//! The recovery loop talks to three black-box programs through these traits:
//! - a playable-URL resolver (youtube-dl compatible)
//! - a frame decoder (ffmpeg compatible)
//! - a digit OCR engine (tesseract compatible)
//!
//! Each has one production adapter that shells out, and a fake used in tests.

mod decoder;
mod ocr;
mod resolver;

#[cfg(test)]
pub(crate) mod fakes;

pub use decoder::*;
pub use ocr::*;
pub use resolver::*;

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Resolves a broadcast to a playable (playlist) URL
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve_url(&self, broadcast_id: i64) -> Result<String>;
}

/// Decodes the first still frame of a media segment into an image file
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode_first_frame(&self, segment: &Path, output: &Path) -> Result<()>;
}

/// Recognizes digits and separators in an image
#[async_trait]
pub trait DigitRecognizer: Send + Sync {
    async fn recognize_digits(&self, image: &Path) -> Result<String>;
}

/// Run an external program to completion, capturing its output
///
/// A program that cannot be spawned is reported as `ToolUnavailable`; a
/// non-zero exit is left to the caller to classify.
pub(crate) async fn run_tool<I, S>(program: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {:?}", cmd.as_std());

    cmd.output().await.map_err(|e| Error::ToolUnavailable {
        program: program.to_string(),
        reason: e.to_string(),
    })
}

/// Last non-empty stderr line, for error messages
pub(crate) fn stderr_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| format!("{} ({})", output.status, line))
        .unwrap_or_else(|| output.status.to_string())
}
