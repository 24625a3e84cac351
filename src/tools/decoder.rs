use super::{run_tool, stderr_summary, FrameDecoder};
use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extracts the first frame of a segment with ffmpeg
pub struct FfmpegDecoder {
    program: String,
}

impl FfmpegDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            program: config.program.clone(),
        }
    }
}

/// Name ffmpeg writes to before the frame is moved into place
fn partial_frame_path(output: &Path) -> PathBuf {
    output.with_extension("part.png")
}

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    async fn decode_first_frame(&self, segment: &Path, output: &Path) -> Result<()> {
        let size = tokio::fs::metadata(segment).await?.len();
        if size == 0 {
            return Err(Error::Decode(format!("{} is empty", segment.display())));
        }

        debug!("Decoding first frame of {:?} ({} bytes)", segment, size);

        let partial = partial_frame_path(output);
        let args: [&OsStr; 9] = [
            OsStr::new("-hide_banner"),
            OsStr::new("-v"),
            OsStr::new("warning"),
            OsStr::new("-y"),
            OsStr::new("-i"),
            segment.as_os_str(),
            OsStr::new("-frames:v"),
            OsStr::new("1"),
            partial.as_os_str(),
        ];
        let result = run_tool(&self.program, args).await?;

        if !result.status.success() {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(Error::Decode(format!(
                "{}: {}",
                segment.display(),
                stderr_summary(&result)
            )));
        }

        // ffmpeg exits cleanly on streams without a video frame
        if !crate::artifacts::is_ready(&partial) {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(Error::Decode(format!(
                "{}: no frame produced",
                segment.display()
            )));
        }

        tokio::fs::rename(&partial, output).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_segment_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let segment = tmp.path().join("101.ts");
        std::fs::write(&segment, b"").unwrap();

        // Never reaches the binary, so the program name does not matter
        let decoder = FfmpegDecoder::new(&DecoderConfig {
            program: "vodframes-no-such-ffmpeg".to_string(),
        });
        let err = decoder
            .decode_first_frame(&segment, &tmp.path().join("101.ts.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_exit_without_output_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let segment = tmp.path().join("101.ts");
        std::fs::write(&segment, b"not really mpeg-ts").unwrap();

        let decoder = FfmpegDecoder::new(&DecoderConfig {
            program: "true".to_string(),
        });
        let err = decoder
            .decode_first_frame(&segment, &tmp.path().join("101.ts.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg.contains("no frame")));
    }

    #[test]
    fn test_partial_frame_path() {
        assert_eq!(
            partial_frame_path(Path::new("/img/ts/00/101.ts.png")),
            PathBuf::from("/img/ts/00/101.ts.part.png")
        );
    }

    /// Install a shell script standing in for ffmpeg; `body` sees the
    /// output path as `$last`
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> String {
        let source = dir.join("ffmpeg.src");
        let program = dir.join("ffmpeg");
        std::fs::write(&source, format!("#!/bin/sh\nfor last; do :; done\n{}\n", body)).unwrap();
        // No write handle to the script may be open here when it runs
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg("cp \"$0\" \"$1\" && chmod +x \"$1\"")
            .arg(&source)
            .arg(&program)
            .status()
            .unwrap();
        assert!(status.success());
        program.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_frame_is_renamed_into_place() {
        let tmp = TempDir::new().unwrap();
        let segment = tmp.path().join("101.ts");
        std::fs::write(&segment, b"mpeg-ts").unwrap();
        let output = tmp.path().join("101.ts.png");

        let program = fake_ffmpeg(
            tmp.path(),
            "printf '%s' \"$last\" > \"$(dirname \"$last\")/written_to\"; printf frame > \"$last\"",
        );
        let decoder = FfmpegDecoder::new(&DecoderConfig { program });
        decoder.decode_first_frame(&segment, &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"frame");
        assert!(!partial_frame_path(&output).exists());
        let written_to = std::fs::read_to_string(tmp.path().join("written_to")).unwrap();
        assert!(written_to.ends_with("101.ts.part.png"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupted_decode_leaves_no_frame() {
        let tmp = TempDir::new().unwrap();
        let segment = tmp.path().join("101.ts");
        std::fs::write(&segment, b"mpeg-ts").unwrap();
        let output = tmp.path().join("101.ts.png");

        let program = fake_ffmpeg(tmp.path(), "printf trunc > \"$last\"; exit 1");
        let decoder = FfmpegDecoder::new(&DecoderConfig { program });
        let err = decoder
            .decode_first_frame(&segment, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
        assert!(!output.exists());
        assert!(!partial_frame_path(&output).exists());
    }
}
