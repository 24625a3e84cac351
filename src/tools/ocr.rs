use super::{run_tool, stderr_summary, DigitRecognizer};
use crate::config::OcrConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;

/// Runs tesseract with a digits-only profile and returns its stdout
pub struct TesseractRecognizer {
    program: String,
    data_dir: String,
    language: String,
    digits_config: String,
}

impl TesseractRecognizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            program: config.program.clone(),
            data_dir: config.data_dir.clone(),
            language: config.language.clone(),
            digits_config: config.digits_config.clone(),
        }
    }
}

#[async_trait]
impl DigitRecognizer for TesseractRecognizer {
    async fn recognize_digits(&self, image: &Path) -> Result<String> {
        let args: [&OsStr; 7] = [
            OsStr::new("--tessdata-dir"),
            OsStr::new(&self.data_dir),
            OsStr::new("-l"),
            OsStr::new(&self.language),
            image.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new(&self.digits_config),
        ];
        let output = run_tool(&self.program, args).await?;

        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "{} on {}: {}",
                self.program,
                image.display(),
                stderr_summary(&output)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
