//! In-process stand-ins for the external tools, counting every call

use super::{DigitRecognizer, FrameDecoder, UrlResolver};
use crate::error::{Error, Result};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeResolver {
    url: String,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlResolver for FakeResolver {
    async fn resolve_url(&self, _broadcast_id: i64) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.url.clone())
    }
}

/// Writes a 1920x1080 frame filled with a colour derived from the segment bytes
#[derive(Default)]
pub struct FakeDecoder {
    calls: AtomicUsize,
}

impl FakeDecoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn colour_for(bytes: &[u8]) -> Rgb<u8> {
        let sum = bytes.iter().fold(0u32, |acc, b| acc.wrapping_add(*b as u32));
        Rgb([(sum % 251) as u8, (sum % 241) as u8, bytes.len() as u8])
    }
}

#[async_trait]
impl FrameDecoder for FakeDecoder {
    async fn decode_first_frame(&self, segment: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = std::fs::read(segment)?;
        if bytes.is_empty() {
            return Err(Error::Decode(format!("{} is empty", segment.display())));
        }
        let frame = RgbImage::from_pixel(1920, 1080, Self::colour_for(&bytes));
        frame.save(output)?;
        Ok(())
    }
}

pub enum FakeReading {
    Text(&'static str),
    EngineFailure,
}

/// Answers per image file name; unknown images read as blank text
#[derive(Default)]
pub struct FakeRecognizer {
    readings: Mutex<HashMap<String, FakeReading>>,
    calls: AtomicUsize,
}

impl FakeRecognizer {
    pub fn with(self, file_name: &str, reading: FakeReading) -> Self {
        self.readings
            .lock()
            .unwrap()
            .insert(file_name.to_string(), reading);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DigitRecognizer for FakeRecognizer {
    async fn recognize_digits(&self, image: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match self.readings.lock().unwrap().get(&name) {
            Some(FakeReading::Text(text)) => Ok(text.to_string()),
            Some(FakeReading::EngineFailure) => Err(Error::Ocr(format!("engine crashed on {}", name))),
            None => Ok(String::new()),
        }
    }
}
