//! Status command implementation

use crate::artifacts::{load_missing_list, FrameArtifacts};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Progress of an image directory's work list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub image_dir: String,
    pub missing_frames: usize,
    pub recovered: usize,
    pub pending: usize,
    pub artifacts: ArtifactCounts,
}

/// Intermediate files under `<image_dir>/ts`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCounts {
    pub segments: usize,
    pub corrected_segments: usize,
    /// Zero-size segments marking absent fragments
    pub empty_markers: usize,
    pub decoded_frames: usize,
    pub clock_crops: usize,
    /// Downloads interrupted before completion
    pub partial_downloads: usize,
}

impl ArtifactCounts {
    fn count(&mut self, name: &str, len: u64) {
        if name.ends_with(".part") {
            self.partial_downloads += 1;
        } else if name.ends_with("_crop.png") {
            self.clock_crops += 1;
        } else if name.ends_with(".ts.png") {
            self.decoded_frames += 1;
        } else if name.ends_with(".ts") {
            if len == 0 {
                self.empty_markers += 1;
            } else if name.contains("_cor") {
                self.corrected_segments += 1;
            } else {
                self.segments += 1;
            }
        }
    }
}

async fn count_artifacts(image_dir: &Path) -> Result<ArtifactCounts> {
    let mut counts = ArtifactCounts::default();
    let ts_dir = image_dir.join("ts");
    if !ts_dir.is_dir() {
        return Ok(counts);
    }

    let mut blocks = tokio::fs::read_dir(&ts_dir).await?;
    while let Some(block) = blocks.next_entry().await? {
        if !block.file_type().await?.is_dir() {
            continue;
        }
        let mut entries = tokio::fs::read_dir(block.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                counts.count(&entry.file_name().to_string_lossy(), metadata.len());
            }
        }
    }

    Ok(counts)
}

/// Summarize recovery progress for an image directory
pub async fn cmd_status(image_dir: &Path) -> Result<StatusInfo> {
    info!("Getting status of {:?}", image_dir);

    let frame_ids = load_missing_list(image_dir).await?;
    let recovered = frame_ids
        .iter()
        .filter(|id| FrameArtifacts::new(image_dir, **id).is_recovered())
        .count();

    Ok(StatusInfo {
        image_dir: image_dir.display().to_string(),
        missing_frames: frame_ids.len(),
        recovered,
        pending: frame_ids.len() - recovered,
        artifacts: count_artifacts(image_dir).await?,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 vodframes Status\n");
    println!("Image directory: {}", status.image_dir);
    println!("\nWork list:");
    println!("  Missing frames: {}", status.missing_frames);
    println!("  Recovered: {}", status.recovered);
    println!("  Pending: {}", status.pending);

    let a = &status.artifacts;
    println!("\nArtifacts:");
    println!("  Segments: {}", a.segments);
    println!("  Corrected segments: {}", a.corrected_segments);
    println!("  Absent fragments: {}", a.empty_markers);
    println!("  Decoded frames: {}", a.decoded_frames);
    println!("  Clock crops: {}", a.clock_crops);
    if a.partial_downloads > 0 {
        println!("  ⚠ Interrupted downloads: {}", a.partial_downloads);
    }
}
