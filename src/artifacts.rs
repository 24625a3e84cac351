//! On-disk artifact layout for frame recovery
//!
//! Every expensive step writes a file, and a step is skipped when its file is
//! already there. These paths and predicates are the only resume mechanism:
//!
//! ```text
//! <image_dir>/missing.txt                   work list, one frame id per line
//! <image_dir>/ts/<NN>/<id>.ts               segment at the expected time
//! <image_dir>/ts/<NN>/<id>.ts.png           its first frame
//! <image_dir>/ts/<NN>/<id>.ts_crop.png      clock overlay crop for OCR
//! <image_dir>/ts/<NN>/<id>_cor<secs>.ts     drift-corrected segment
//! <image_dir>/<NN>/<id:05>.v.png            recovered frame
//! ```
//!
//! `<NN>` groups ids in blocks of 1000. A zero-size segment marks a fragment
//! with no media.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

pub const MISSING_LIST: &str = "missing.txt";

/// State of a downloaded segment file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Missing,
    Empty,
    Ready,
}

/// A file exists and has content
pub fn is_ready(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

pub fn segment_state(path: &Path) -> SegmentState {
    match std::fs::metadata(path) {
        Ok(m) if m.len() > 0 => SegmentState::Ready,
        Ok(_) => SegmentState::Empty,
        Err(_) => SegmentState::Missing,
    }
}

/// Block directory name for a frame id
pub fn block_dir(frame_id: i64) -> String {
    format!("{:02}", frame_id / 1000)
}

/// Paths for one frame's artifacts
#[derive(Debug, Clone)]
pub struct FrameArtifacts {
    pub frame_id: i64,
    segment_dir: PathBuf,
    output_dir: PathBuf,
}

impl FrameArtifacts {
    pub fn new(image_dir: &Path, frame_id: i64) -> Self {
        let block = block_dir(frame_id);
        Self {
            frame_id,
            segment_dir: image_dir.join("ts").join(&block),
            output_dir: image_dir.join(block),
        }
    }

    pub fn segment(&self) -> PathBuf {
        self.segment_dir.join(format!("{}.ts", self.frame_id))
    }

    pub fn decoded_frame(&self) -> PathBuf {
        crate::frames::frame_path(&self.segment())
    }

    pub fn clock_crop(&self) -> PathBuf {
        self.segment_dir.join(format!("{}.ts_crop.png", self.frame_id))
    }

    /// Segment fetched at a drift-corrected time; the name carries the whole
    /// seconds of drift so different corrections never share a file
    pub fn corrected_segment(&self, drift_secs: i64) -> PathBuf {
        self.segment_dir
            .join(format!("{}_cor{}.ts", self.frame_id, drift_secs))
    }

    pub fn output(&self) -> PathBuf {
        self.output_dir.join(format!("{:05}.v.png", self.frame_id))
    }

    pub fn is_recovered(&self) -> bool {
        is_ready(&self.output())
    }

    /// Create the directories the artifacts live in
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.segment_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }
}

/// Parse a missing-frame list; blank lines are ignored, ids come back ascending
pub fn parse_missing_list(content: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id = line.parse::<i64>().map_err(|_| {
            Error::Config(format!(
                "{} line {}: '{}' is not a frame id",
                MISSING_LIST,
                index + 1,
                line
            ))
        })?;
        ids.push(id);
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Load `<image_dir>/missing.txt`
pub async fn load_missing_list(image_dir: &Path) -> Result<Vec<i64>> {
    let path = image_dir.join(MISSING_LIST);
    let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
        Error::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    parse_missing_list(&content)
}
