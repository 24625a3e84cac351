//! Clip command implementation

use super::locate::Location;
use super::open_segment_resolver;
use crate::config::Config;
use crate::error::Result;
use crate::segment::DownloadOutcome;
use crate::timestamp::parse_timestamp;
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ClipResult {
    #[serde(flatten)]
    pub location: Location,
    pub output: String,
    pub download: DownloadOutcome,
}

/// Download the single segment covering `time` to `output`
pub async fn cmd_clip(
    config: &Config,
    broadcast_db: &Path,
    time: &str,
    output: &Path,
) -> Result<ClipResult> {
    let target = parse_timestamp(time)?;
    let segments = open_segment_resolver(config, broadcast_db).await?;

    let task = segments.resolve(target).await?;
    let location = Location::from_task(&task, &config.resolver.web_url_template);
    info!("Broadcast {} at {}", location.broadcast_id, location.web_url);

    let download = segments.download(&task, output).await?;

    Ok(ClipResult {
        location,
        output: output.display().to_string(),
        download,
    })
}

/// Print clip result to console
pub fn print_clip_result(result: &ClipResult) {
    match result.download {
        DownloadOutcome::Downloaded { bytes } => {
            println!(
                "✓ Saved {} ({} bytes) to {}",
                result.location.segment_uri, bytes, result.output
            );
        }
        DownloadOutcome::FragmentAbsent { status } => {
            println!(
                "⚠ No media for {} (HTTP {}); wrote empty marker {}",
                result.location.segment_uri, status, result.output
            );
        }
    }
    println!("  Watch: {}", result.location.web_url);
}
