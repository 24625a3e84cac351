//! Locate command implementation

use super::open_segment_resolver;
use crate::config::Config;
use crate::error::Result;
use crate::segment::SegmentTask;
use crate::timestamp::{delta_secs, format_offset, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Where a point in time lives in the archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub target: DateTime<Utc>,
    pub broadcast_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub broadcast_end: DateTime<Utc>,
    /// Offset into the broadcast, `1h2m3s`
    pub offset: String,
    pub web_url: String,
    pub segment_uri: String,
    pub segment_start_secs: f64,
    pub segment_duration_secs: f64,
    pub segment_url: String,
}

impl Location {
    pub fn from_task(task: &SegmentTask, web_url_template: &str) -> Self {
        let broadcast = &task.broadcast;
        Self {
            target: task.target,
            broadcast_id: broadcast.id,
            recorded_at: broadcast.recorded_at,
            broadcast_end: broadcast.end(),
            offset: format_offset(broadcast.offset_of(task.target)),
            web_url: broadcast.web_url(web_url_template, task.target),
            segment_uri: task.segment.uri.clone(),
            segment_start_secs: task.segment.start,
            segment_duration_secs: task.segment.duration,
            segment_url: task.url.to_string(),
        }
    }

    /// Seconds between the segment start and the target
    pub fn offset_in_segment(&self) -> f64 {
        delta_secs(self.target - self.recorded_at) - self.segment_start_secs
    }
}

/// Find the broadcast and segment covering `time`
pub async fn cmd_locate(config: &Config, broadcast_db: &Path, time: &str) -> Result<Location> {
    let target = parse_timestamp(time)?;
    info!("Locating {}", target);

    let segments = open_segment_resolver(config, broadcast_db).await?;
    let task = segments.resolve(target).await?;
    Ok(Location::from_task(&task, &config.resolver.web_url_template))
}

/// Print a location to console
pub fn print_location(location: &Location) {
    println!("\n📍 {}\n", location.target);
    println!(
        "Broadcast: {} ({} → {})",
        location.broadcast_id, location.recorded_at, location.broadcast_end
    );
    println!("Offset: {}", location.offset);
    println!("Watch: {}", location.web_url);
    println!(
        "Segment: {} (starts at {:.3}s, {:.3}s long, target {:.3}s in)",
        location.segment_uri,
        location.segment_start_secs,
        location.segment_duration_secs,
        location.offset_in_segment()
    );
    println!("URL: {}", location.segment_url);
}
