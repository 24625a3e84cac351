//! Recover command implementation

use super::open_segment_resolver;
use crate::artifacts::load_missing_list;
use crate::config::Config;
use crate::error::Result;
use crate::recovery::{FrameRecovery, RecoveryStats};
use crate::store::EventLog;
use crate::tools::{FfmpegDecoder, TesseractRecognizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RecoverOptions {
    /// Directory holding `missing.txt` and all frame artifacts
    pub image_dir: PathBuf,
    /// Event log database
    pub input_db: PathBuf,
    /// Broadcast index database
    pub broadcast_db: PathBuf,
}

/// Recover the frames listed in `<image_dir>/missing.txt`
pub async fn cmd_recover(config: &Config, options: RecoverOptions) -> Result<RecoveryStats> {
    let RecoverOptions {
        image_dir,
        input_db,
        broadcast_db,
    } = options;

    info!("Starting recovery in {:?}", image_dir);

    let frame_ids = load_missing_list(&image_dir).await?;
    if frame_ids.is_empty() {
        info!("Work list is empty, nothing to recover");
        return Ok(RecoveryStats::default());
    }

    let events = EventLog::open(&input_db, &config.store).await?;
    let segments = open_segment_resolver(config, &broadcast_db).await?;

    let recovery = FrameRecovery::new(
        config,
        image_dir,
        events,
        segments,
        Arc::new(FfmpegDecoder::new(&config.decoder)),
        Arc::new(TesseractRecognizer::new(&config.ocr)),
    );

    recovery.run(&frame_ids).await
}

/// Print recovery stats to console
pub fn print_recovery_stats(stats: &RecoveryStats) {
    println!("\n✓ Recovery complete");
    println!("  Frames in work list: {}", stats.frames);
    println!(
        "  Recovered: {} ({} drift-corrected)",
        stats.recovered, stats.corrected
    );
    println!("  Already present: {}", stats.already_present);
    println!("  Skipped: {}", stats.skipped.len());
    println!("  Failed: {}", stats.failed.len());

    if let Some(drift) = stats.final_drift_secs {
        println!("  Final drift: {:+.3}s", drift);
    }

    if !stats.skipped.is_empty() {
        println!("\nSkipped frames:");
        for skipped in &stats.skipped {
            println!("  • {}: {}", skipped.frame_id, skipped.reason);
        }
    }

    if !stats.failed.is_empty() {
        println!("\nFailed frames (retry by running again):");
        for failed in &stats.failed {
            println!("  ✗ {}: {}", failed.frame_id, failed.error);
        }
    }
}
