//! Drift-correcting recovery of missing frames
//!
//! Frames are processed one at a time in ascending id order. For each frame
//! the segment recorded at the expected capture time is fetched, the clock
//! overlay on its first frame is read back, and when the broadcast clock
//! disagrees with the event log by enough, the segment at the corrected time
//! is fetched instead. The drift estimate found for one frame seeds the next.
//!
//! ```text
//! START -> SEGMENT_FETCHED -> FRAME_EXTRACTED -> OCR_READ -> DRIFT_VALIDATED
//!       -> [CORRECTED_FETCH] -> DONE | SKIPPED
//! ```

use crate::artifacts::{is_ready, segment_state, FrameArtifacts, SegmentState};
use crate::clock::{read_timestamp, ClockReading};
use crate::config::{Config, LayoutConfig};
use crate::drift::{corrected_target, drift_label, drift_secs, DriftEstimate, DriftPolicy, DriftUpdate};
use crate::error::{Error, Result};
use crate::frames::{crop_file, extract_first_frame};
use crate::progress::frame_progress_bar;
use crate::segment::{DownloadOutcome, SegmentResolver};
use crate::store::EventLog;
use crate::tools::{DigitRecognizer, FrameDecoder};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a frame was left unrecovered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The host has no media for the requested time
    FragmentAbsent { corrected: bool },
    /// The segment file is a zero-size marker
    EmptySegment { corrected: bool },
    /// OCR found no timestamp and no earlier frame produced a drift estimate
    NoClockReading,
    /// The observed drift exceeds the plausibility limit
    ImplausibleDrift { observed_secs: f64 },
    /// No output geometry covers the frame id
    NoOutputLayout,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let which = |corrected: bool| if corrected { "corrected " } else { "" };
        match self {
            SkipReason::FragmentAbsent { corrected } => {
                write!(f, "{}fragment absent", which(*corrected))
            }
            SkipReason::EmptySegment { corrected } => {
                write!(f, "{}segment is empty", which(*corrected))
            }
            SkipReason::NoClockReading => write!(f, "clock unreadable and no prior drift"),
            SkipReason::ImplausibleDrift { observed_secs } => {
                write!(f, "implausible drift of {:.3}s", observed_secs)
            }
            SkipReason::NoOutputLayout => write!(f, "no output layout for frame id"),
        }
    }
}

/// Result of processing one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Recovered { corrected: bool },
    AlreadyPresent,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFrame {
    pub frame_id: i64,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFrame {
    pub frame_id: i64,
    pub error: String,
}

/// Summary of a recovery run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryStats {
    pub frames: usize,
    pub recovered: usize,
    /// Recovered frames that needed a drift-corrected segment
    pub corrected: usize,
    pub already_present: usize,
    pub skipped: Vec<SkippedFrame>,
    pub failed: Vec<FailedFrame>,
    /// Drift estimate left at the end of the run
    pub final_drift_secs: Option<f64>,
}

impl RecoveryStats {
    fn record(&mut self, frame_id: i64, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Recovered { corrected } => {
                self.recovered += 1;
                if corrected {
                    self.corrected += 1;
                }
            }
            FrameOutcome::AlreadyPresent => self.already_present += 1,
            FrameOutcome::Skipped(reason) => self.skipped.push(SkippedFrame { frame_id, reason }),
        }
    }
}

/// A frame to recover, with the time its capture was due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingFrame {
    pub frame_id: i64,
    pub expected_capture_time: DateTime<Utc>,
}

/// Drift correction loop over missing frames
pub struct FrameRecovery {
    image_dir: PathBuf,
    events: EventLog,
    segments: SegmentResolver,
    decoder: Arc<dyn FrameDecoder>,
    recognizer: Arc<dyn DigitRecognizer>,
    policy: DriftPolicy,
    countdown_offset: TimeDelta,
    layout: LayoutConfig,
}

impl FrameRecovery {
    pub fn new(
        config: &Config,
        image_dir: impl Into<PathBuf>,
        events: EventLog,
        segments: SegmentResolver,
        decoder: Arc<dyn FrameDecoder>,
        recognizer: Arc<dyn DigitRecognizer>,
    ) -> Self {
        Self {
            image_dir: image_dir.into(),
            events,
            segments,
            decoder,
            recognizer,
            policy: DriftPolicy::from_config(&config.drift),
            countdown_offset: TimeDelta::seconds(config.drift.countdown_offset_secs),
            layout: config.layout.clone(),
        }
    }

    /// Look up the expected capture time of a frame
    pub async fn request(&self, frame_id: i64) -> Result<MissingFrame> {
        let logged = self
            .events
            .logged_time(frame_id)
            .await?
            .ok_or(Error::FrameNotLogged(frame_id))?;

        Ok(MissingFrame {
            frame_id,
            expected_capture_time: logged + self.countdown_offset,
        })
    }

    /// Recover every frame in `frame_ids`, lowest id first
    ///
    /// Frame-local failures are logged and counted; any other error ends the
    /// run. Finished artifacts stay on disk either way.
    pub async fn run(&self, frame_ids: &[i64]) -> Result<RecoveryStats> {
        let mut ids = frame_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        info!("Starting recovery of {} frames", ids.len());

        let mut stats = RecoveryStats {
            frames: ids.len(),
            ..Default::default()
        };
        let mut drift = DriftEstimate::default();
        let pb = frame_progress_bar(ids.len());

        for frame_id in ids {
            pb.set_message(format!("frame {}", frame_id));

            match self.recover_frame(frame_id, &mut drift).await {
                Ok(outcome) => stats.record(frame_id, outcome),
                Err(e) if e.is_frame_local() => {
                    let error_msg = e.to_string();
                    warn!(frame_id, %error_msg, "Frame recovery failed");
                    stats.failed.push(FailedFrame {
                        frame_id,
                        error: error_msg,
                    });
                }
                Err(e) => {
                    pb.abandon_with_message(format!("stopped at frame {}", frame_id));
                    return Err(e);
                }
            }

            pb.inc(1);
        }

        pb.finish_with_message("Frames processed");
        stats.final_drift_secs = drift.delta().map(drift_secs);

        info!(
            "Recovery complete: {} recovered ({} corrected), {} already present, {} skipped, {} failed",
            stats.recovered,
            stats.corrected,
            stats.already_present,
            stats.skipped.len(),
            stats.failed.len()
        );

        Ok(stats)
    }

    /// Process one frame
    ///
    /// An accepted clock reading is written to `drift` as soon as it is
    /// validated, so it carries over to the next frame even if a later step
    /// of this one fails.
    pub async fn recover_frame(
        &self,
        frame_id: i64,
        drift: &mut DriftEstimate,
    ) -> Result<FrameOutcome> {
        let artifacts = FrameArtifacts::new(&self.image_dir, frame_id);
        if artifacts.is_recovered() {
            debug!(frame_id, "Output already present");
            return Ok(FrameOutcome::AlreadyPresent);
        }

        let request = self.request(frame_id).await?;
        let expected = request.expected_capture_time;
        artifacts.ensure_dirs().await?;

        let segment = artifacts.segment();
        if let Some(reason) = self.ensure_segment(expected, &segment, false).await? {
            return Ok(skip(frame_id, reason));
        }

        let clock_crop = artifacts.clock_crop();
        if !is_ready(&clock_crop) {
            let frame = extract_first_frame(self.decoder.as_ref(), &segment).await?;
            crop_file(&frame, &self.layout.clock_region, &clock_crop)?;
        }

        let delta = match read_timestamp(self.recognizer.as_ref(), &clock_crop).await? {
            ClockReading::Timestamp(observed) => match drift.observe(expected, observed, &self.policy) {
                DriftUpdate::Accepted { estimate, previous } => {
                    let delta = expected - observed;
                    info!(
                        frame_id,
                        drift_secs = drift_secs(delta),
                        previous_secs = ?previous.delta().map(drift_secs),
                        "Clock read at {}",
                        observed
                    );
                    *drift = estimate;
                    delta
                }
                DriftUpdate::Rejected { observed, estimate } => {
                    *drift = estimate;
                    let reason = SkipReason::ImplausibleDrift {
                        observed_secs: drift_secs(observed),
                    };
                    return Ok(skip(frame_id, reason));
                }
            },
            ClockReading::NotFound { text } => match drift.delta() {
                Some(delta) => {
                    warn!(
                        frame_id,
                        ocr_text = %text,
                        drift_secs = drift_secs(delta),
                        "No clock reading, reusing previous drift"
                    );
                    delta
                }
                None => return Ok(skip(frame_id, SkipReason::NoClockReading)),
            },
        };

        let corrected = self.policy.needs_correction(delta);
        let source = if corrected {
            let corrected_segment = artifacts.corrected_segment(drift_label(delta));
            let target = corrected_target(expected, delta);
            info!(frame_id, "Fetching drift-corrected segment at {}", target);

            if let Some(reason) = self.ensure_segment(target, &corrected_segment, true).await? {
                return Ok(skip(frame_id, reason));
            }
            corrected_segment
        } else {
            segment
        };

        let Some(region) = self.layout.output_region(frame_id) else {
            return Ok(skip(frame_id, SkipReason::NoOutputLayout));
        };

        let frame = extract_first_frame(self.decoder.as_ref(), &source).await?;
        crop_file(&frame, region, &artifacts.output())?;
        info!(frame_id, corrected, "Recovered frame {:?}", artifacts.output());

        Ok(FrameOutcome::Recovered { corrected })
    }

    /// Make sure a usable segment for `target` is on disk at `path`
    ///
    /// Returns the skip reason when the fragment is absent or the file is a
    /// zero-size marker. An existing file is never downloaded again.
    async fn ensure_segment(
        &self,
        target: DateTime<Utc>,
        path: &Path,
        corrected: bool,
    ) -> Result<Option<SkipReason>> {
        match segment_state(path) {
            SegmentState::Ready => {
                debug!("Reusing segment {:?}", path);
                return Ok(None);
            }
            SegmentState::Empty => return Ok(Some(SkipReason::EmptySegment { corrected })),
            SegmentState::Missing => {}
        }

        let (task, outcome) = self.segments.fetch(target, path).await?;
        debug!(
            "Segment {} of broadcast {} fetched for {}",
            task.segment.uri, task.broadcast.id, target
        );

        Ok(match outcome {
            DownloadOutcome::FragmentAbsent { .. } => Some(SkipReason::FragmentAbsent { corrected }),
            DownloadOutcome::Downloaded { .. } if segment_state(path) == SegmentState::Empty => {
                Some(SkipReason::EmptySegment { corrected })
            }
            DownloadOutcome::Downloaded { .. } => None,
        })
    }
}

fn skip(frame_id: i64, reason: SkipReason) -> FrameOutcome {
    warn!(frame_id, %reason, "Skipping frame");
    FrameOutcome::Skipped(reason)
}
