//! HLS media playlists: parsing and time lookup
//!
//! Only what the resolver needs is read: `#EXTINF` durations and the segment
//! URI that follows each of them. Other tags and comments are ignored.

mod cache;

pub use cache::*;

use crate::error::{Error, Result};
use crate::timestamp::delta_secs;
use chrono::{DateTime, Utc};

const EXTINF: &str = "#EXTINF:";

/// One media segment with its position on the broadcast timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub uri: String,
    /// Duration in seconds
    pub duration: f64,
    /// Seconds from the start of the broadcast to the start of this segment
    pub start: f64,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Inclusive containment check on both ends
    pub fn contains(&self, offset: f64) -> bool {
        self.start <= offset && offset <= self.end()
    }
}

/// Ordered, contiguous segment list of one broadcast
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    pub segments: Vec<Segment>,
}

fn parse_duration(tag: &str, line: usize) -> Result<f64> {
    let value = tag[EXTINF.len()..]
        .split(',')
        .next()
        .unwrap_or_default()
        .trim();

    match value.parse::<f64>() {
        Ok(duration) if duration.is_finite() && duration >= 0.0 => Ok(duration),
        _ => Err(Error::MalformedPlaylist {
            line,
            reason: format!("invalid segment duration '{}'", value),
        }),
    }
}

impl Playlist {
    /// Parse playlist text
    ///
    /// Every `#EXTINF` must be followed by exactly one URI before the next
    /// `#EXTINF`, and every URI must be preceded by one.
    pub fn parse(text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut pending: Option<(f64, usize)> = None;
        let mut elapsed = 0.0;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.starts_with(EXTINF) {
                if let Some((_, open)) = pending {
                    return Err(Error::MalformedPlaylist {
                        line: line_no,
                        reason: format!("#EXTINF from line {} has no segment URI", open),
                    });
                }
                pending = Some((parse_duration(line, line_no)?, line_no));
            } else if line.is_empty() || line.starts_with('#') {
                continue;
            } else {
                let Some((duration, _)) = pending.take() else {
                    return Err(Error::MalformedPlaylist {
                        line: line_no,
                        reason: format!("segment URI '{}' without #EXTINF", line),
                    });
                };
                segments.push(Segment {
                    uri: line.to_string(),
                    duration,
                    start: elapsed,
                });
                elapsed += duration;
            }
        }

        if let Some((_, open)) = pending {
            return Err(Error::MalformedPlaylist {
                line: open,
                reason: "playlist ends before the segment URI".to_string(),
            });
        }

        Ok(Self { segments })
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.last().map(Segment::end).unwrap_or(0.0)
    }

    /// First segment whose window contains `offset` seconds
    pub fn segment_at(&self, offset: f64) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.contains(offset))
    }

    /// Segment covering `target` for a broadcast that started at `started_at`
    pub fn locate(
        &self,
        broadcast_id: i64,
        started_at: DateTime<Utc>,
        target: DateTime<Utc>,
    ) -> Result<&Segment> {
        let offset = delta_secs(target - started_at);
        self.segment_at(offset)
            .ok_or_else(|| Error::SegmentNotFound {
                broadcast_id,
                target: target.to_rfc3339(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const THREE_SEGMENTS: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:2
#ID3-EQUIV-TDTG:2016-05-01T09:59:59
#EXTINF:2.000,
a.ts
#EXTINF:2.000,
b.ts
#EXTINF:2.000,
c.ts
#EXT-X-ENDLIST
";

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_accumulates_starts() {
        let playlist = Playlist::parse(THREE_SEGMENTS).unwrap();
        let starts: Vec<f64> = playlist.segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0]);
        assert_eq!(playlist.total_duration(), 6.0);

        // Contiguity: each start is the previous start plus its duration
        for pair in playlist.segments.windows(2) {
            assert_eq!(pair[1].start, pair[0].start + pair[0].duration);
        }
    }

    #[test]
    fn test_parse_durations_without_title_and_integer_values() {
        let playlist = Playlist::parse("#EXTINF:10\nx.ts\n#EXTINF:4.5,live\ny.ts\n").unwrap();
        assert_eq!(playlist.segments[0].duration, 10.0);
        assert_eq!(playlist.segments[1].duration, 4.5);
        assert_eq!(playlist.segments[1].start, 10.0);
    }

    #[test]
    fn test_locate_end_to_end_example() {
        let playlist = Playlist::parse(THREE_SEGMENTS).unwrap();
        let segment = playlist.locate(1, at(9, 59, 59), at(10, 0, 4)).unwrap();
        assert_eq!(segment.uri, "c.ts");
    }

    #[test]
    fn test_locate_shared_boundary_picks_earlier_segment() {
        let playlist = Playlist::parse(THREE_SEGMENTS).unwrap();
        let segment = playlist.locate(1, at(9, 59, 59), at(10, 0, 1)).unwrap();
        assert_eq!(segment.uri, "a.ts");
        let segment = playlist.locate(1, at(9, 59, 59), at(10, 0, 5)).unwrap();
        assert_eq!(segment.uri, "c.ts");
    }

    #[test]
    fn test_locate_every_segment_of_synthetic_playlist() {
        let durations = [2.0, 3.5, 1.25, 4.0, 2.0, 6.0];
        let mut text = String::from("#EXTM3U\n");
        for (i, d) in durations.iter().enumerate() {
            text.push_str(&format!("#EXTINF:{:.3},\nseg{}.ts\n", d, i));
        }
        let playlist = Playlist::parse(&text).unwrap();

        let mut start = 0.0;
        for (i, d) in durations.iter().enumerate() {
            let midpoint = start + d / 2.0;
            assert_eq!(
                playlist.segment_at(midpoint).unwrap().uri,
                format!("seg{}.ts", i)
            );
            start += d;
        }
    }

    #[test]
    fn test_locate_outside_playlist_fails() {
        let playlist = Playlist::parse(THREE_SEGMENTS).unwrap();

        let before = playlist.locate(7, at(9, 59, 59), at(9, 59, 58));
        assert!(matches!(before, Err(Error::SegmentNotFound { broadcast_id: 7, .. })));

        let after = playlist.locate(7, at(9, 59, 59), at(10, 0, 6));
        assert!(matches!(after, Err(Error::SegmentNotFound { .. })));
    }

    #[test]
    fn test_consecutive_extinf_is_malformed() {
        let err = Playlist::parse("#EXTINF:2.0,\n#EXTINF:2.0,\nb.ts\n").unwrap_err();
        assert!(matches!(err, Error::MalformedPlaylist { line: 2, .. }));
    }

    #[test]
    fn test_uri_without_extinf_is_malformed() {
        let err = Playlist::parse("#EXTM3U\na.ts\n").unwrap_err();
        assert!(matches!(err, Error::MalformedPlaylist { line: 2, .. }));
    }

    #[test]
    fn test_trailing_extinf_is_malformed() {
        let err = Playlist::parse("#EXTINF:2.0,\na.ts\n#EXTINF:2.0,\n").unwrap_err();
        assert!(matches!(err, Error::MalformedPlaylist { line: 3, .. }));
    }

    #[test]
    fn test_bad_duration_is_malformed() {
        let err = Playlist::parse("#EXTINF:abc,\na.ts\n").unwrap_err();
        assert!(matches!(err, Error::MalformedPlaylist { line: 1, .. }));
    }
}
