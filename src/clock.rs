//! Reading the on-stream clock overlay through OCR

use crate::error::Result;
use crate::tools::DigitRecognizer;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

static CLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();

fn clock_pattern() -> &'static Regex {
    CLOCK_PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4})\D(\d{2})\D(\d{2})\D(\d{2})\D(\d{2})\D(\d{2})")
            .expect("clock pattern is valid")
    })
}

/// Result of reading a clock crop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockReading {
    /// A full date and time was recognized
    Timestamp(DateTime<Utc>),
    /// The engine ran but its text holds no usable timestamp
    NotFound { text: String },
}

/// Extract `YYYY?MM?DD?hh?mm?ss` from OCR text, where `?` is any single non-digit
pub fn parse_clock_text(text: &str) -> Option<DateTime<Utc>> {
    let caps = clock_pattern().captures(text)?;
    let field = |i: usize| caps[i].parse::<u32>().ok();

    let year = caps[1].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, field(2)?, field(3)?)?
        .and_hms_opt(field(4)?, field(5)?, field(6)?)
        .map(|naive| naive.and_utc())
}

/// Run OCR on a clock crop and parse the timestamp
///
/// Engine failures propagate as errors; unreadable text is `NotFound`.
pub async fn read_timestamp(recognizer: &dyn DigitRecognizer, crop: &Path) -> Result<ClockReading> {
    let text = recognizer.recognize_digits(crop).await?;
    debug!("OCR text for {:?}: {:?}", crop, text);

    Ok(match parse_clock_text(&text) {
        Some(ts) => ClockReading::Timestamp(ts),
        None => ClockReading::NotFound { text },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tools::fakes::{FakeReading, FakeRecognizer};
    use chrono::TimeZone;

    #[test]
    fn test_parse_common_separators() {
        let expected = Utc.with_ymd_and_hms(2016, 5, 1, 10, 0, 3).unwrap();
        assert_eq!(parse_clock_text("2016-05-01 10:00:03"), Some(expected));
        assert_eq!(parse_clock_text("2016.05.01.10.00.03"), Some(expected));
        assert_eq!(parse_clock_text("  2016/05/01T10-00-03\n"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_digit_separators_and_short_text() {
        assert_eq!(parse_clock_text("20160501100003"), None);
        assert_eq!(parse_clock_text("2016-05-01 10:00"), None);
        assert_eq!(parse_clock_text(""), None);
    }

    #[test]
    fn test_parse_rejects_impossible_dates() {
        assert_eq!(parse_clock_text("2016-13-01 10:00:03"), None);
        assert_eq!(parse_clock_text("2016-05-01 25:00:03"), None);
    }

    #[test]
    fn test_parse_finds_timestamp_in_noise() {
        let expected = Utc.with_ymd_and_hms(2017, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_clock_text("8 2017-01-31 23:59:59 ."), Some(expected));
    }

    #[tokio::test]
    async fn test_read_timestamp_outcomes() {
        let recognizer = FakeRecognizer::default()
            .with("good.png", FakeReading::Text("2016-05-01 10:00:03"))
            .with("smudged.png", FakeReading::Text("2O16-05-0"))
            .with("broken.png", FakeReading::EngineFailure);

        let good = read_timestamp(&recognizer, Path::new("good.png")).await.unwrap();
        assert_eq!(
            good,
            ClockReading::Timestamp(Utc.with_ymd_and_hms(2016, 5, 1, 10, 0, 3).unwrap())
        );

        let smudged = read_timestamp(&recognizer, Path::new("smudged.png")).await.unwrap();
        assert!(matches!(smudged, ClockReading::NotFound { .. }));

        let broken = read_timestamp(&recognizer, Path::new("broken.png")).await;
        assert!(matches!(broken, Err(Error::Ocr(_))));
        assert_eq!(recognizer.calls(), 3);
    }
}
