//! Timestamp parsing and formatting.
//!
//! Two grammars meet in this domain and they are not interchangeable:
//! - cue-track time (`HH:MM:SS.mmm`, or `HH:MM:SS,mmm` for SRT), and
//! - markup dialogue time (`H:MM:SS.cc`, hours unpadded, centiseconds).

use crate::error::{ModelError, ModelResult};

/// Maximum reasonable video duration (24 hours in seconds).
pub const MAX_VIDEO_DURATION_SECS: f64 = 86400.0;

/// Parse a cue timestamp to total seconds.
///
/// Accepts `[[H:]MM:]SS[.mmm]`. The rightmost colon group is seconds
/// (fractional), then minutes, then hours; missing groups default to 0.
/// A comma decimal separator (SRT) is accepted as well.
///
/// # Examples
/// ```
/// use kirinuki_models::timestamp::parse_cue_time;
/// assert_eq!(parse_cue_time("01:30:00.000").unwrap(), 5400.0);
/// assert_eq!(parse_cue_time("05:30").unwrap(), 330.0);
/// assert_eq!(parse_cue_time("00:00:01,500").unwrap(), 1.5);
/// ```
pub fn parse_cue_time(ts: &str) -> ModelResult<f64> {
    let trimmed = ts.trim();
    if trimmed.is_empty() {
        return Err(ModelError::malformed_timestamp(ts));
    }

    let normalized = trimmed.replace(',', ".");
    let mut groups = normalized.rsplit(':');

    let seconds: f64 = groups
        .next()
        .and_then(|s| s.parse().ok())
        .filter(|s: &f64| s.is_finite() && *s >= 0.0)
        .ok_or_else(|| ModelError::malformed_timestamp(ts))?;

    let mut total = seconds;
    for multiplier in [60.0, 3600.0] {
        match groups.next() {
            Some(group) => {
                let value: u64 = group
                    .parse()
                    .map_err(|_| ModelError::malformed_timestamp(ts))?;
                total += value as f64 * multiplier;
            }
            None => return Ok(total),
        }
    }

    if groups.next().is_some() {
        return Err(ModelError::malformed_timestamp(ts));
    }

    Ok(total)
}

/// Format seconds as markup dialogue time (`H:MM:SS.cc`).
pub fn format_markup_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = (centis / 6_000) % 60;
    let secs = (centis / 100) % 60;
    let cs = centis % 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, cs)
}

/// Format seconds as cue-track time (`HH:MM:SS.mmm`).
pub fn format_cue_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Format seconds as SRT time (`HH:MM:SS,mmm`).
pub fn format_srt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms / 60_000) % 60,
        (total_ms / 1000) % 60,
        total_ms % 1000,
    )
}

/// Parse a markup dialogue time (`H:MM:SS.cc`) back to seconds.
pub fn parse_markup_time(ts: &str) -> ModelResult<f64> {
    // Same positional grammar; kept separate so callers state which format they hold.
    parse_cue_time(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cue_time_hh_mm_ss() {
        assert_eq!(parse_cue_time("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_cue_time("00:01:00").unwrap(), 60.0);
        assert_eq!(parse_cue_time("01:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_cue_time_partial_groups() {
        assert_eq!(parse_cue_time("05:30").unwrap(), 330.0);
        assert_eq!(parse_cue_time("90").unwrap(), 90.0);
        assert!((parse_cue_time("12.250").unwrap() - 12.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_cue_time_with_milliseconds() {
        assert!((parse_cue_time("00:00:30.500").unwrap() - 30.5).abs() < 1e-9);
        assert!((parse_cue_time("00:00:30,500").unwrap() - 30.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_cue_time_errors() {
        assert!(matches!(parse_cue_time(""), Err(ModelError::MalformedTimestamp(_))));
        assert!(matches!(parse_cue_time("abc"), Err(ModelError::MalformedTimestamp(_))));
        assert!(matches!(parse_cue_time("aa:10"), Err(ModelError::MalformedTimestamp(_))));
        assert!(matches!(parse_cue_time("1:2:3:4"), Err(ModelError::MalformedTimestamp(_))));
        assert!(matches!(parse_cue_time("-1"), Err(ModelError::MalformedTimestamp(_))));
    }

    #[test]
    fn test_format_markup_time() {
        assert_eq!(format_markup_time(0.0), "0:00:00.00");
        assert_eq!(format_markup_time(61.5), "0:01:01.50");
        assert_eq!(format_markup_time(3725.257), "1:02:05.26");
    }

    #[test]
    fn test_format_markup_time_carries_rounding() {
        // 59.999 rounds to a full minute instead of "0:00:60.00"
        assert_eq!(format_markup_time(59.999), "0:01:00.00");
    }

    #[test]
    fn test_format_cue_and_srt_time() {
        assert_eq!(format_cue_time(3661.5), "01:01:01.500");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
    }

    #[test]
    fn test_markup_round_trip_within_centisecond() {
        for input in ["00:00:01.234", "12:34.567", "1:02:03.999", "7.005"] {
            let secs = parse_cue_time(input).unwrap();
            let back = parse_markup_time(&format_markup_time(secs)).unwrap();
            assert!((back - secs).abs() <= 0.01, "{input}: {secs} vs {back}");
        }
    }
}
