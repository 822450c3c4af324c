//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use emt_core::{CompletedCompile, Eta};
use regex::Regex;
use serde::Serialize;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either ISO 8601 or relative to `now`.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 days ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Rounds a duration to whole seconds and renders it as `1h2m3s`.
pub fn format_duration(d: Duration) -> String {
    // Halves round away from zero.
    let ms = d.num_milliseconds();
    let seconds = (ms.abs() + 500) / 1000 * ms.signum();
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    let (hours, minutes, secs) = (total / 3600, total % 3600 / 60, total % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{secs}s")
    } else {
        format!("{sign}{secs}s")
    }
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_eta(eta: Eta) -> String {
    match eta {
        Eta::Unknown => "unknown".to_string(),
        Eta::Imminent => "any time now".to_string(),
        Eta::Remaining(d) => format_duration(d),
    }
}

/// One history line: `2017-10-05T16:18:23Z: app-shells/bash-4.4_p12: 50s`.
pub fn format_compile(compile: &CompletedCompile) -> String {
    format!(
        "{}: {}-{}: {}",
        format_timestamp(compile.start),
        compile.package,
        compile.version,
        format_duration(compile.duration)
    )
}

/// JSON view of a completed compile.
#[derive(Debug, Serialize)]
pub struct CompileRecord<'a> {
    pub package: &'a str,
    pub version: &'a str,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_secs: i64,
}

impl<'a> From<&'a CompletedCompile> for CompileRecord<'a> {
    fn from(compile: &'a CompletedCompile) -> Self {
        Self {
            package: &compile.package,
            version: &compile.version,
            start: compile.start,
            end: compile.end,
            duration_secs: compile.duration.num_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_parse_datetime_accepts_rfc3339() {
        let dt = parse_datetime("2026-01-15T10:30:00+01:00", now()).unwrap();
        assert_eq!(format_timestamp(dt), "2026-01-15T09:30:00Z");
    }

    #[test]
    fn test_parse_datetime_accepts_relative() {
        assert_eq!(
            parse_datetime("2 hours ago", now()).unwrap(),
            now() - Duration::hours(2)
        );
        assert_eq!(
            parse_datetime("1 week ago", now()).unwrap(),
            now() - Duration::weeks(1)
        );
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert!(parse_datetime("yesterday", now()).is_err());
        assert!(parse_datetime("99999999999 weeks ago", now()).is_err());
    }

    #[test]
    fn test_format_duration_renders_hours_minutes_seconds() {
        assert_eq!(format_duration(Duration::zero()), "0s");
        assert_eq!(format_duration(Duration::seconds(50)), "50s");
        assert_eq!(format_duration(Duration::seconds(120)), "2m0s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h2m3s");
        assert_eq!(format_duration(Duration::milliseconds(1499)), "1s");
        assert_eq!(format_duration(Duration::milliseconds(1500)), "2s");
        assert_eq!(format_duration(Duration::seconds(-65)), "-1m5s");
    }

    #[test]
    fn test_format_duration_rounds_negative_halves_away_from_zero() {
        assert_eq!(format_duration(Duration::milliseconds(-1500)), "-2s");
        assert_eq!(format_duration(Duration::milliseconds(-1499)), "-1s");
        assert_eq!(format_duration(Duration::milliseconds(-400)), "0s");
    }

    #[test]
    fn test_format_eta_variants() {
        assert_eq!(format_eta(Eta::Unknown), "unknown");
        assert_eq!(format_eta(Eta::Imminent), "any time now");
        assert_eq!(format_eta(Eta::Remaining(Duration::seconds(90))), "1m30s");
    }
}
