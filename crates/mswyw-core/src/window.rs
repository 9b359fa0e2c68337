use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::error::ConfigError;

/// Half-open sampling interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoringWindow {
    #[serde(rename = "start-time", serialize_with = "rfc3339")]
    start: DateTime<Utc>,
    #[serde(rename = "end-time", serialize_with = "rfc3339")]
    end: DateTime<Utc>,
}

impl ScoringWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::Window(format!(
                "start {} is not before end {}",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
                end.to_rfc3339_opts(SecondsFormat::Secs, true)
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `interval_minutes` that closes `end_minutes_ago` before `now`.
    pub fn ending_at(
        now: DateTime<Utc>,
        interval_minutes: i64,
        end_minutes_ago: i64,
    ) -> Result<Self, ConfigError> {
        if interval_minutes <= 0 {
            return Err(ConfigError::Window(format!(
                "interval must be a positive number of minutes, got {interval_minutes}"
            )));
        }
        if end_minutes_ago < 0 {
            return Err(ConfigError::Window(format!(
                "endMinutesAgo must not be negative, got {end_minutes_ago}"
            )));
        }
        let end = minutes_before(now, end_minutes_ago)?;
        let start = minutes_before(end, interval_minutes)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn minutes(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 60_000.0
    }
}

fn minutes_before(at: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>, ConfigError> {
    Duration::try_minutes(minutes)
        .and_then(|d| at.checked_sub_signed(d))
        .ok_or_else(|| ConfigError::Window(format!("{minutes} minutes is out of range")))
}

fn rfc3339<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("valid time")
    }

    #[test]
    fn window_closes_before_now() {
        let w = ScoringWindow::ending_at(noon(), 30, 60).expect("valid window");
        assert_eq!(w.end(), Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap());
        assert_eq!(w.start(), Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
        assert!((w.minutes() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_empty_and_negative_inputs() {
        assert!(ScoringWindow::ending_at(noon(), 0, 0).is_err());
        assert!(ScoringWindow::ending_at(noon(), 30, -5).is_err());
        assert!(ScoringWindow::new(noon(), noon()).is_err());
    }

    #[test]
    fn serializes_bounds_in_utc() {
        let w = ScoringWindow::ending_at(noon(), 15, 0).expect("valid window");
        let json = serde_json::to_value(w).expect("serialize");
        assert_eq!(json["start-time"], "2024-03-01T11:45:00Z");
        assert_eq!(json["end-time"], "2024-03-01T12:00:00Z");
    }
}
