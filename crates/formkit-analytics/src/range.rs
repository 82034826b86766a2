//! Time range filter

use chrono::{DateTime, Duration, Utc};
use formkit_core::Submission;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Window of submissions an analysis covers, relative to now
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    /// Last 7 days
    #[serde(rename = "7d")]
    Week,
    /// Last 30 days
    #[default]
    #[serde(rename = "30d")]
    Month,
    /// Last 90 days
    #[serde(rename = "90d")]
    Quarter,
    /// Last 365 days
    #[serde(rename = "1y")]
    Year,
    /// No lower bound
    #[serde(rename = "all")]
    All,
}

/// Unrecognized time range text
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown time range '{0}' (expected 7d, 30d, 90d, 1y or all)")]
pub struct ParseTimeRangeError(pub String);

impl TimeRange {
    /// Short name: 7d, 30d, 90d, 1y or all
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
            Self::All => "all",
        }
    }

    /// Window length; `None` for [`TimeRange::All`]
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Week => Some(Duration::days(7)),
            Self::Month => Some(Duration::days(30)),
            Self::Quarter => Some(Duration::days(90)),
            Self::Year => Some(Duration::days(365)),
            Self::All => None,
        }
    }

    /// Earliest instant inside the range
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.duration().map(|d| now - d)
    }

    /// Whether `at` falls inside the window ending at `now`
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now).map_or(true, |cutoff| at >= cutoff)
    }

    /// Submissions inside the range, in their original order
    pub fn filter<'a>(&self, submissions: &'a [Submission], now: DateTime<Utc>) -> Vec<&'a Submission> {
        submissions
            .iter()
            .filter(|s| self.contains(s.submitted_at(), now))
            .collect()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = ParseTimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            "1y" => Ok(Self::Year),
            "all" => Ok(Self::All),
            other => Err(ParseTimeRangeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use formkit_core::SubmissionMetadata;

    fn at(days_ago: i64, now: DateTime<Utc>) -> Submission {
        Submission {
            id: format!("s{}", days_ago),
            form_id: "f".into(),
            data: Default::default(),
            metadata: SubmissionMetadata::at(now - Duration::days(days_ago)),
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("7d".parse::<TimeRange>().unwrap(), TimeRange::Week);
        assert_eq!("ALL".parse::<TimeRange>().unwrap(), TimeRange::All);
        assert!("2w".parse::<TimeRange>().is_err());
        assert_eq!(serde_json::to_string(&TimeRange::Year).unwrap(), "\"1y\"");
    }

    #[test]
    fn test_filter() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let submissions: Vec<_> = [1, 6, 7, 8, 60, 400].iter().map(|d| at(*d, now)).collect();

        assert_eq!(TimeRange::Week.filter(&submissions, now).len(), 3);
        assert_eq!(TimeRange::Quarter.filter(&submissions, now).len(), 5);
        assert_eq!(TimeRange::All.filter(&submissions, now).len(), 6);
    }
}
