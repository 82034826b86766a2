//! Daily submission trends

use crate::overview::percent;
use chrono::{FixedOffset, NaiveDate};
use formkit_core::Submission;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Submissions received on one calendar day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Calendar day
    pub date: NaiveDate,
    /// Submissions that day
    pub count: u64,
    /// Running total up to and including this day
    pub cumulative: u64,
    /// Change against the previous day with submissions, percent
    pub growth_rate: f64,
}

/// Daily series with its peak
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    /// Days with submissions, oldest first
    pub points: Vec<TrendPoint>,
    /// Busiest day; the earliest wins a tie
    pub peak_day: Option<NaiveDate>,
    /// Submissions on the peak day
    pub peak_count: u64,
}

/// Group submissions by calendar day in `offset`
pub fn trends(submissions: &[&Submission], offset: FixedOffset) -> Trends {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for submission in submissions {
        let day = submission.submitted_at().with_timezone(&offset).date_naive();
        *per_day.entry(day).or_insert(0) += 1;
    }

    let mut points = Vec::with_capacity(per_day.len());
    let mut cumulative = 0;
    let mut previous: Option<u64> = None;
    for (date, count) in per_day {
        cumulative += count;
        let growth_rate = match previous {
            Some(prev) if prev > 0 => percent(count as f64 - prev as f64, prev as f64),
            _ => 0.0,
        };
        points.push(TrendPoint {
            date,
            count,
            cumulative,
            growth_rate,
        });
        previous = Some(count);
    }

    // Points are in date order, so the first maximum is the earliest day
    let peak = points.iter().fold(None, |best: Option<&TrendPoint>, p| match best {
        Some(b) if b.count >= p.count => Some(b),
        _ => Some(p),
    });

    Trends {
        peak_day: peak.map(|p| p.date),
        peak_count: peak.map_or(0, |p| p.count),
        points,
    }
}
