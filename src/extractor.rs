use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::config::{AccountingWindow, UNRATED_RATING_THRESHOLD};
use crate::error::{AppError, Result};
use crate::types::{ContestRecord, DerivedRecord, Season};

/// Recognizes contests of one series by name and pulls out their number.
#[derive(Debug, Clone)]
pub struct SeriesMatcher {
    pattern: Regex,
}

impl SeriesMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| AppError::Config(format!("invalid series pattern: {e}")))?;
        if pattern.captures_len() < 2 {
            return Err(AppError::Config(format!(
                "series pattern {:?} has no capture group for the contest number",
                pattern.as_str()
            )));
        }
        Ok(Self { pattern })
    }

    /// Contest number, or None if the name is not part of the series.
    pub fn contest_number(&self, contest_name: &str) -> Option<i64> {
        self.pattern
            .captures(contest_name)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub total: usize,
    pub rejected_unrated: usize,
    pub rejected_window: usize,
    pub rejected_series: usize,
    pub emitted: usize,
}

enum Rejection {
    Unrated,
    OutsideWindow,
    OtherSeries,
}

/// Filter a user's full history down to the tracked series.
///
/// `records` must be oldest first: `highest` is a running maximum over every
/// record, including the ones that end up filtered out.
pub fn extract_series(
    records: &[ContestRecord],
    window: &AccountingWindow,
    matcher: &SeriesMatcher,
) -> Result<(Vec<DerivedRecord>, ExtractStats)> {
    let mut out = Vec::new();
    let mut stats = ExtractStats {
        total: records.len(),
        ..Default::default()
    };
    let mut highest = 0i64;

    for record in records {
        let previous = highest;
        highest = highest.max(record.new_rating);

        match derive(record, window, matcher, highest, previous)? {
            Ok(derived) => out.push(derived),
            Err(rejection) => match rejection {
                Rejection::Unrated => stats.rejected_unrated += 1,
                Rejection::OutsideWindow => stats.rejected_window += 1,
                Rejection::OtherSeries => stats.rejected_series += 1,
            },
        }
    }

    stats.emitted = out.len();
    Ok((out, stats))
}

fn derive(
    record: &ContestRecord,
    window: &AccountingWindow,
    matcher: &SeriesMatcher,
    highest: i64,
    previous: i64,
) -> Result<std::result::Result<DerivedRecord, Rejection>> {
    // A null OldRating never counts as below the threshold.
    if !record.is_rated
        && record
            .old_rating
            .is_some_and(|old| old < UNRATED_RATING_THRESHOLD)
    {
        return Ok(Err(Rejection::Unrated));
    }

    let season = match record.end_time() {
        Some(end_time) => {
            let date = parse_end_date(end_time)?;
            if !window.contains(&contest_period(date)) {
                return Ok(Err(Rejection::OutsideWindow));
            }
            Season::from_date(date)
        }
        None => Season::Unknown,
    };

    let Some(abc) = matcher.contest_number(&record.contest_name) else {
        return Ok(Err(Rejection::OtherSeries));
    };

    Ok(Ok(DerivedRecord {
        abc,
        general_place: record.place,
        old_rating: record.old_rating,
        new_rating: record.new_rating,
        highest,
        performance: record.performance,
        season,
        update_highest: highest - previous,
    }))
}

/// `YYYYMM` for the month a contest ended in.
pub fn contest_period(date: NaiveDate) -> String {
    format!("{:04}{:02}", date.year(), date.month())
}

/// Calendar date of an EndTime, taken in the timestamp's own UTC offset.
/// Accepts RFC 3339, a naive date-time, or a bare date.
pub fn parse_end_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|source| AppError::Timestamp {
        value: s.to_string(),
        source,
    })
}
