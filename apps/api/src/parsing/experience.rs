//! Total-experience inference from free-form work-experience durations.
//!
//! Accepted shapes: "2019 - 2023", "Jan 2019 – Present", "03/2018 - 06/2020",
//! "4 years", "2 yrs 6 months". Date ranges are merged before summing so
//! overlapping jobs are not double counted. Year-only dates are read as
//! January of that year, except that a year-only end date falling in the
//! start year runs to the end of that year ("2019 - 2019" is one year).
//! Explicit spans are capped at a century each.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::parsing::models::{ExperienceLevel, WorkExperience};

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?P<mon>jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+(?P<mon_year>(?:19|20)\d{2})|(?P<num_mon>\d{1,2})/(?P<num_year>(?:19|20)\d{2})|(?P<year>(?:19|20)\d{2})|(?P<now>present|current|now|today))\b",
    )
    .expect("valid date regex")
});

static SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(?P<years>\d+(?:\.\d+)?)\s*\+?\s*(?:years?|yrs?))?\s*(?:(?P<months>\d+)\s*(?:months?|mos?))?")
        .expect("valid span regex")
});

/// Months since year 0, so ranges are plain integer intervals.
type MonthIndex = i64;

/// Longest single explicit span counted, in months.
const MAX_SPAN_MONTHS: i64 = 100 * 12;

#[derive(Debug, Clone, Copy)]
struct DateToken {
    month: MonthIndex,
    year_only: bool,
}

impl DateToken {
    fn month(month: MonthIndex) -> Self {
        Self {
            month,
            year_only: false,
        }
    }
}

fn month_index(year: i32, month: u32) -> MonthIndex {
    year as i64 * 12 + (month as i64 - 1)
}

fn month_number(abbrev: &str) -> u32 {
    match &abbrev.to_ascii_lowercase()[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        _ => 12,
    }
}

fn date_tokens(duration: &str, today: NaiveDate) -> Vec<DateToken> {
    DATE_TOKEN
        .captures_iter(duration)
        .filter_map(|caps| {
            if let (Some(mon), Some(year)) = (caps.name("mon"), caps.name("mon_year")) {
                let month = month_index(year.as_str().parse().ok()?, month_number(mon.as_str()));
                return Some(DateToken::month(month));
            }
            if let (Some(mon), Some(year)) = (caps.name("num_mon"), caps.name("num_year")) {
                let month: u32 = mon.as_str().parse().ok()?;
                return (1..=12)
                    .contains(&month)
                    .then(|| year.as_str().parse().ok().map(|y| month_index(y, month)))
                    .flatten()
                    .map(DateToken::month);
            }
            if let Some(year) = caps.name("year") {
                return Some(DateToken {
                    month: month_index(year.as_str().parse().ok()?, 1),
                    year_only: true,
                });
            }
            caps.name("now")
                .map(|_| DateToken::month(month_index(today.year(), today.month())))
        })
        .collect()
}

/// Length of an explicit "N years M months" phrase, in months.
fn explicit_span_months(duration: &str) -> Option<i64> {
    SPAN.captures_iter(duration).find_map(|caps| {
        let years: f64 = caps.name("years").and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
        let months: f64 = caps.name("months").and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
        let total = (years * 12.0 + months).round().min(MAX_SPAN_MONTHS as f64) as i64;
        (total > 0).then_some(total)
    })
}

/// Parses one duration into a `[start, end)` month interval, if it is a range.
pub fn parse_range(duration: &str, today: NaiveDate) -> Option<(MonthIndex, MonthIndex)> {
    let tokens = date_tokens(duration, today);
    match tokens.as_slice() {
        [start, end, ..] => {
            let same_year = end.month <= start.month && start.month < end.month + 12;
            let end = if end.year_only && same_year {
                end.month + 12
            } else {
                end.month
            };
            (end >= start.month).then_some((start.month, end))
        }
        _ => None,
    }
}

/// Total years of experience across all entries, or `None` when no duration
/// could be interpreted.
pub fn total_experience_years(entries: &[WorkExperience], today: NaiveDate) -> Option<f64> {
    let mut ranges: Vec<(MonthIndex, MonthIndex)> = Vec::new();
    let mut loose_months = 0_i64;
    let mut interpreted = false;

    for entry in entries {
        if let Some(range) = parse_range(&entry.duration, today) {
            ranges.push(range);
            interpreted = true;
        } else if let Some(months) = explicit_span_months(&entry.duration) {
            loose_months = loose_months.saturating_add(months);
            interpreted = true;
        }
    }

    if !interpreted {
        return None;
    }

    ranges.sort_unstable();
    let mut merged_months = 0_i64;
    let mut current: Option<(MonthIndex, MonthIndex)> = None;
    for (start, end) in ranges {
        current = match current {
            Some((cur_start, cur_end)) if start <= cur_end => Some((cur_start, cur_end.max(end))),
            Some((cur_start, cur_end)) => {
                merged_months += cur_end - cur_start;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((start, end)) = current {
        merged_months += end - start;
    }

    Some(merged_months.saturating_add(loose_months) as f64 / 12.0)
}

/// Band inferred from the listed work history, `None` when not inferable.
pub fn infer_level(entries: &[WorkExperience], today: NaiveDate) -> Option<ExperienceLevel> {
    total_experience_years(entries, today).map(ExperienceLevel::from_years)
}
