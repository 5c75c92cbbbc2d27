// src/services/dates.rs

//! Normalization of the short Russian date text shown on listing pages.
//!
//! Understands `"сегодня"`, `"вчера"` and `"<day> <month abbr>."`, optionally
//! prefixed by a city (`"Москва, 28 авг."`). The year is not shown on the page,
//! so the current year is assumed unless that puts the date more than a day
//! in the future.

use chrono::{Datelike, Days, Local, NaiveDate, TimeZone};
use regex::Regex;

/// A date resolved from listing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    /// `DD.MM.YYYY`
    pub date: String,
    /// Local midnight in milliseconds since the epoch
    pub timestamp: i64,
}

impl NormalizedDate {
    fn from_naive(date: NaiveDate) -> Option<Self> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        let timestamp = Local
            .from_local_datetime(&midnight)
            .earliest()?
            .timestamp_millis();
        Some(Self {
            date: date.format("%d.%m.%Y").to_string(),
            timestamp,
        })
    }
}

fn month_number(abbr: &str) -> Option<u32> {
    let month = match abbr {
        "янв" => 1,
        "фев" => 2,
        "мар" => 3,
        "апр" => 4,
        "май" => 5,
        "июн" => 6,
        "июл" => 7,
        "авг" => 8,
        "сен" => 9,
        "окт" => 10,
        "ноя" => 11,
        "дек" => 12,
        _ => return None,
    };
    Some(month)
}

/// Strip a leading `"City, "` prefix and normalize case.
fn strip_location(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    match lower.split_once(',') {
        Some((_, rest)) => rest.trim().to_string(),
        None => lower,
    }
}

/// Normalize `text` relative to `today`.
pub fn normalize_date_text(text: &str, today: NaiveDate) -> Option<NormalizedDate> {
    let normalized = strip_location(text);
    if normalized.is_empty() {
        return None;
    }

    match normalized.as_str() {
        "сегодня" => return NormalizedDate::from_naive(today),
        "вчера" => return NormalizedDate::from_naive(today.checked_sub_days(Days::new(1))?),
        _ => {}
    }

    let pattern = Regex::new(r"(\d{1,2})\s*([а-яё]{3})\.?").ok()?;
    let caps = pattern.captures(&normalized)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = month_number(caps.get(2)?.as_str())?;

    let mut year = today.year();
    let candidate = NaiveDate::from_ymd_opt(year, month, day)?;
    if (candidate - today).num_days() > 1 {
        year -= 1;
    }

    NormalizedDate::from_naive(NaiveDate::from_ymd_opt(year, month, day)?)
}
