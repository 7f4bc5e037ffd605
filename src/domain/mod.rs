use std::str::FromStr as _;

use chrono::{Month, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Reference rendering of the only accepted timestamp layout.
pub const HISTORY_TIMESTAMP_LAYOUT: &str = "Mon Jan 2 15:04:05 MST 2006";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    StartDate,
    EndDate,
}

impl TimestampField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartDate => "StartDate",
            Self::EndDate => "EndDate",
        }
    }
}

impl std::fmt::Display for TimestampField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    EmptyConnectionId,
    InvalidTimestamp {
        field: TimestampField,
        value: String,
    },
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyConnectionId => "invalid_connection_id",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
        }
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyConnectionId => write!(f, "ConnectionId must not be empty"),
            Self::InvalidTimestamp { field, value } => write!(
                f,
                "can't parse {field}: «{value}» (expected layout \"{HISTORY_TIMESTAMP_LAYOUT}\")"
            ),
        }
    }
}

impl std::error::Error for DomainError {}

/// One recorded interval. Both ends are kept exactly as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryAtom {
    pub start_date: String,
    pub end_date: String,
}

/// Append-only list of intervals stored under one connection key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HistoryRecord {
    pub stats: Vec<HistoryAtom>,
}

impl HistoryRecord {
    pub fn push(&mut self, atom: HistoryAtom) {
        self.stats.push(atom);
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }
}

/// One entry of a full history listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryInfo {
    pub connection_id: String,
    /// Mirrors `connection_id`; kept for callers that key on user.
    pub user_id: String,
    pub stats: Vec<HistoryAtom>,
}

impl HistoryInfo {
    pub fn new(connection_id: String, record: HistoryRecord) -> Self {
        Self {
            user_id: connection_id.clone(),
            connection_id,
            stats: record.stats,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryParam {
    #[serde(default)]
    pub user_id: String,
    pub connection_id: String,
    pub start_date: String,
    pub end_date: String,
}

impl HistoryParam {
    /// Checks everything `add` needs before a transaction is opened.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_connection_id(&self.connection_id)?;
        parse_history_timestamp(TimestampField::StartDate, &self.start_date)?;
        parse_history_timestamp(TimestampField::EndDate, &self.end_date)?;
        Ok(())
    }

    pub fn atom(&self) -> HistoryAtom {
        HistoryAtom {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
        }
    }
}

pub fn validate_connection_id(connection_id: &str) -> Result<(), DomainError> {
    if connection_id.is_empty() {
        return Err(DomainError::EmptyConnectionId);
    }
    Ok(())
}

/// Parses `value` against `HISTORY_TIMESTAMP_LAYOUT`.
///
/// Fields are separated by single spaces. The day and hour take one or two
/// digits, minutes and seconds exactly two, the year exactly four.
/// The returned value is the wall-clock reading. The zone abbreviation is only
/// checked for shape; no offset is applied.
pub fn parse_history_timestamp(
    field: TimestampField,
    value: &str,
) -> Result<NaiveDateTime, DomainError> {
    let invalid = || DomainError::InvalidTimestamp {
        field,
        value: value.to_string(),
    };

    let parts: Vec<&str> = value.split(' ').collect();
    let [weekday, month, day, time, zone, year] = parts.as_slice() else {
        return Err(invalid());
    };

    if weekday.len() != 3 || Weekday::from_str(weekday).is_err() {
        return Err(invalid());
    }
    if month.len() != 3 {
        return Err(invalid());
    }
    let month = Month::from_str(month).map_err(|_| invalid())?;
    let day = parse_digits(day, 1, 2).ok_or_else(invalid)?;
    let time = parse_clock(time).ok_or_else(invalid)?;
    if !is_zone_abbreviation(zone) {
        return Err(invalid());
    }
    let year = parse_digits(year, 4, 4).ok_or_else(invalid)?;

    let date = NaiveDate::from_ymd_opt(year as i32, month.number_from_month(), day)
        .ok_or_else(invalid)?;
    Ok(date.and_time(time))
}

/// `H:MM:SS` or `HH:MM:SS`, seconds below 60.
fn parse_clock(time: &str) -> Option<NaiveTime> {
    let mut fields = time.split(':');
    let hour = parse_digits(fields.next()?, 1, 2)?;
    let minute = parse_digits(fields.next()?, 2, 2)?;
    let second = parse_digits(fields.next()?, 2, 2)?;
    if fields.next().is_some() {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn parse_digits(s: &str, min: usize, max: usize) -> Option<u32> {
    if s.len() < min || s.len() > max || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_zone_abbreviation(zone: &str) -> bool {
    if !zone.bytes().all(|b| b.is_ascii_uppercase()) {
        return false;
    }
    match zone.len() {
        3 => true,
        4 | 5 => zone.ends_with('T'),
        _ => false,
    }
}
