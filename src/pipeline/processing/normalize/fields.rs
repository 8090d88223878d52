//! Per-cell cleaning rules shared by every entity normalizer.
//!
//! Every rule is pure and never fails: a value that cannot be coerced turns
//! into an absent value or a default, and [`FieldReader`] records which
//! fallback was taken.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{FieldIssue, FieldIssues};
use crate::constants::{known_statuses, STATUS_PENDING};
use crate::pipeline::ingestion::RawRow;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid regex"));

/// Fixed date patterns, tried in this order. The first match wins, so an
/// ambiguous value like `01-02-2024` is read day-first.
pub const DATE_PATTERNS: [&str; 5] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%m/%d/%Y"];

// Day-first forms come before month-first ones, as in DATE_PATTERNS
const FALLBACK_DATETIME_PATTERNS: [&str; 15] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d %b %Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const FALLBACK_OFFSET_PATTERNS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

const FALLBACK_DATE_PATTERNS: [&str; 10] = [
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%Y%m%d",
];

/// Trim a free-text cell; absent becomes the empty string.
pub fn clean_text(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Keep only the digits of a contact number. No digits at all means no contact.
pub fn clean_phone(value: Option<&str>) -> Option<String> {
    let digits = NON_DIGIT.replace_all(value?, "");
    if digits.is_empty() {
        None
    } else {
        Some(digits.into_owned())
    }
}

/// Coerce an identity cell to an integer. Integral decimals (`"12.0"`) are accepted.
pub fn parse_id(value: Option<&str>) -> Option<i64> {
    let v = value?.trim();
    if let Ok(n) = v.parse::<i64>() {
        return Some(n);
    }
    let f = v.parse::<f64>().ok()?;
    if f.fract() == 0.0 {
        float_to_i64(f)
    } else {
        None
    }
}

// `as` saturates, so out-of-range floats are rejected first. 2^63 itself is out of range.
fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Outcome of quantity coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Parsed(i64),
    /// Absent or not a number, defaulted to 0
    Defaulted,
    /// Numeric but below zero, clamped to 0
    Clamped,
}

impl Quantity {
    pub fn value(self) -> i64 {
        match self {
            Quantity::Parsed(n) => n,
            Quantity::Defaulted | Quantity::Clamped => 0,
        }
    }
}

/// Coerce a quantity cell: numeric values truncate toward zero, anything else becomes 0.
pub fn parse_quantity(value: Option<&str>) -> Quantity {
    let Some(v) = value.map(str::trim) else {
        return Quantity::Defaulted;
    };
    let n = match v.parse::<i64>() {
        Ok(n) => n,
        Err(_) => match v.parse::<f64>().map(f64::trunc) {
            Ok(f) => match float_to_i64(f) {
                Some(n) => n,
                None if f < 0.0 => return Quantity::Clamped,
                None => return Quantity::Defaulted,
            },
            Err(_) => return Quantity::Defaulted,
        },
    };
    if n < 0 {
        Quantity::Clamped
    } else {
        Quantity::Parsed(n)
    }
}

/// Parse a date cell using the fixed pattern list, then the general fallback.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let v = value?.trim();
    if v.is_empty() {
        return None;
    }

    DATE_PATTERNS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
        .or_else(|| parse_date_fallback(v))
}

/// General-purpose interpretation of date and date-time strings. Only the date part is kept.
pub fn parse_date_fallback(v: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(v) {
        return Some(dt.date_naive());
    }
    if let Some(dt) = FALLBACK_OFFSET_PATTERNS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(v, fmt).ok())
    {
        return Some(dt.date_naive());
    }
    if let Some(dt) = FALLBACK_DATETIME_PATTERNS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
    {
        return Some(dt.date());
    }
    FALLBACK_DATE_PATTERNS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
}

/// Trim a status cell; absent or blank becomes `Pending`.
pub fn clean_status(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => STATUS_PENDING.to_string(),
    }
}

/// Reads typed fields out of a raw row while collecting the fallbacks it had to take.
pub struct FieldReader<'a> {
    row: &'a RawRow,
    issues: FieldIssues,
}

impl<'a> FieldReader<'a> {
    pub fn new(row: &'a RawRow) -> Self {
        Self {
            row,
            issues: FieldIssues::default(),
        }
    }

    fn cell(&mut self, column: &'static str) -> Option<&'a str> {
        if !self.row.has_column(column) {
            self.issues.push(FieldIssue::MissingColumn { column });
        }
        self.row.get(column)
    }

    /// Identity column: failure is reported as an [`FieldIssue::InvalidId`]
    pub fn id(&mut self, column: &'static str) -> Option<i64> {
        let raw = self.cell(column);
        let id = parse_id(raw);
        if id.is_none() {
            self.issues.push(FieldIssue::InvalidId {
                column,
                value: raw.unwrap_or_default().to_string(),
            });
        }
        id
    }

    /// Optional foreign key: absent is fine, garbage is reported
    pub fn reference(&mut self, column: &'static str) -> Option<i64> {
        let raw = self.cell(column);
        let id = parse_id(raw);
        if let (None, Some(value)) = (id, raw) {
            self.issues.push(FieldIssue::InvalidReference {
                column,
                value: value.to_string(),
            });
        }
        id
    }

    pub fn text(&mut self, column: &'static str) -> String {
        clean_text(self.cell(column))
    }

    pub fn phone(&mut self, column: &'static str) -> Option<String> {
        let raw = self.cell(column);
        let contact = clean_phone(raw);
        if let (None, Some(value)) = (&contact, raw) {
            self.issues.push(FieldIssue::InvalidContact {
                column,
                value: value.to_string(),
            });
        }
        contact
    }

    pub fn quantity(&mut self, column: &'static str) -> i64 {
        let raw = self.cell(column);
        let quantity = parse_quantity(raw);
        match quantity {
            Quantity::Parsed(_) => {}
            Quantity::Defaulted => self.issues.push(FieldIssue::InvalidQuantity {
                value: raw.map(str::to_string),
            }),
            Quantity::Clamped => self.issues.push(FieldIssue::NegativeQuantity {
                value: raw.unwrap_or_default().to_string(),
            }),
        }
        quantity.value()
    }

    pub fn date(&mut self, column: &'static str) -> Option<NaiveDate> {
        let raw = self.cell(column);
        let date = parse_date(raw);
        if let (None, Some(value)) = (date, raw) {
            self.issues.push(FieldIssue::UnparseableDate {
                column,
                value: value.to_string(),
            });
        }
        date
    }

    pub fn status(&mut self, column: &'static str) -> String {
        let raw = self.cell(column);
        let status = clean_status(raw);
        if raw.is_none() {
            self.issues.push(FieldIssue::DefaultedStatus);
        } else if !known_statuses().contains(&status.as_str()) {
            self.issues.push(FieldIssue::UnknownStatus {
                value: status.clone(),
            });
        }
        status
    }

    pub fn finish(self) -> FieldIssues {
        self.issues
    }
}
