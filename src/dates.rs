// 📅 Date Range Resolver
// Normalizes the start/end dates of a transaction query

use crate::error::{DateField, ValidationError};
use crate::models::ResolvedRange;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;

/// Days covered by a query that omits `start_date`
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolve a range against today's UTC date
pub fn resolve(raw_start: Option<&str>, raw_end: Option<&str>) -> Result<ResolvedRange, ValidationError> {
    resolve_at(Utc::now().date_naive(), raw_start, raw_end)
}

/// Resolve a range against an explicit "today".
///
/// Each side is validated on its own; `start <= end` is not checked.
pub fn resolve_at(
    today: NaiveDate,
    raw_start: Option<&str>,
    raw_end: Option<&str>,
) -> Result<ResolvedRange, ValidationError> {
    let start = resolve_side(DateField::Start, raw_start, today - Duration::days(DEFAULT_LOOKBACK_DAYS))?;
    let end = resolve_side(DateField::End, raw_end, today)?;

    Ok(ResolvedRange { start, end })
}

/// Same as [`resolve_at`] for dates taken straight from a JSON body
pub fn resolve_json_at(
    today: NaiveDate,
    start: Option<&Value>,
    end: Option<&Value>,
) -> Result<ResolvedRange, ValidationError> {
    let start = resolve_side(
        DateField::Start,
        raw_date(DateField::Start, start)?,
        today - Duration::days(DEFAULT_LOOKBACK_DAYS),
    )?;
    let end = resolve_side(DateField::End, raw_date(DateField::End, end)?, today)?;

    Ok(ResolvedRange { start, end })
}

fn resolve_side(field: DateField, raw: Option<&str>, default: NaiveDate) -> Result<NaiveDate, ValidationError> {
    match raw.filter(|s| !s.is_empty()) {
        Some(raw) => parse_date(raw).ok_or(ValidationError::new(field)),
        None => Ok(default),
    }
}

/// Extract a raw date string from a JSON request field.
///
/// `null` and a missing field are both absent; any non-string value is
/// rejected with the field's validation error.
pub fn raw_date(field: DateField, value: Option<&Value>) -> Result<Option<&str>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ValidationError::new(field)),
    }
}

/// Strict `YYYY-MM-DD`: chrono alone would accept single-digit months and days
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }

    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}
