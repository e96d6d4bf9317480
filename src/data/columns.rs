use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::model::{Column, ColumnType, Entity};

// ---------------------------------------------------------------------------
// Cell parsing: raw string → typed value
// ---------------------------------------------------------------------------

const DATE_FORMATS: [&str; 2] = ["%d.%m.%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];

/// Parse a finite floating point number. Empty cells, text and the
/// `inf`/`NaN` spellings yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `"true"` / `"false"`, ignoring case and surrounding whitespace.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse a calendar date to epoch milliseconds at UTC midnight.
pub fn parse_date_millis(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Parse a timestamp: integer epoch millis, RFC 3339, or a naive UTC
/// date-time. Plain dates are accepted as midnight.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(millis) = s.parse::<i64>() {
        return Some(millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    parse_date_millis(s)
}

/// Parse a temporal cell according to its column type.
pub fn parse_millis(column_type: ColumnType, raw: &str) -> Option<i64> {
    match column_type {
        ColumnType::Date => parse_date_millis(raw),
        ColumnType::Timestamp => parse_timestamp_millis(raw),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Typed extraction
// ---------------------------------------------------------------------------

/// Numeric projection of a cell, used for axes, gradients and sorting.
/// Dates and timestamps project to epoch millis.
pub fn numeric_value(column: &Column, entity: &Entity) -> Option<f64> {
    let raw = entity.cell(column)?;
    match column.column_type {
        ColumnType::Number => parse_number(raw),
        ColumnType::Date | ColumnType::Timestamp => {
            parse_millis(column.column_type, raw).map(|m| m as f64)
        }
        ColumnType::Boolean => parse_bool(raw).map(|b| if b { 1.0 } else { 0.0 }),
        ColumnType::String | ColumnType::Category | ColumnType::Pid | ColumnType::Eid => None,
    }
}

/// Non-empty raw cell text, used for category-like columns.
pub fn text_value<'a>(column: &Column, entity: &'a Entity) -> Option<&'a str> {
    entity.cell(column).filter(|s| !s.is_empty())
}

/// Millis of a temporal cell.
pub fn millis_value(column: &Column, entity: &Entity) -> Option<i64> {
    entity
        .cell(column)
        .and_then(|raw| parse_millis(column.column_type, raw))
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

pub fn format_millis(column_type: ColumnType, millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) if column_type == ColumnType::Date => dt.format("%d.%m.%Y").to_string(),
        Some(dt) => dt.format("%d.%m.%Y %H:%M").to_string(),
        None => millis.to_string(),
    }
}

/// Human-readable cell for tooltips and scatter info.
pub fn format_cell(column_type: ColumnType, raw: &str) -> String {
    match column_type {
        ColumnType::Date | ColumnType::Timestamp => parse_millis(column_type, raw)
            .map(|m| format_millis(column_type, m))
            .unwrap_or_else(|| raw.to_string()),
        ColumnType::Number => parse_number(raw)
            .map(|v| {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{v:.0}")
                } else {
                    format!("{v:.2}")
                }
            })
            .unwrap_or_else(|| raw.to_string()),
        ColumnType::Boolean => parse_bool(raw)
            .map(|b| if b { "yes".to_string() } else { "no".to_string() })
            .unwrap_or_else(|| raw.to_string()),
        ColumnType::String | ColumnType::Category | ColumnType::Pid | ColumnType::Eid => {
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_in_utc() {
        assert_eq!(parse_date_millis("31.12.2019"), Some(1_577_750_400_000));
        assert_eq!(parse_date_millis("2019-12-31"), Some(1_577_750_400_000));
        assert_eq!(parse_date_millis("31/12/2019"), None);
        assert_eq!(parse_date_millis(""), None);
    }

    #[test]
    fn timestamps_accept_millis_and_iso() {
        assert_eq!(parse_timestamp_millis("1648555453169"), Some(1_648_555_453_169));
        assert_eq!(
            parse_timestamp_millis("2019-12-31T00:00:00Z"),
            Some(1_577_750_400_000)
        );
        assert_eq!(
            parse_timestamp_millis("2019-12-31 00:00:00"),
            Some(1_577_750_400_000)
        );
        assert_eq!(parse_timestamp_millis("soon"), None);
    }

    #[test]
    fn numbers_and_bools() {
        assert_eq!(parse_number(" 25 "), Some(25.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("-Infinity"), None);
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), None);
    }

    #[test]
    fn formats_dates_for_display() {
        assert_eq!(format_cell(ColumnType::Date, "2019-12-31"), "31.12.2019");
        assert_eq!(format_cell(ColumnType::Number, "31"), "31");
        assert_eq!(format_cell(ColumnType::Number, "31.256"), "31.26");
    }
}
