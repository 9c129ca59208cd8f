//! Timestamp extraction for canonical rows.

use crate::constants::TIMESTAMP_ALIASES;
use crate::models::{CanonicalRow, CellValue, TimestampSource};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Resolve the reading timestamp from the first parseable alias column,
/// falling back to the ingestion instant
pub fn extract_timestamp(
    row: &CanonicalRow,
    ingested_at: DateTime<Utc>,
) -> (DateTime<Utc>, TimestampSource) {
    TIMESTAMP_ALIASES
        .iter()
        .filter_map(|alias| match row.get(alias) {
            Some(CellValue::Text(text)) if !text.trim().is_empty() => parse_timestamp(text),
            _ => None,
        })
        .next()
        .map(|ts| (ts, TimestampSource::Column))
        .unwrap_or((ingested_at, TimestampSource::Ingestion))
}

/// Parse a timestamp string; zone-less values are read as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ingest_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_supported_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-10T18:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T19:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10 18:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10 18:00"), Some(expected));
        assert_eq!(parse_timestamp("03/10/2024 18:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-10"),
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("18.00.00"), None);
    }

    #[test]
    fn test_alias_priority_and_fallback() {
        let row: CanonicalRow = [("date", "2024-01-02"), ("timestamp", "2024-01-01 06:00:00")]
            .into_iter()
            .collect();
        let (ts, source) = extract_timestamp(&row, ingest_time());
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap());
        assert_eq!(source, TimestampSource::Column);

        // an unparseable alias gives way to the next one
        let row: CanonicalRow = [("time", "18.00.00"), ("date", "2024-01-02")]
            .into_iter()
            .collect();
        let (ts, _) = extract_timestamp(&row, ingest_time());
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());

        let row: CanonicalRow = [("ph", "7.0")].into_iter().collect();
        assert_eq!(
            extract_timestamp(&row, ingest_time()),
            (ingest_time(), TimestampSource::Ingestion)
        );
    }
}
