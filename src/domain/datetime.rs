use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use super::{DomainError, DomainResult};

/// ISO 8601 representation of an instant.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Human-readable form used in listings and reports, e.g. `05/03/23 às 14:30`.
pub fn timestamp_to_str(ts: DateTime<Utc>, include_seconds: bool) -> String {
    let pattern = if include_seconds {
        "%d/%m/%y às %H:%M:%S"
    } else {
        "%d/%m/%y às %H:%M"
    };
    ts.format(pattern).to_string()
}

/// Parses a full RFC 3339 instant or a bare `YYYY-MM-DD` date. A bare date
/// means the end of that day.
pub fn parse_due_date(input: &str) -> DomainResult<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DomainError::InvalidDate(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_to_str() {
        let ts = Utc.with_ymd_and_hms(2023, 3, 5, 14, 30, 9).unwrap();
        assert_eq!(timestamp_to_str(ts, false), "05/03/23 às 14:30");
        assert_eq!(timestamp_to_str(ts, true), "05/03/23 às 14:30:09");
    }

    #[test]
    fn test_timestamp_is_iso() {
        let ts = Utc.with_ymd_and_hms(2023, 3, 5, 14, 30, 9).unwrap();
        assert_eq!(timestamp(ts), "2023-03-05T14:30:09Z");
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(
            parse_due_date("2023-03-05").unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 5, 23, 59, 59).unwrap()
        );
        assert_eq!(
            parse_due_date("2023-03-05T10:00:00-03:00").unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 5, 13, 0, 0).unwrap()
        );
        assert!(matches!(
            parse_due_date("next week"),
            Err(DomainError::InvalidDate(_))
        ));
    }
}
