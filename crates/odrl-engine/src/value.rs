//! Typed operand values and operator semantics.
//!
//! World facts and document literals are plain strings. They are coerced into
//! a [`Scalar`] of the constraint's data type right before comparison, so a
//! value that does not fit the data type surfaces as a coercion failure rather
//! than a silent string comparison.

use crate::types::{odrl_term, DataType, Operator};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// A coerced operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Dec(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    /// Duration in milliseconds.
    Duration(i64),
}

impl Scalar {
    /// Coerces a raw string into the given data type.
    pub fn coerce(raw: &str, data_type: DataType) -> Option<Self> {
        let raw = raw.trim();
        match data_type {
            DataType::String => Some(Scalar::Str(raw.to_string())),
            DataType::Integer => raw
                .parse::<i64>()
                .ok()
                .map(Scalar::Int)
                .or_else(|| parse_duration_millis(raw).map(Scalar::Int)),
            DataType::Decimal => raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(Scalar::Dec),
            DataType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Scalar::Bool(true)),
                "false" | "0" => Some(Scalar::Bool(false)),
                _ => None,
            },
            DataType::Date => parse_date(raw).map(Scalar::Date),
            DataType::Time => parse_time(raw).map(Scalar::Time),
            DataType::DateTime => parse_datetime(raw).map(Scalar::DateTime),
            DataType::Duration => parse_duration_millis(raw)
                .or_else(|| raw.parse::<i64>().ok().map(|secs| secs.saturating_mul(1000)))
                .map(Scalar::Duration),
        }
    }

    /// Compares two scalars of the same variant. `None` when they cannot be ordered.
    pub fn partial_order(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::Dec(a), Scalar::Dec(b)) => {
                if (a - b).abs() < f64::EPSILON {
                    Some(Ordering::Equal)
                } else {
                    a.partial_cmp(b)
                }
            }
            (Scalar::Date(a), Scalar::Date(b)) => Some(a.cmp(b)),
            (Scalar::Time(a), Scalar::Time(b)) => Some(a.cmp(b)),
            (Scalar::DateTime(a), Scalar::DateTime(b)) => Some(a.cmp(b)),
            (Scalar::Duration(a), Scalar::Duration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality under the data type's notion of sameness.
    pub fn same_as(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            _ => self.partial_order(other) == Some(Ordering::Equal),
        }
    }
}

/// Applies a comparison operator. `None` means the operator is not defined for the values.
pub fn compare(operator: Operator, left: &Scalar, right: &Scalar) -> Option<bool> {
    match operator {
        Operator::Eq => Some(left.same_as(right)),
        Operator::Neq => Some(!left.same_as(right)),
        Operator::Lt => left.partial_order(right).map(|o| o == Ordering::Less),
        Operator::Lteq => left.partial_order(right).map(|o| o != Ordering::Greater),
        Operator::Gt => left.partial_order(right).map(|o| o == Ordering::Greater),
        Operator::Gteq => left.partial_order(right).map(|o| o != Ordering::Less),
        _ => None,
    }
}

/// Applies a set-based operator over element lists.
///
/// Elements are compared as `data_type` values when both sides coerce, and as
/// trimmed strings otherwise.
pub fn compare_sets(
    operator: Operator,
    left: &[String],
    right: &[String],
    data_type: DataType,
) -> Option<bool> {
    let contains = |set: &[String], item: &str| set.iter().any(|candidate| element_eq(candidate, item, data_type));

    match operator {
        Operator::IsA | Operator::IsPartOf | Operator::IsAllOf => {
            Some(!left.is_empty() && left.iter().all(|l| contains(right, l)))
        }
        Operator::HasPart => Some(!right.is_empty() && right.iter().all(|r| contains(left, r))),
        Operator::IsAnyOf => Some(left.iter().any(|l| contains(right, l))),
        Operator::IsNoneOf => Some(!left.iter().any(|l| contains(right, l))),
        _ => None,
    }
}

fn element_eq(a: &str, b: &str, data_type: DataType) -> bool {
    match (Scalar::coerce(a, data_type), Scalar::coerce(b, data_type)) {
        (Some(x), Some(y)) => x.same_as(&y),
        _ => a.trim() == b.trim(),
    }
}

/// Splits a world-sourced value into set elements.
///
/// Accepts a JSON array of strings/numbers or a comma-separated list.
pub fn split_set(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return items
                .iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    serde_json::Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect();
        }
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks a data type when the constraint does not declare one.
pub fn infer_data_type(left_operand: &str, left: &str, right: &str) -> DataType {
    let term = odrl_term(left_operand).unwrap_or_default().to_ascii_lowercase();
    match term.as_str() {
        "datetime" | "absolutetemporalposition" | "timeinterval" => return DataType::DateTime,
        "date" => return DataType::Date,
        "time" => return DataType::Time,
        _ => {}
    }
    if matches!(term.as_str(), "elapsedtime" | "delayperiod" | "meteredtime") {
        return DataType::Duration;
    }
    if left.trim().parse::<i64>().is_ok() && right.trim().parse::<i64>().is_ok() {
        return DataType::Integer;
    }
    if left.trim().parse::<f64>().is_ok() && right.trim().parse::<f64>().is_ok() {
        return DataType::Decimal;
    }
    DataType::String
}

/// Parses the temporal literal formats accepted by the engine into UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    // Epoch milliseconds, as produced by clocks on the host side.
    raw.parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date_naive()))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S%.f"))
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.time()))
}

fn duration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            let num = r"(\d+(?:\.\d+)?)";
            let pattern = format!(
                r"^(-)?P(?:{num}Y)?(?:{num}M)?(?:{num}W)?(?:{num}D)?(?:T(?:{num}H)?(?:{num}M)?(?:{num}S)?)?$"
            );
            Regex::new(&pattern).ok()
        })
        .as_ref()
}

/// Parses an XSD duration (`P1Y2M3DT4H5M6S`) into milliseconds.
pub fn parse_duration_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.ends_with('P') || raw.ends_with('T') {
        return None;
    }
    let caps = duration_pattern()?.captures(raw)?;
    let field = |idx: usize| -> f64 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let seconds = field(2) * 365.25 * SECONDS_PER_DAY
        + field(3) * 30.44 * SECONDS_PER_DAY
        + field(4) * 7.0 * SECONDS_PER_DAY
        + field(5) * SECONDS_PER_DAY
        + field(6) * 3600.0
        + field(7) * 60.0
        + field(8);
    let millis = (seconds * 1000.0).round() as i64;
    Some(if caps.get(1).is_some() { -millis } else { millis })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_formats_agree() {
        let a = parse_datetime("2025-12-31").unwrap();
        let b = parse_datetime("2025-12-31 00:00:00").unwrap();
        let c = parse_datetime("2025-12-31T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(parse_datetime(&a.timestamp_millis().to_string()), Some(a));
        assert!(parse_datetime("not a date").is_none());
    }

    #[test]
    fn test_datetime_ordering() {
        let now = Scalar::coerce("2024-01-01", DataType::DateTime).unwrap();
        let limit = Scalar::coerce("2025-12-31", DataType::DateTime).unwrap();
        assert_eq!(compare(Operator::Lt, &now, &limit), Some(true));
        assert_eq!(compare(Operator::Gteq, &now, &limit), Some(false));
    }

    #[test]
    fn test_duration() {
        assert_eq!(parse_duration_millis("PT1H"), Some(3_600_000));
        assert_eq!(parse_duration_millis("P1DT30M"), Some(86_400_000 + 1_800_000));
        assert_eq!(parse_duration_millis("-PT10S"), Some(-10_000));
        assert_eq!(parse_duration_millis("P"), None);
        assert_eq!(parse_duration_millis("PT"), None);
        assert_eq!(parse_duration_millis("1H"), None);
    }

    #[test]
    fn test_integer_falls_back_to_duration() {
        assert_eq!(Scalar::coerce("PT2S", DataType::Integer), Some(Scalar::Int(2000)));
        assert_eq!(Scalar::coerce("abc", DataType::Integer), None);
    }

    #[test]
    fn test_ordering_undefined_for_strings() {
        let a = Scalar::coerce("alpha", DataType::String).unwrap();
        let b = Scalar::coerce("beta", DataType::String).unwrap();
        assert_eq!(compare(Operator::Lt, &a, &b), None);
        assert_eq!(compare(Operator::Neq, &a, &b), Some(true));
    }

    #[test]
    fn test_decimal_equality_tolerance() {
        let a = Scalar::coerce("0.3", DataType::Decimal).unwrap();
        let b = Scalar::Dec(0.1 + 0.2);
        assert_eq!(compare(Operator::Eq, &a, &b), Some(true));
    }

    #[test]
    fn test_set_operators() {
        let left = vec!["en".to_string(), "fr".to_string()];
        let right = vec!["en".to_string(), "fr".to_string(), "de".to_string()];
        assert_eq!(compare_sets(Operator::IsAllOf, &left, &right, DataType::String), Some(true));
        assert_eq!(compare_sets(Operator::HasPart, &right, &left, DataType::String), Some(true));
        assert_eq!(compare_sets(Operator::HasPart, &left, &right, DataType::String), Some(false));
        assert_eq!(compare_sets(Operator::IsNoneOf, &["it".to_string()], &right, DataType::String), Some(true));
        assert_eq!(compare_sets(Operator::IsAnyOf, &["de".to_string()], &right, DataType::String), Some(true));
    }

    #[test]
    fn test_set_elements_compare_by_type() {
        let left = vec!["01".to_string()];
        let right = vec!["1".to_string(), "2".to_string()];
        assert_eq!(compare_sets(Operator::IsAnyOf, &left, &right, DataType::Integer), Some(true));
        assert_eq!(compare_sets(Operator::IsAnyOf, &left, &right, DataType::String), Some(false));
    }

    #[test]
    fn test_split_set() {
        assert_eq!(split_set("a, b,,c"), vec!["a", "b", "c"]);
        assert_eq!(split_set(r#"["x", 2]"#), vec!["x", "2"]);
    }

    #[test]
    fn test_infer_data_type() {
        assert_eq!(infer_data_type("dateTime", "2024-01-01", "2025-01-01"), DataType::DateTime);
        assert_eq!(infer_data_type("time", "09:00:00", "17:30:00"), DataType::Time);
        assert_eq!(infer_data_type("odrl:count", "3", "10"), DataType::Integer);
        assert_eq!(infer_data_type("payAmount", "3.5", "10"), DataType::Decimal);
        assert_eq!(infer_data_type("purpose", "research", "10"), DataType::String);
    }
}
