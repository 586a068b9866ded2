//! Course rating data and the client that fetches and submits it
//!
//! This module contains the rating types exchanged with the remote endpoint,
//! the normalization applied to untrusted responses, and the error taxonomy
//! of the rating client.

pub mod client;
pub mod fetch;

pub use client::{CacheInfo, RatingClient, UNKNOWN_IP};
pub use fetch::{fetch_with_retry, FetchError, RetryPolicy};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Highest star value
pub const MAX_STARS: u8 = 5;

/// Aggregate rating of a course
///
/// Both fields are always present. `average` stays within `[0, 5]` no
/// matter what the backend returns.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Mean star value, clamped to 0.0-5.0
    pub average: f64,
    /// Number of ratings received
    pub count: u64,
}

impl RatingSummary {
    /// The fallback returned whenever ratings cannot be obtained
    pub const EMPTY: Self = Self {
        average: 0.0,
        count: 0,
    };

    /// Builds a summary from a raw endpoint response
    ///
    /// Non-numeric fields become 0, `average` is clamped to `[0, 5]`, and
    /// `count` is truncated to an integer and floored at 0. A response that is
    /// not an object yields [`RatingSummary::EMPTY`].
    pub fn from_raw(raw: &Value) -> Self {
        let average = raw.get("average").map(parse_float).unwrap_or(0.0);
        let count = raw.get("count").map(parse_int).unwrap_or(0);

        Self {
            average: average.clamp(0.0, f64::from(MAX_STARS)),
            count: count.max(0) as u64,
        }
    }
}

/// A star value between 1 and 5 inclusive
///
/// "No selection" is represented as `Option<Rating>::None`, never as a zero
/// rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(MAX_STARS);

    /// Validates a raw star value
    pub fn new(value: u8) -> Option<Self> {
        (1..=MAX_STARS).contains(&value).then_some(Self(value))
    }

    /// The star value as a number
    pub fn value(self) -> u8 {
        self.0
    }

    /// The next higher rating, staying at 5
    pub fn increment(self) -> Self {
        Self((self.0 + 1).min(Self::MAX.0))
    }

    /// The next lower rating, staying at 1
    pub fn decrement(self) -> Self {
        Self((self.0 - 1).max(Self::MIN.0))
    }
}

/// Outcome reported by the endpoint for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Success,
    Error,
}

/// Result of submitting a rating
///
/// Produced by the remote endpoint, or synthesized locally when validation
/// or the network call fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    /// Human-readable explanation, present on errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmissionResult {
    /// A successful submission without a message
    pub fn success() -> Self {
        Self {
            status: SubmissionStatus::Success,
            message: None,
        }
    }

    /// A failed submission with an explanation
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SubmissionStatus::Success
    }
}

/// Errors raised inside the rating client
///
/// None of these reach callers of [`RatingClient`]; they are logged and
/// converted into a safe default or an error [`SubmissionResult`].
#[derive(Debug, Error)]
pub enum RatingError {
    /// Course id missing or rating outside 1-5; no request was made
    #[error("Invalid course ID or rating value")]
    Validation,

    /// The request failed after exhausting its retries
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reads a JSON value as a float the way a lenient form parser would
///
/// Numbers pass through, strings contribute their leading numeric prefix,
/// and anything else (or NaN) becomes 0.
fn parse_float(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => float_prefix(s).unwrap_or(0.0),
        _ => 0.0,
    };
    if parsed.is_nan() {
        0.0
    } else {
        parsed
    }
}

/// Reads a JSON value as an integer, truncating fractions toward zero
fn parse_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => int_prefix(s).unwrap_or(0),
        _ => 0,
    }
}

/// Longest leading decimal literal of `s`, ignoring leading whitespace
fn float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return None;
    }

    // Optional exponent, only consumed when it has digits
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Leading signed integer of `s`, ignoring leading whitespace
fn int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }

    // Saturate absurdly long digit runs instead of failing
    s[..end].parse().ok().or(Some(if bytes[0] == b'-' {
        i64::MIN
    } else {
        i64::MAX
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_passes_through_valid_values() {
        let summary = RatingSummary::from_raw(&json!({"average": 4.25, "count": 12}));
        assert!((summary.average - 4.25).abs() < f64::EPSILON);
        assert_eq!(summary.count, 12);
    }

    #[test]
    fn test_summary_clamps_out_of_range_values() {
        let high = RatingSummary::from_raw(&json!({"average": 7.3, "count": -4}));
        assert_eq!(high.average, 5.0);
        assert_eq!(high.count, 0);

        let low = RatingSummary::from_raw(&json!({"average": -2, "count": 3}));
        assert_eq!(low.average, 0.0);
        assert_eq!(low.count, 3);
    }

    #[test]
    fn test_summary_treats_non_numeric_as_zero() {
        let summary = RatingSummary::from_raw(&json!({"average": "n/a", "count": true}));
        assert_eq!(summary, RatingSummary::EMPTY);

        let missing = RatingSummary::from_raw(&json!({}));
        assert_eq!(missing, RatingSummary::EMPTY);

        let not_object = RatingSummary::from_raw(&json!(["average", 4]));
        assert_eq!(not_object, RatingSummary::EMPTY);
    }

    #[test]
    fn test_summary_parses_numeric_strings_leniently() {
        let summary = RatingSummary::from_raw(&json!({"average": " 3.5 stars", "count": "17.9"}));
        assert!((summary.average - 3.5).abs() < f64::EPSILON);
        assert_eq!(summary.count, 17);
    }

    #[test]
    fn test_summary_truncates_fractional_count() {
        let summary = RatingSummary::from_raw(&json!({"average": 2, "count": 9.99}));
        assert_eq!(summary.count, 9);
    }

    #[test]
    fn test_float_prefix() {
        assert_eq!(float_prefix("4.5"), Some(4.5));
        assert_eq!(float_prefix("-1"), Some(-1.0));
        assert_eq!(float_prefix(".5x"), Some(0.5));
        assert_eq!(float_prefix("2e1"), Some(20.0));
        assert_eq!(float_prefix("2e"), Some(2.0));
        assert_eq!(float_prefix("."), None);
        assert_eq!(float_prefix("abc"), None);
        assert_eq!(float_prefix(""), None);
    }

    #[test]
    fn test_int_prefix() {
        assert_eq!(int_prefix("42abc"), Some(42));
        assert_eq!(int_prefix("-3"), Some(-3));
        assert_eq!(int_prefix("x1"), None);
        assert_eq!(int_prefix("99999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert!(Rating::new(6).is_none());
        assert_eq!(Rating::new(1).map(Rating::value), Some(1));
        assert_eq!(Rating::new(5).map(Rating::value), Some(5));
    }

    #[test]
    fn test_rating_step_is_clamped() {
        let five = Rating::MAX;
        let one = Rating::MIN;
        assert_eq!(five.increment(), five);
        assert_eq!(one.decrement(), one);
        assert_eq!(one.increment().value(), 2);
    }

    #[test]
    fn test_submission_result_parses_endpoint_json() {
        let ok: SubmissionResult = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(ok.is_success());
        assert!(ok.message.is_none());

        let err: SubmissionResult =
            serde_json::from_str(r#"{"status":"error","message":"Duplicate rating"}"#).unwrap();
        assert_eq!(err.status, SubmissionStatus::Error);
        assert_eq!(err.message.as_deref(), Some("Duplicate rating"));
    }

    #[test]
    fn test_submission_result_rejects_unknown_status() {
        let result: Result<SubmissionResult, _> = serde_json::from_str(r#"{"status":"maybe"}"#);
        assert!(result.is_err());
    }
}
