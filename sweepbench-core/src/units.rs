//! Unit Value Parsing
//!
//! Normalizes the textual time and percentage tokens emitted by native
//! benchmark executables (`"123.45 us"`, `"1000ns"`, `"50.5%"`) into a single
//! numeric unit. Times are always returned in microseconds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a unit-suffixed token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitParseError {
    #[error("Invalid numeric value '{number}' in token '{token}'")]
    InvalidNumber { token: String, number: String },
}

/// Unit attached to a parsed metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    /// Time in microseconds
    Microseconds,
    /// Dimensionless percentage (0-100)
    Percent,
    /// Throughput or count, reported as-is by the executable
    Rate,
}

/// A parsed value together with the unit it was normalized to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitValue {
    /// Normalized value
    pub value: f64,
    /// Unit of `value`
    pub unit: MetricUnit,
}

/// Time suffixes, longest first so `ns`/`us`/`ms` win over the bare `s`.
pub const TIME_SUFFIXES: [&str; 4] = ["ns", "us", "ms", "s"];

/// Parse a token into a value and its unit.
///
/// - `"50.5%"` → `50.5` percent
/// - `"1000 ns"` / `"1 ms"` / `"1 s"` / `"12 us"` → microseconds
/// - `"123.45"` → microseconds (no suffix means already in microseconds)
pub fn parse_unit_value(token: &str) -> Result<UnitValue, UnitParseError> {
    let trimmed = token.trim();

    if let Some(number) = trimmed.strip_suffix('%') {
        return Ok(UnitValue {
            value: parse_decimal(token, number)?,
            unit: MetricUnit::Percent,
        });
    }

    for suffix in TIME_SUFFIXES {
        if let Some(number) = trimmed.strip_suffix(suffix) {
            let value = parse_decimal(token, number)?;
            let value = match suffix {
                "ns" => value / 1_000.0,
                "ms" => value * 1_000.0,
                "s" => value * 1_000_000.0,
                _ => value,
            };
            return Ok(UnitValue {
                value,
                unit: MetricUnit::Microseconds,
            });
        }
    }

    Ok(UnitValue {
        value: parse_decimal(token, trimmed)?,
        unit: MetricUnit::Microseconds,
    })
}

/// Parse a time or percentage token, returning the bare number.
///
/// Times are converted to microseconds; percentages are returned unchanged.
pub fn parse_time_to_us(token: &str) -> Result<f64, UnitParseError> {
    parse_unit_value(token).map(|v| v.value)
}

/// Parse a percentage cell such as `"1.08%"`.
///
/// A bare number is accepted as an already-numeric percentage.
pub fn parse_percentage(token: &str) -> Result<f64, UnitParseError> {
    let trimmed = token.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_decimal(token, number)
}

fn parse_decimal(token: &str, number: &str) -> Result<f64, UnitParseError> {
    let number = number.trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| UnitParseError::InvalidNumber {
            token: token.to_string(),
            number: number.to_string(),
        })
}
