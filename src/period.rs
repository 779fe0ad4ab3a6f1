use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid period format '{0}', expected YYYY-MM")]
    InvalidPeriodFormat(String),
    #[error("invalid quarter {0}, expected 1-4")]
    InvalidQuarter(u32),
}

fn period_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("static period regex"))
}

/// A calendar month, the unit of a monthly submission.
///
/// Ordering follows `(year, month)`, which matches the lexicographic order of
/// the `YYYY-MM` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(PeriodError::InvalidPeriodFormat(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn parse(raw: &str) -> Result<Self, PeriodError> {
        let caps = period_pattern()
            .captures(raw)
            .ok_or_else(|| PeriodError::InvalidPeriodFormat(raw.to_string()))?;

        let year: i32 = caps[1]
            .parse()
            .map_err(|_| PeriodError::InvalidPeriodFormat(raw.to_string()))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| PeriodError::InvalidPeriodFormat(raw.to_string()))?;

        Self::new(year, month).map_err(|_| PeriodError::InvalidPeriodFormat(raw.to_string()))
    }

    /// The month containing `date`; pass today's date to get the current reporting period.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn quarter(&self) -> Quarter {
        match self.month {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn from_number(number: u32) -> Result<Self, PeriodError> {
        match number {
            1 => Ok(Quarter::Q1),
            2 => Ok(Quarter::Q2),
            3 => Ok(Quarter::Q3),
            4 => Ok(Quarter::Q4),
            other => Err(PeriodError::InvalidQuarter(other)),
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    pub fn months(&self) -> [u32; 3] {
        let first = (self.number() - 1) * 3 + 1;
        [first, first + 1, first + 2]
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_periods() {
        let period = Period::parse("2024-09").unwrap();
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 9);
        assert_eq!(period.to_string(), "2024-09");
    }

    #[test]
    fn rejects_malformed_periods() {
        for raw in ["2024-9", "24-09", "2024/09", "2024-13", "2024-00", "2024-09-01", ""] {
            assert_eq!(
                Period::parse(raw),
                Err(PeriodError::InvalidPeriodFormat(raw.to_string())),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn ordering_matches_key_order() {
        let mut periods = vec![
            Period::parse("2024-10").unwrap(),
            Period::parse("2023-12").unwrap(),
            Period::parse("2024-02").unwrap(),
        ];
        periods.sort();
        let keys: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(keys, vec!["2023-12", "2024-02", "2024-10"]);
    }

    #[test]
    fn months_fall_into_fixed_quarters() {
        assert_eq!(Period::parse("2024-03").unwrap().quarter(), Quarter::Q1);
        assert_eq!(Period::parse("2024-04").unwrap().quarter(), Quarter::Q2);
        assert_eq!(Period::parse("2024-09").unwrap().quarter(), Quarter::Q3);
        assert_eq!(Period::parse("2024-12").unwrap().quarter(), Quarter::Q4);
        assert_eq!(Quarter::Q3.months(), [7, 8, 9]);
    }

    #[test]
    fn quarter_numbers_outside_range_fail() {
        assert_eq!(Quarter::from_number(4), Ok(Quarter::Q4));
        assert_eq!(Quarter::from_number(0), Err(PeriodError::InvalidQuarter(0)));
        assert_eq!(Quarter::from_number(5), Err(PeriodError::InvalidQuarter(5)));
    }

    #[test]
    fn reference_period_comes_from_date() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 19).unwrap();
        assert_eq!(Period::from_date(date).to_string(), "2025-10");
    }

    #[test]
    fn deserializes_from_string_key() {
        let period: Period = serde_json::from_str("\"2024-01\"").unwrap();
        assert_eq!(period, Period::parse("2024-01").unwrap());
        assert!(serde_json::from_str::<Period>("\"January 2024\"").is_err());
    }
}
