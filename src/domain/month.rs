use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// Calendar month used to scope every ledger record, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, LedgerError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(LedgerError::InvalidMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Returns the month that contains `date`.
    pub fn of(date: NaiveDate) -> Self {
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

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || LedgerError::InvalidMonth(trimmed.to_string());
        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MonthKey {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_canonical_form() {
        let key: MonthKey = "2024-03".parse().unwrap();
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 3);
        assert_eq!(key.to_string(), "2024-03");
    }

    #[test]
    fn rejects_malformed_months() {
        for raw in ["2024-13", "2024-3", "24-03", "2024/03", "", "2024-00"] {
            assert!(raw.parse::<MonthKey>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn contains_only_dates_in_the_same_month() {
        let key = MonthKey::new(2024, 2).unwrap();
        assert!(key.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!key.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert_eq!(key.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn serializes_as_plain_string() {
        let key = MonthKey::new(2025, 11).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2025-11\"");
        let parsed: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }
}
