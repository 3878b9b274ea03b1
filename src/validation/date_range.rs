use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dates::days_between_dates;

pub const MAX_RANGE_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.from.zip(self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("Zakres dat jest wymagany")]
    Required,

    #[error("Data początkowa musi być wcześniejsza lub równa dacie końcowej")]
    StartAfterEnd,

    #[error("Zakres nie może przekraczać 31 dni")]
    TooLong,

    #[error("Nie można wybierać dat z przyszłości")]
    FutureDate,
}

/// Rules are checked in order and the first failure wins. `today` is the
/// caller's current calendar date; any date up to and including it is
/// accepted.
pub fn validate_date_range(range: &DateRange, today: NaiveDate) -> Result<(), DateRangeError> {
    let Some((from, to)) = range.bounds() else {
        return Err(DateRangeError::Required);
    };

    if from > to {
        return Err(DateRangeError::StartAfterEnd);
    }

    if days_between_dates(from, to) > MAX_RANGE_DAYS {
        return Err(DateRangeError::TooLong);
    }

    if from > today || to > today {
        return Err(DateRangeError::FutureDate);
    }

    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
    }
}

pub fn validate_form(range: &DateRange, today: NaiveDate) -> FormErrors {
    FormErrors {
        date_range: validate_date_range(range, today)
            .err()
            .map(|err| err.to_string()),
    }
}
