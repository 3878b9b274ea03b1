use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::repository::{AssignmentFilter, AssignmentRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Driver,
    Vehicle,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Driver => "driver",
            Subject::Vehicle => "vehicle",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapConflict {
    pub subject: Subject,
    pub assignment_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Closed-interval intersection where a missing end extends to infinity.
pub fn intervals_overlap(
    s1: NaiveDate,
    e1: Option<NaiveDate>,
    s2: NaiveDate,
    e2: Option<NaiveDate>,
) -> bool {
    e2.is_none_or(|e2| s1 <= e2) && e1.is_none_or(|e1| e1 >= s2)
}

/// Finds the first assignment of `subject_id` in the company whose interval
/// intersects `[start, end]`. `exclude_id` skips the row being updated.
pub async fn check_overlap(
    repo: &dyn AssignmentRepository,
    company_id: Uuid,
    subject: Subject,
    subject_id: Uuid,
    start: NaiveDate,
    end: Option<NaiveDate>,
    exclude_id: Option<Uuid>,
) -> Result<Option<OverlapConflict>, AppError> {
    let mut filter = AssignmentFilter {
        exclude_id,
        ..AssignmentFilter::default()
    };
    match subject {
        Subject::Driver => filter.driver_id = Some(subject_id),
        Subject::Vehicle => filter.vehicle_id = Some(subject_id),
    }

    let existing = repo.list(company_id, &filter).await?;

    Ok(existing
        .into_iter()
        .find(|row| intervals_overlap(row.start_date, row.end_date, start, end))
        .map(|row| OverlapConflict {
            subject,
            assignment_id: row.id,
            start_date: row.start_date,
            end_date: row.end_date,
        }))
}
