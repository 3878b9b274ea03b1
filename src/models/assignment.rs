use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    #[serde(skip)]
    pub company_id: Uuid,
    #[serde(rename = "driverUuid")]
    pub driver_id: Uuid,
    #[serde(rename = "vehicleUuid")]
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.start_date <= day && self.end_date.is_none_or(|end| end >= day)
    }
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub company_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Partial update. `end_date: Some(None)` reopens the assignment.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPatch {
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
}

impl AssignmentPatch {
    pub fn apply_to(&self, assignment: &mut Assignment) {
        if let Some(driver_id) = self.driver_id {
            assignment.driver_id = driver_id;
        }
        if let Some(vehicle_id) = self.vehicle_id {
            assignment.vehicle_id = vehicle_id;
        }
        if let Some(start_date) = self.start_date {
            assignment.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            assignment.end_date = end_date;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentEventKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEvent {
    #[serde(skip)]
    pub company_id: Uuid,
    pub kind: AssignmentEventKind,
    pub assignment: Assignment,
}
