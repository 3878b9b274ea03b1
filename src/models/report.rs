use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Completed,
    PartiallyCompleted,
    NotCompleted,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Completed => "completed",
            RouteStatus::PartiallyCompleted => "partially_completed",
            RouteStatus::NotCompleted => "not_completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteReport {
    #[serde(rename = "uuid")]
    pub id: Uuid,
    #[serde(skip)]
    pub company_id: Uuid,
    #[serde(rename = "driverUuid")]
    pub driver_id: Uuid,
    #[serde(rename = "vehicleUuid")]
    pub vehicle_id: Option<Uuid>,
    pub report_date: NaiveDate,
    pub status: RouteStatus,
    pub delay_minutes: Option<u32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
