pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentPatch, NewAssignment};
use crate::models::driver::Driver;
use crate::models::report::RouteReport;
use crate::models::vehicle::Vehicle;

pub use memory::MemoryStore;

#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub active_on: Option<NaiveDate>,
    pub exclude_id: Option<Uuid>,
}

impl AssignmentFilter {
    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.driver_id.is_none_or(|id| assignment.driver_id == id)
            && self.vehicle_id.is_none_or(|id| assignment.vehicle_id == id)
            && self.active_on.is_none_or(|day| assignment.is_active_on(day))
            && self.exclude_id.is_none_or(|id| assignment.id != id)
    }
}

/// Company-scoped assignment storage. Every method only sees rows owned by
/// `company_id`. `list` returns rows in a stable store order.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn list(
        &self,
        company_id: Uuid,
        filter: &AssignmentFilter,
    ) -> Result<Vec<Assignment>, AppError>;
    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Assignment>, AppError>;
    async fn insert(&self, new: NewAssignment) -> Result<Assignment, AppError>;
    async fn patch(
        &self,
        company_id: Uuid,
        id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<Option<Assignment>, AppError>;
    async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<bool, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn list(&self, company_id: Uuid, include_deleted: bool)
        -> Result<Vec<Driver>, AppError>;
    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Driver>, AppError>;
    async fn save(&self, driver: Driver) -> Result<Driver, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn list(
        &self,
        company_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Vehicle>, AppError>;
    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Vehicle>, AppError>;
    /// Looks up a non-deleted vehicle by normalized registration number.
    async fn find_by_registration(
        &self,
        company_id: Uuid,
        registration: &str,
    ) -> Result<Option<Vehicle>, AppError>;
    async fn save(&self, vehicle: Vehicle) -> Result<Vehicle, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub driver_id: Option<Uuid>,
}

impl ReportFilter {
    pub fn matches(&self, report: &RouteReport) -> bool {
        self.from.is_none_or(|from| report.report_date >= from)
            && self.to.is_none_or(|to| report.report_date <= to)
            && self.driver_id.is_none_or(|id| report.driver_id == id)
    }
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Reports ordered by date, newest first.
    async fn list(
        &self,
        company_id: Uuid,
        filter: &ReportFilter,
    ) -> Result<Vec<RouteReport>, AppError>;
    async fn find_for_driver_on(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<RouteReport>, AppError>;
    async fn insert(&self, report: RouteReport) -> Result<RouteReport, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}
