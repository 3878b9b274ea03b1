use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentPatch, NewAssignment};
use crate::models::driver::Driver;
use crate::models::report::RouteReport;
use crate::models::vehicle::{normalize_registration, Vehicle};
use crate::repository::{
    AssignmentFilter, AssignmentRepository, DriverRepository, ReportFilter, ReportRepository,
    VehicleRepository,
};

#[derive(Default)]
pub struct MemoryStore {
    assignments: DashMap<Uuid, Assignment>,
    drivers: DashMap<Uuid, Driver>,
    vehicles: DashMap<Uuid, Vehicle>,
    reports: DashMap<Uuid, RouteReport>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentRepository for MemoryStore {
    async fn list(
        &self,
        company_id: Uuid,
        filter: &AssignmentFilter,
    ) -> Result<Vec<Assignment>, AppError> {
        let mut rows: Vec<Assignment> = self
            .assignments
            .iter()
            .filter(|entry| entry.company_id == company_id && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Assignment>, AppError> {
        Ok(self
            .assignments
            .get(&id)
            .filter(|entry| entry.company_id == company_id)
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, new: NewAssignment) -> Result<Assignment, AppError> {
        let now = Utc::now();
        let assignment = Assignment {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            driver_id: new.driver_id,
            vehicle_id: new.vehicle_id,
            start_date: new.start_date,
            end_date: new.end_date,
            created_at: now,
            updated_at: now,
        };

        self.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn patch(
        &self,
        company_id: Uuid,
        id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<Option<Assignment>, AppError> {
        let Some(mut assignment) = self
            .assignments
            .get_mut(&id)
            .filter(|entry| entry.company_id == company_id)
        else {
            return Ok(None);
        };

        patch.apply_to(&mut assignment);
        assignment.updated_at = Utc::now();
        Ok(Some(assignment.value().clone()))
    }

    async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .assignments
            .remove_if(&id, |_, assignment| assignment.company_id == company_id)
            .is_some())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.assignments.len())
    }
}

#[async_trait]
impl DriverRepository for MemoryStore {
    async fn list(
        &self,
        company_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Driver>, AppError> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .filter(|entry| entry.company_id == company_id)
            .filter(|entry| include_deleted || !entry.is_deleted())
            .map(|entry| entry.value().clone())
            .collect();

        drivers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(drivers)
    }

    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Driver>, AppError> {
        Ok(self
            .drivers
            .get(&id)
            .filter(|entry| entry.company_id == company_id)
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, driver: Driver) -> Result<Driver, AppError> {
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.drivers.len())
    }
}

#[async_trait]
impl VehicleRepository for MemoryStore {
    async fn list(
        &self,
        company_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Vehicle>, AppError> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .iter()
            .filter(|entry| entry.company_id == company_id)
            .filter(|entry| include_deleted || !entry.is_deleted())
            .map(|entry| entry.value().clone())
            .collect();

        vehicles.sort_by(|a, b| {
            a.registration_number
                .cmp(&b.registration_number)
                .then(a.id.cmp(&b.id))
        });
        Ok(vehicles)
    }

    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        Ok(self
            .vehicles
            .get(&id)
            .filter(|entry| entry.company_id == company_id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_registration(
        &self,
        company_id: Uuid,
        registration: &str,
    ) -> Result<Option<Vehicle>, AppError> {
        let wanted = normalize_registration(registration);
        Ok(self
            .vehicles
            .iter()
            .find(|entry| {
                entry.company_id == company_id
                    && !entry.is_deleted()
                    && normalize_registration(&entry.registration_number) == wanted
            })
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, vehicle: Vehicle) -> Result<Vehicle, AppError> {
        self.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.vehicles.len())
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn list(
        &self,
        company_id: Uuid,
        filter: &ReportFilter,
    ) -> Result<Vec<RouteReport>, AppError> {
        let mut reports: Vec<RouteReport> = self
            .reports
            .iter()
            .filter(|entry| entry.company_id == company_id && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        reports.sort_by(|a, b| {
            b.report_date
                .cmp(&a.report_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(reports)
    }

    async fn find_for_driver_on(
        &self,
        company_id: Uuid,
        driver_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<RouteReport>, AppError> {
        Ok(self
            .reports
            .iter()
            .find(|entry| {
                entry.company_id == company_id
                    && entry.driver_id == driver_id
                    && entry.report_date == day
            })
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, report: RouteReport) -> Result<RouteReport, AppError> {
        self.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.reports.len())
    }
}

/// Delegates to a [`MemoryStore`] but yields to the scheduler before every
/// call, so concurrent writers interleave between a check and its write.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct YieldingStore {
    inner: MemoryStore,
}

#[cfg(test)]
#[async_trait]
impl AssignmentRepository for YieldingStore {
    async fn list(
        &self,
        company_id: Uuid,
        filter: &AssignmentFilter,
    ) -> Result<Vec<Assignment>, AppError> {
        tokio::task::yield_now().await;
        AssignmentRepository::list(&self.inner, company_id, filter).await
    }

    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Assignment>, AppError> {
        tokio::task::yield_now().await;
        AssignmentRepository::get(&self.inner, company_id, id).await
    }

    async fn insert(&self, new: NewAssignment) -> Result<Assignment, AppError> {
        tokio::task::yield_now().await;
        AssignmentRepository::insert(&self.inner, new).await
    }

    async fn patch(
        &self,
        company_id: Uuid,
        id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<Option<Assignment>, AppError> {
        tokio::task::yield_now().await;
        AssignmentRepository::patch(&self.inner, company_id, id, patch).await
    }

    async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        tokio::task::yield_now().await;
        AssignmentRepository::delete(&self.inner, company_id, id).await
    }

    async fn count(&self) -> Result<usize, AppError> {
        AssignmentRepository::count(&self.inner).await
    }
}

#[cfg(test)]
#[async_trait]
impl VehicleRepository for YieldingStore {
    async fn list(
        &self,
        company_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Vehicle>, AppError> {
        tokio::task::yield_now().await;
        VehicleRepository::list(&self.inner, company_id, include_deleted).await
    }

    async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        tokio::task::yield_now().await;
        VehicleRepository::get(&self.inner, company_id, id).await
    }

    async fn find_by_registration(
        &self,
        company_id: Uuid,
        registration: &str,
    ) -> Result<Option<Vehicle>, AppError> {
        tokio::task::yield_now().await;
        self.inner.find_by_registration(company_id, registration).await
    }

    async fn save(&self, vehicle: Vehicle) -> Result<Vehicle, AppError> {
        tokio::task::yield_now().await;
        VehicleRepository::save(&self.inner, vehicle).await
    }

    async fn count(&self) -> Result<usize, AppError> {
        VehicleRepository::count(&self.inner).await
    }
}
