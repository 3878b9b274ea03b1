use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::non_blank;
use crate::api::rest::session::CurrentCompany;
use crate::dates::parse_iso_date;
use crate::engine::export::export_reports;
use crate::error::AppError;
use crate::models::report::{RouteReport, RouteStatus};
use crate::repository::ReportFilter;
use crate::state::AppState;
use crate::validation::date_range::DateRange;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports", get(list_reports).post(create_report))
        .route("/reports/export", get(export_csv))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub driver_uuid: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub driver_uuid: Option<Uuid>,
    pub vehicle_uuid: Option<Uuid>,
    pub report_date: Option<NaiveDate>,
    pub status: Option<RouteStatus>,
    pub delay_minutes: Option<u32>,
    pub notes: Option<String>,
}

/// Export bounds arrive as raw strings so a missing end reaches the range
/// validator instead of failing query deserialization.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

async fn list_reports(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    query: Result<Query<ListReportsQuery>, QueryRejection>,
) -> Result<Json<Vec<RouteReport>>, AppError> {
    let Query(query) = query?;
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::InvalidDateRange(
                "from must not be later than to".to_string(),
            ));
        }
    }

    let reports = state
        .reports
        .list(
            company_id,
            &ReportFilter {
                from: query.from,
                to: query.to,
                driver_id: query.driver_uuid,
            },
        )
        .await?;

    Ok(Json(reports))
}

async fn create_report(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RouteReport>), AppError> {
    let Json(payload) = payload?;

    let driver_id = payload
        .driver_uuid
        .ok_or_else(|| AppError::Validation("driverUuid is required".to_string()))?;
    let report_date = payload
        .report_date
        .ok_or_else(|| AppError::Validation("reportDate is required".to_string()))?;
    let status = payload
        .status
        .ok_or_else(|| AppError::Validation("status is required".to_string()))?;

    if report_date > state.clock.today() {
        return Err(AppError::Validation(
            "reportDate cannot be in the future".to_string(),
        ));
    }

    state
        .drivers
        .get(company_id, driver_id)
        .await?
        .filter(|driver| !driver.is_deleted())
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if let Some(vehicle_id) = payload.vehicle_uuid {
        state
            .vehicles
            .get(company_id, vehicle_id)
            .await?
            .filter(|vehicle| !vehicle.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;
    }

    let lock = state.company_write_lock(company_id);
    let _guard = lock.lock().await;

    if state
        .reports
        .find_for_driver_on(company_id, driver_id, report_date)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateReport(format!(
            "a report for driver {driver_id} on {report_date} already exists"
        )));
    }

    let report = state
        .reports
        .insert(RouteReport {
            id: Uuid::new_v4(),
            company_id,
            driver_id,
            vehicle_id: payload.vehicle_uuid,
            report_date,
            status,
            delay_minutes: payload.delay_minutes,
            notes: non_blank(payload.notes),
            created_at: state.clock.now(),
        })
        .await?;

    info!(report_id = %report.id, %report_date, "route report created");
    Ok((StatusCode::CREATED, Json(report)))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let range = DateRange {
        from: parse_bound("from", query.from.as_deref())?,
        to: parse_bound("to", query.to.as_deref())?,
    };

    let export = export_reports(&state, company_id, range).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

fn parse_bound(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => parse_iso_date(value)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("{field} must be a YYYY-MM-DD date"))),
    }
}
