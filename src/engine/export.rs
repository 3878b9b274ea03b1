use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::report::RouteReport;
use crate::repository::ReportFilter;
use crate::state::AppState;
use crate::validation::date_range::{validate_date_range, DateRange, DateRangeError};

const CSV_HEADER: [&str; 6] = [
    "report_date",
    "driver_name",
    "vehicle_registration",
    "status",
    "delay_minutes",
    "notes",
];

pub struct ReportExport {
    pub file_name: String,
    pub body: Vec<u8>,
    pub rows: usize,
}

/// Validates the range against today and renders every report inside it
/// as CSV, ordered by date and then driver name.
pub async fn export_reports(
    state: &AppState,
    company_id: Uuid,
    range: DateRange,
) -> Result<ReportExport, AppError> {
    let result = export_inner(state, company_id, range).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::Internal(_)) => "error",
        Err(_) => "rejected",
    };
    state
        .metrics
        .report_exports_total
        .with_label_values(&[outcome])
        .inc();

    result
}

async fn export_inner(
    state: &AppState,
    company_id: Uuid,
    range: DateRange,
) -> Result<ReportExport, AppError> {
    validate_date_range(&range, state.clock.today())?;
    let (from, to) = range.bounds().ok_or(DateRangeError::Required)?;

    let reports = state
        .reports
        .list(
            company_id,
            &ReportFilter {
                from: Some(from),
                to: Some(to),
                driver_id: None,
            },
        )
        .await?;

    let driver_names: HashMap<Uuid, String> = state
        .drivers
        .list(company_id, true)
        .await?
        .into_iter()
        .map(|driver| (driver.id, driver.name))
        .collect();
    let registrations: HashMap<Uuid, String> = state
        .vehicles
        .list(company_id, true)
        .await?
        .into_iter()
        .map(|vehicle| (vehicle.id, vehicle.registration_number))
        .collect();

    let mut rows: Vec<(RouteReport, String)> = reports
        .into_iter()
        .map(|report| {
            let name = driver_names
                .get(&report.driver_id)
                .cloned()
                .unwrap_or_default();
            (report, name)
        })
        .collect();
    rows.sort_by(|a, b| a.0.report_date.cmp(&b.0.report_date).then(a.1.cmp(&b.1)));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|err| AppError::Internal(format!("csv write failed: {err}")))?;

    for (report, driver_name) in &rows {
        let registration = report
            .vehicle_id
            .and_then(|id| registrations.get(&id))
            .map(String::as_str)
            .unwrap_or_default();
        let delay = report
            .delay_minutes
            .map(|minutes| minutes.to_string())
            .unwrap_or_default();
        let report_date = report.report_date.to_string();

        writer
            .write_record([
                report_date.as_str(),
                driver_name.as_str(),
                registration,
                report.status.as_str(),
                delay.as_str(),
                report.notes.as_deref().unwrap_or_default(),
            ])
            .map_err(|err| AppError::Internal(format!("csv write failed: {err}")))?;
    }

    let body = writer
        .into_inner()
        .map_err(|err| AppError::Internal(format!("csv flush failed: {err}")))?;

    info!(rows = rows.len(), %from, %to, "report export generated");

    Ok(ReportExport {
        file_name: export_file_name(from, to),
        body,
        rows: rows.len(),
    })
}

pub fn export_file_name(from: NaiveDate, to: NaiveDate) -> String {
    format!("raporty_{from}_{to}.csv")
}
