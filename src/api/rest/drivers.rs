use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::session::CurrentCompany;
use crate::api::rest::{non_blank, nullable, ListQuery};
use crate::error::AppError;
use crate::models::driver::{Driver, DriverPatch};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route(
            "/drivers/:id",
            get(get_driver).patch(update_driver).delete(delete_driver),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriverRequest {
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub license_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    pub is_active: Option<bool>,
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Driver>>, AppError> {
    let Query(query) = query?;
    let drivers = state
        .drivers
        .list(company_id, query.include_deleted.unwrap_or(false))
        .await?;
    Ok(Json(drivers))
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    payload: Result<Json<CreateDriverRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let Json(payload) = payload?;
    let name = non_blank(payload.name)
        .ok_or_else(|| AppError::Validation("name cannot be empty".to_string()))?;

    let driver = state
        .drivers
        .save(Driver {
            id: Uuid::new_v4(),
            company_id,
            name,
            license_number: non_blank(payload.license_number),
            phone: non_blank(payload.phone),
            is_active: true,
            created_at: state.clock.now(),
            deleted_at: None,
        })
        .await?;

    info!(driver_id = %driver.id, "driver created");
    Ok((StatusCode::CREATED, Json(driver)))
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Driver>, AppError> {
    let Path(id) = id?;
    let driver = state
        .drivers
        .get(company_id, id)
        .await?
        .ok_or_else(|| driver_not_found(id))?;
    Ok(Json(driver))
}

async fn update_driver(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateDriverRequest>, JsonRejection>,
) -> Result<Json<Driver>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let name = match payload.name {
        Some(raw) => Some(
            non_blank(Some(raw))
                .ok_or_else(|| AppError::Validation("name cannot be empty".to_string()))?,
        ),
        None => None,
    };

    let mut driver = live_driver(&state, company_id, id).await?;
    DriverPatch {
        name,
        license_number: payload.license_number.map(non_blank),
        phone: payload.phone.map(non_blank),
        is_active: payload.is_active,
    }
    .apply_to(&mut driver);

    let driver = state.drivers.save(driver).await?;
    info!(driver_id = %driver.id, "driver updated");
    Ok(Json(driver))
}

async fn delete_driver(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    let mut driver = live_driver(&state, company_id, id).await?;

    driver.deleted_at = Some(state.clock.now());
    driver.is_active = false;
    state.drivers.save(driver).await?;

    info!(driver_id = %id, "driver soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn live_driver(state: &AppState, company_id: Uuid, id: Uuid) -> Result<Driver, AppError> {
    state
        .drivers
        .get(company_id, id)
        .await?
        .filter(|driver| !driver.is_deleted())
        .ok_or_else(|| driver_not_found(id))
}

fn driver_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("driver {id} not found"))
}
