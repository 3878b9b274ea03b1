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
use crate::models::vehicle::{Vehicle, VehiclePatch};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/vehicles/:id",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub registration_number: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    pub registration_number: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub brand: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub model: Option<Option<String>>,
    pub is_active: Option<bool>,
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let Query(query) = query?;
    let vehicles = state
        .vehicles
        .list(company_id, query.include_deleted.unwrap_or(false))
        .await?;
    Ok(Json(vehicles))
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    payload: Result<Json<CreateVehicleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let Json(payload) = payload?;
    let registration_number = non_blank(payload.registration_number).ok_or_else(|| {
        AppError::Validation("registrationNumber cannot be empty".to_string())
    })?;

    let lock = state.company_write_lock(company_id);
    let _guard = lock.lock().await;
    ensure_registration_free(&state, company_id, &registration_number, None).await?;

    let vehicle = state
        .vehicles
        .save(Vehicle {
            id: Uuid::new_v4(),
            company_id,
            registration_number,
            brand: non_blank(payload.brand),
            model: non_blank(payload.model),
            is_active: true,
            created_at: state.clock.now(),
            deleted_at: None,
        })
        .await?;

    info!(vehicle_id = %vehicle.id, "vehicle created");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vehicle>, AppError> {
    let Path(id) = id?;
    let vehicle = state
        .vehicles
        .get(company_id, id)
        .await?
        .ok_or_else(|| vehicle_not_found(id))?;
    Ok(Json(vehicle))
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateVehicleRequest>, JsonRejection>,
) -> Result<Json<Vehicle>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let registration_number = match payload.registration_number {
        Some(raw) => Some(non_blank(Some(raw)).ok_or_else(|| {
            AppError::Validation("registrationNumber cannot be empty".to_string())
        })?),
        None => None,
    };

    let lock = state.company_write_lock(company_id);
    let _guard = lock.lock().await;
    let mut vehicle = live_vehicle(&state, company_id, id).await?;
    if let Some(registration) = &registration_number {
        ensure_registration_free(&state, company_id, registration, Some(id)).await?;
    }

    VehiclePatch {
        registration_number,
        brand: payload.brand.map(non_blank),
        model: payload.model.map(non_blank),
        is_active: payload.is_active,
    }
    .apply_to(&mut vehicle);

    let vehicle = state.vehicles.save(vehicle).await?;
    info!(vehicle_id = %vehicle.id, "vehicle updated");
    Ok(Json(vehicle))
}

async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    let mut vehicle = live_vehicle(&state, company_id, id).await?;

    vehicle.deleted_at = Some(state.clock.now());
    vehicle.is_active = false;
    state.vehicles.save(vehicle).await?;

    info!(vehicle_id = %id, "vehicle soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_registration_free(
    state: &AppState,
    company_id: Uuid,
    registration: &str,
    own_id: Option<Uuid>,
) -> Result<(), AppError> {
    match state
        .vehicles
        .find_by_registration(company_id, registration)
        .await?
    {
        Some(existing) if Some(existing.id) != own_id => Err(AppError::DuplicateRegistration(
            format!("vehicle with registration {registration} already exists"),
        )),
        _ => Ok(()),
    }
}

async fn live_vehicle(state: &AppState, company_id: Uuid, id: Uuid) -> Result<Vehicle, AppError> {
    state
        .vehicles
        .get(company_id, id)
        .await?
        .filter(|vehicle| !vehicle.is_deleted())
        .ok_or_else(|| vehicle_not_found(id))
}

fn vehicle_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("vehicle {id} not found"))
}
