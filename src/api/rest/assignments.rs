use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::nullable;
use crate::api::rest::session::CurrentCompany;
use crate::engine::assignments::{
    self, AssignmentPage, AssignmentQuery, CreateAssignment, SortBy, SortDir,
};
use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentPatch};
use crate::repository::AssignmentFilter;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route(
            "/assignments/:id",
            get(get_assignment)
                .patch(update_assignment)
                .delete(delete_assignment),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssignmentsQuery {
    pub driver_uuid: Option<Uuid>,
    pub vehicle_uuid: Option<Uuid>,
    pub active_on: Option<NaiveDate>,
    pub sort_by: Option<SortBy>,
    pub sort_dir: Option<SortDir>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub driver_uuid: Option<Uuid>,
    pub vehicle_uuid: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    pub driver_uuid: Option<Uuid>,
    pub vehicle_uuid: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
}

async fn list_assignments(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    query: Result<Query<ListAssignmentsQuery>, QueryRejection>,
) -> Result<Json<AssignmentPage>, AppError> {
    let Query(query) = query?;

    let page = assignments::list_assignments(
        &state,
        company_id,
        AssignmentQuery {
            filter: AssignmentFilter {
                driver_id: query.driver_uuid,
                vehicle_id: query.vehicle_uuid,
                active_on: query.active_on,
                exclude_id: None,
            },
            sort_by: query.sort_by.unwrap_or_default(),
            sort_dir: query.sort_dir.unwrap_or_default(),
            limit: query.limit,
            cursor: query.cursor,
        },
    )
    .await?;

    Ok(Json(page))
}

async fn create_assignment(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    payload: Result<Json<CreateAssignmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let Json(payload) = payload?;

    let assignment = assignments::create_assignment(
        &state,
        company_id,
        CreateAssignment {
            driver_id: payload.driver_uuid,
            vehicle_id: payload.vehicle_uuid,
            start_date: payload.start_date,
            end_date: payload.end_date,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn get_assignment(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Assignment>, AppError> {
    let Path(id) = id?;

    let assignment = state
        .assignments
        .get(company_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("assignment {id} not found")))?;

    Ok(Json(assignment))
}

async fn update_assignment(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateAssignmentRequest>, JsonRejection>,
) -> Result<Json<Assignment>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let assignment = assignments::update_assignment(
        &state,
        company_id,
        id,
        AssignmentPatch {
            driver_id: payload.driver_uuid,
            vehicle_id: payload.vehicle_uuid,
            start_date: payload.start_date,
            end_date: payload.end_date,
        },
    )
    .await?;

    Ok(Json(assignment))
}

async fn delete_assignment(
    State(state): State<Arc<AppState>>,
    CurrentCompany(company_id): CurrentCompany,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    assignments::delete_assignment(&state, company_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
