// libs/employee-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::NaiveDate;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateAbsenceRequest, CreateScheduleRequest, UpdateScheduleRequest};
use crate::services::schedule::ScheduleService;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AbsencesQuery {
    pub from: Option<NaiveDate>,
}

/// Resolved working window for one date (schedule reduced by absences).
#[axum::debug_handler]
pub async fn get_working_window(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let window = schedule_service.resolve_working_window(employee_id, query.date, auth.token()).await;

    Ok(Json(json!({
        "employee_id": employee_id,
        "date": query.date,
        "window": window
    })))
}

#[axum::debug_handler]
pub async fn list_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let schedule = schedule_service.list_schedule(employee_id, auth.token()).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "schedule": schedule })))
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(employee_id): Path<Uuid>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let row = schedule_service.create_schedule(employee_id, request, auth.token()).await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "schedule": row
    })))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(schedule_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let row = schedule_service.update_schedule(schedule_id, request, auth.token()).await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "schedule": row
    })))
}

#[axum::debug_handler]
pub async fn list_absences(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<AbsencesQuery>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let absences = schedule_service.list_absences(employee_id, query.from, auth.token()).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "absences": absences })))
}

#[axum::debug_handler]
pub async fn create_absence(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(employee_id): Path<Uuid>,
    Json(request): Json<CreateAbsenceRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let row = schedule_service.create_absence(employee_id, request, auth.token()).await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "absence": row
    })))
}

#[axum::debug_handler]
pub async fn delete_absence(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(absence_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    schedule_service.delete_absence(absence_id, auth.token()).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "success": true })))
}
