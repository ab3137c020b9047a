// libs/business-cell/src/handlers.rs
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

use crate::models::{CreateSpecialDateRequest, CreateWeeklyHoursRequest, UpdateWeeklyHoursRequest};
use crate::services::hours::HoursService;

#[derive(Debug, Deserialize)]
pub struct ResolveHoursQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SpecialDatesQuery {
    pub from: Option<NaiveDate>,
}

/// Resolved operating window for one date, for calendar rendering.
#[axum::debug_handler]
pub async fn resolve_day_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<ResolveHoursQuery>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    let hours = hours_service.resolve_day_hours(business_id, query.date, auth.token()).await;

    Ok(Json(json!({
        "business_id": business_id,
        "date": query.date,
        "hours": hours
    })))
}

#[axum::debug_handler]
pub async fn get_business_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    let settings = hours_service.get_settings(business_id, auth.token()).await
        .map_err(|_| AppError::NotFound("Business not found".to_string()))?;

    Ok(Json(json!({ "settings": settings })))
}

#[axum::debug_handler]
pub async fn list_weekly_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    let hours = hours_service.list_weekly_hours(business_id, auth.token()).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "weekly_hours": hours })))
}

#[axum::debug_handler]
pub async fn create_weekly_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
    Json(request): Json<CreateWeeklyHoursRequest>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    let row = hours_service.create_weekly_hours(business_id, request, auth.token()).await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "weekly_hours": row
    })))
}

#[axum::debug_handler]
pub async fn update_weekly_hours(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(hours_id): Path<Uuid>,
    Json(request): Json<UpdateWeeklyHoursRequest>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    let row = hours_service.update_weekly_hours(hours_id, request, auth.token()).await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "weekly_hours": row
    })))
}

#[axum::debug_handler]
pub async fn list_special_dates(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<SpecialDatesQuery>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    let dates = hours_service.list_special_dates(business_id, query.from, auth.token()).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "special_dates": dates })))
}

#[axum::debug_handler]
pub async fn create_special_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(business_id): Path<Uuid>,
    Json(request): Json<CreateSpecialDateRequest>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    let row = hours_service.create_special_date(business_id, request, auth.token()).await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "special_date": row
    })))
}

#[axum::debug_handler]
pub async fn delete_special_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(special_date_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let hours_service = HoursService::new(&state);

    hours_service.delete_special_date(special_date_id, auth.token()).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "success": true })))
}
