// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::{Local, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityRequest, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleRequest, SchedulingError, UpdateStatusRequest,
};
use crate::services::booking::BookingService;
use crate::services::reschedule::RescheduleEngine;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub business_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    /// Comma-separated service ids
    pub service_ids: String,
    pub client_id: Option<Uuid>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct BookingWindowParams {
    pub business_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeDayParams {
    pub date: NaiveDate,
}

/// The engine takes "now" as an explicit input; the HTTP layer is the single
/// place the wall clock is read.
fn business_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn parse_service_ids(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Uuid::parse_str(s)
            .map_err(|_| AppError::BadRequest(format!("invalid service id: {}", s))))
        .collect()
}

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::NotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        SchedulingError::ConflictDetected => {
            AppError::Conflict("Requested time conflicts with an existing booking".to_string())
        }
        SchedulingError::ConcurrentConflict => {
            AppError::Conflict("Slot was taken by a concurrent booking, please retry".to_string())
        }
        SchedulingError::InvalidDuration(msg) => {
            AppError::BadRequest(format!("Invalid service duration: {}", msg))
        }
        SchedulingError::OutsideBookingWindow(msg) => {
            AppError::BadRequest(format!("Booking window violation: {}", msg))
        }
        SchedulingError::BusinessClosed => {
            AppError::BadRequest("Business is closed on the requested date".to_string())
        }
        SchedulingError::EmployeeUnavailable => {
            AppError::BadRequest("Employee is not available at the requested time".to_string())
        }
        SchedulingError::InvalidStatusTransition(status) => {
            AppError::BadRequest(format!("Appointment cannot be modified in status {}", status))
        }
        SchedulingError::ValidationError(msg) => {
            AppError::ValidationError(msg)
        }
        SchedulingError::DatabaseError(msg) => {
            AppError::Database(msg)
        }
    }
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

/// Full availability pipeline for one employee/date/service selection. The
/// self-reschedule surface passes `exclude_appointment_id` so the appointment
/// being edited never blocks its own alternatives.
#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<Value>, AppError> {
    let service_ids = parse_service_ids(&params.service_ids)?;

    let request = AvailabilityRequest {
        business_id: params.business_id,
        employee_id: params.employee_id,
        date: params.date,
        service_ids,
        client_id: params.client_id,
        exclude_appointment_id: params.exclude_appointment_id,
    };

    let booking_service = BookingService::new(&state);
    let availability = booking_service
        .get_day_availability(request, business_now(), auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "availability": availability })))
}

/// Date-picker bounds for the booking UI.
#[axum::debug_handler]
pub async fn get_booking_window(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<BookingWindowParams>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let window = booking_service
        .get_booking_window(params.business_id, business_now(), auth.token()).await;

    Ok(Json(json!({ "booking_window": window })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .book_appointment(request, business_now(), auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

/// Staff calendar feed: one employee's appointments for one date.
#[axum::debug_handler]
pub async fn get_employee_day(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(employee_id): Path<Uuid>,
    Query(params): Query<EmployeeDayParams>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointments = booking_service
        .get_employee_day(employee_id, params.date, auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_client_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointments = booking_service
        .get_client_appointments(client_id, auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

// ==============================================================================
// RESCHEDULE AND LIFECYCLE HANDLERS
// ==============================================================================

/// Reschedule an appointment. Drag-derived targets are validated exactly like
/// typed ones; the drag gesture is only an input method.
#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = RescheduleEngine::new(&state);

    let appointment = engine
        .reschedule(appointment_id, request, business_now(), auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .cancel_appointment(appointment_id, request, business_now(), auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .update_status(appointment_id, request, business_now(), auth.token()).await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}
