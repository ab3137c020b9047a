// libs/appointment-cell/src/services/booking.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use business_cell::models::DayHours;
use business_cell::services::hours::HoursService;
use employee_cell::models::{Cutout, WorkingWindow};
use employee_cell::services::schedule::ScheduleService;

use crate::models::{
    Appointment, AppointmentStatus, AvailabilityRequest, BookAppointmentRequest,
    BookingWindowResponse, CancelAppointmentRequest, DayAvailability, DayStatus,
    SchedulingError, UpdateStatusRequest,
};
use crate::services::catalog::CatalogService;
use crate::services::conflict::{filter_candidates, intervals_overlap, BlockingInterval, ConflictService};
use crate::services::consistency::ConsistencyService;
use crate::services::lifecycle::LifecycleService;
use crate::services::policy::BookingWindowPolicy;
use crate::services::slots::{add_minutes, generate_slots};

/// One callable pipeline for every booking surface: new bookings, the client
/// self-reschedule picker and the staff calendar all read availability and
/// submit through this service.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    hours_service: HoursService,
    schedule_service: ScheduleService,
    catalog_service: CatalogService,
    conflict_service: ConflictService,
    consistency_service: ConsistencyService,
    lifecycle_service: LifecycleService,
}

/// Clip the employee's working window to the business operating window.
/// Returns None when the two never overlap on this date.
pub fn intersect_windows(
    hours: &DayHours,
    window: &WorkingWindow,
) -> Option<(NaiveTime, NaiveTime, Vec<Cutout>)> {
    let DayHours::Open { open, close } = hours else {
        return None;
    };
    let WorkingWindow::Working { start, end, cutouts } = window else {
        return None;
    };

    let clipped_start = (*open).max(*start);
    let clipped_end = (*close).min(*end);
    if clipped_start >= clipped_end {
        return None;
    }

    Some((clipped_start, clipped_end, cutouts.clone()))
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            hours_service: HoursService::new(config),
            schedule_service: ScheduleService::new(config),
            catalog_service: CatalogService::new(Arc::clone(&supabase)),
            conflict_service: ConflictService::new(Arc::clone(&supabase)),
            consistency_service: ConsistencyService::new(Arc::clone(&supabase)),
            lifecycle_service: LifecycleService::new(),
            supabase,
        }
    }

    /// Date-picker bounds for a business.
    pub async fn get_booking_window(
        &self,
        business_id: Uuid,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> BookingWindowResponse {
        let settings = self.hours_service.get_settings_or_default(business_id, auth_token).await;
        let policy = BookingWindowPolicy::from_settings(&settings);

        BookingWindowResponse {
            earliest_bookable: policy.earliest_bookable(now),
            latest_bookable_date: policy.latest_bookable_date(now),
            slot_interval_minutes: settings.slot_interval_minutes,
        }
    }

    /// The full availability pipeline for one employee and date.
    ///
    /// Distinguishes its terminal states so the caller can render the right
    /// empty-state reason: closed business, absent employee, or a day that is
    /// simply booked out.
    pub async fn get_day_availability(
        &self,
        request: AvailabilityRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<DayAvailability, SchedulingError> {
        debug!("Computing availability for employee {} at business {} on {}",
               request.employee_id, request.business_id, request.date);

        let settings = self.hours_service
            .get_settings_or_default(request.business_id, auth_token).await;
        let policy = BookingWindowPolicy::from_settings(&settings);

        if !policy.is_date_selectable(now, request.date) {
            return Ok(DayAvailability::empty(request.date, DayStatus::OutsideBookingWindow));
        }

        let hours = self.hours_service
            .resolve_day_hours(request.business_id, request.date, auth_token).await;
        if hours.is_closed() {
            return Ok(DayAvailability::empty(request.date, DayStatus::BusinessClosed));
        }

        let window = self.schedule_service
            .resolve_working_window(request.employee_id, request.date, auth_token).await;
        if window.is_unavailable() {
            return Ok(DayAvailability::empty(request.date, DayStatus::EmployeeUnavailable));
        }

        let Some((open, close, cutouts)) = intersect_windows(&hours, &window) else {
            // Working hours never overlap the operating window on this date
            return Ok(DayAvailability::empty(request.date, DayStatus::EmployeeUnavailable));
        };

        // A selection that does not aggregate to a positive duration is a
        // hard failure, never a silently substituted default.
        let block = self.catalog_service
            .resolve_block(request.business_id, &request.service_ids, auth_token).await?;

        let candidates = generate_slots(open, close, settings.slot_interval_minutes, block.total_minutes);

        let client_filter = if settings.prevent_client_double_booking {
            request.client_id
        } else {
            None
        };
        let appointments = self.conflict_service.get_blocking_appointments(
            request.employee_id,
            request.date,
            client_filter,
            request.exclude_appointment_id,
            auth_token,
        ).await?;

        let mut blocking: Vec<BlockingInterval> = appointments.iter()
            .map(BlockingInterval::from_appointment)
            .collect();
        blocking.extend(cutouts.iter().map(BlockingInterval::from_cutout));

        let slots = filter_candidates(&candidates, block.total_minutes, request.date, now, &policy, &blocking);

        let status = if slots.is_empty() {
            DayStatus::FullyBooked
        } else {
            DayStatus::Available
        };

        debug!("Availability for employee {} on {}: {:?} with {} slots",
               request.employee_id, request.date, status, slots.len());

        Ok(DayAvailability {
            date: request.date,
            status,
            slots,
            duration_minutes: Some(block.total_minutes),
            total_price: Some(block.total_price),
        })
    }

    /// Submit a booking. Everything the UI filtered is re-validated here, and
    /// the insert itself runs under the employee/date lock.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        info!("Booking appointment for employee {} on {} at {}",
              request.employee_id, request.date, request.start_time);

        match (&request.client_id, &request.walk_in_name) {
            (Some(_), Some(_)) => {
                return Err(SchedulingError::ValidationError(
                    "provide either a client or a walk-in name, not both".to_string()));
            }
            (None, None) => {
                return Err(SchedulingError::ValidationError(
                    "a client or a walk-in name is required".to_string()));
            }
            _ => {}
        }

        let settings = self.hours_service
            .get_settings_or_default(request.business_id, auth_token).await;
        let policy = BookingWindowPolicy::from_settings(&settings);

        let block = self.catalog_service
            .resolve_block(request.business_id, &request.service_ids, auth_token).await?;

        let starts_at = request.date.and_time(request.start_time);
        policy.validate_start(now, starts_at)?;

        let end_time = add_minutes(request.start_time, block.total_minutes)
            .ok_or_else(|| SchedulingError::ValidationError(
                "service block extends past the end of the day".to_string()))?;

        self.verify_slot_fits(
            request.business_id,
            request.employee_id,
            request.date,
            request.start_time,
            end_time,
            auth_token,
        ).await?;

        let client_filter = if settings.prevent_client_double_booking {
            request.client_id
        } else {
            None
        };
        self.conflict_service.check_interval_free(
            request.employee_id,
            request.date,
            request.start_time,
            end_time,
            client_filter,
            None,
            auth_token,
        ).await?;

        let payload = json!({
            "business_id": request.business_id,
            "employee_id": request.employee_id,
            "client_id": request.client_id,
            "walk_in_name": request.walk_in_name,
            "service_ids": request.service_ids,
            "appointment_date": request.date,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": end_time.format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Pending.to_string(),
            "total_price": block.total_price,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now,
        });

        self.consistency_service.atomic_create_appointment(
            request.employee_id,
            request.date,
            request.start_time,
            end_time,
            client_filter,
            payload,
            now,
            auth_token,
        ).await
    }

    /// Cancel an appointment (soft transition, the record is never deleted).
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle_service.validate_status_transition(
            &current.status,
            &AppointmentStatus::Cancelled,
        )?;

        let cancellation_note = format!("Cancelled by {:?}: {}", request.cancelled_by, request.reason);
        let update_data = json!({
            "status": AppointmentStatus::Cancelled.to_string(),
            "notes": cancellation_note,
            "updated_at": now,
        });

        let cancelled = self.patch_appointment(appointment_id, update_data, auth_token).await?;
        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    /// Staff/client status transitions (confirm, start, complete, no-show).
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Updating status of appointment {} to {}", appointment_id, request.status);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle_service.validate_status_transition(&current.status, &request.status)?;

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(request.status.to_string()));
        update_data.insert("updated_at".to_string(), json!(now));
        if let Some(reason) = request.reason {
            update_data.insert("notes".to_string(), json!(reason));
        }

        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    /// Staff calendar feed: one employee's appointments for a date.
    pub async fn get_employee_day(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?employee_id=eq.{}&appointment_date=eq.{}&order=start_time.asc",
            employee_id, date
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// A client's upcoming and past appointments.
    pub async fn get_client_appointments(
        &self,
        client_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?client_id=eq.{}&order=appointment_date.desc,start_time.desc",
            client_id
        );
        self.fetch_appointments(&path, auth_token).await
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    /// Re-resolve both windows at submission time and verify the proposed
    /// interval still fits inside them.
    async fn verify_slot_fits(
        &self,
        business_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let hours = self.hours_service.resolve_day_hours(business_id, date, auth_token).await;
        let DayHours::Open { open, close } = hours else {
            return Err(SchedulingError::BusinessClosed);
        };
        if start < open || end > close {
            return Err(SchedulingError::ValidationError(
                "requested time falls outside business operating hours".to_string()));
        }

        let window = self.schedule_service.resolve_working_window(employee_id, date, auth_token).await;
        let WorkingWindow::Working { start: emp_start, end: emp_end, cutouts } = window else {
            return Err(SchedulingError::EmployeeUnavailable);
        };
        if start < emp_start || end > emp_end {
            return Err(SchedulingError::EmployeeUnavailable);
        }
        if cutouts.iter().any(|c| intervals_overlap(start, end, c.start, c.end)) {
            warn!("Requested interval overlaps an absence for employee {} on {}", employee_id, date);
            return Err(SchedulingError::ConflictDetected);
        }

        Ok(())
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}
