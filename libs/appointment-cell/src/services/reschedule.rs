// libs/appointment-cell/src/services/reschedule.rs
use chrono::NaiveDateTime;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use business_cell::services::hours::HoursService;

use crate::models::{Appointment, RescheduleRequest, SchedulingError};
use crate::services::conflict::ConflictService;
use crate::services::consistency::ConsistencyService;
use crate::services::policy::BookingWindowPolicy;
use crate::services::slots::{add_minutes, snap_to_step};

/// Moves an existing appointment to a new employee/date/time. The target may
/// come from a typed form or a calendar drag; both paths run the same
/// validation before anything is persisted.
pub struct RescheduleEngine {
    supabase: Arc<SupabaseClient>,
    hours_service: HoursService,
    conflict_service: ConflictService,
    consistency_service: ConsistencyService,
}

/// The block being moved is the stored interval, never a re-aggregation:
/// a reschedule changes placement, not duration. Returns the block length.
pub fn ensure_reschedulable(appointment: &Appointment) -> Result<i64, SchedulingError> {
    if !appointment.status.is_active() {
        return Err(SchedulingError::InvalidStatusTransition(appointment.status.clone()));
    }

    let block_minutes = appointment.duration_minutes();
    if block_minutes <= 0 {
        return Err(SchedulingError::InvalidDuration(format!(
            "stored interval of appointment {} is not positive",
            appointment.id
        )));
    }

    Ok(block_minutes)
}

impl RescheduleEngine {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            hours_service: HoursService::new(config),
            conflict_service: ConflictService::new(Arc::clone(&supabase)),
            consistency_service: ConsistencyService::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Rescheduling appointment {} to {} {}", appointment_id, request.date, request.start_time);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        let block_minutes = ensure_reschedulable(&current)?;

        let target_employee = request.employee_id.unwrap_or(current.employee_id);
        let settings = self.hours_service
            .get_settings_or_default(current.business_id, auth_token).await;

        // Pointer-derived times are quantized before validation, never after
        let start_time = if request.snap.unwrap_or(false) {
            snap_to_step(request.start_time, settings.slot_interval_minutes)
        } else {
            request.start_time
        };

        let starts_at = request.date.and_time(start_time);
        if request.enforce_booking_window.unwrap_or(false) {
            let policy = BookingWindowPolicy::from_settings(&settings);
            policy.validate_start(now, starts_at)?;
        } else if starts_at <= now {
            return Err(SchedulingError::OutsideBookingWindow(
                "requested start is in the past".to_string(),
            ));
        }

        let end_time = add_minutes(start_time, block_minutes)
            .ok_or_else(|| SchedulingError::ValidationError(
                "moved block extends past the end of the day".to_string()))?;

        // Same overlap rule as the booking path, with the moved appointment
        // excluded from its own blocking set.
        self.conflict_service.check_interval_free(
            target_employee,
            request.date,
            start_time,
            end_time,
            None,
            Some(appointment_id),
            auth_token,
        ).await?;

        let moved = self.consistency_service.atomic_move_appointment(
            appointment_id,
            target_employee,
            request.date,
            start_time,
            end_time,
            now,
            auth_token,
        ).await?;

        info!("Appointment {} rescheduled to employee {} on {} at {} (status unchanged)",
              appointment_id, target_employee, request.date, start_time);
        Ok(moved)
    }

    async fn get_appointment(
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
}
