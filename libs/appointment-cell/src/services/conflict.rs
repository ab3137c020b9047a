// libs/appointment-cell/src/services/conflict.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use employee_cell::models::Cutout;

use crate::models::{Appointment, AppointmentStatus, AvailableSlot, SchedulingError};
use crate::services::policy::BookingWindowPolicy;
use crate::services::slots::add_minutes;

/// A time interval no candidate slot may overlap: an active appointment's
/// block or a partial-absence cutout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockingInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BlockingInterval {
    pub fn from_appointment(appointment: &Appointment) -> Self {
        Self {
            start: appointment.start_time,
            end: appointment.end_time,
        }
    }

    pub fn from_cutout(cutout: &Cutout) -> Self {
        Self {
            start: cutout.start,
            end: cutout.end,
        }
    }
}

/// Half-open interval overlap: `[s1, e1)` intersects `[s2, e2)`.
pub fn intervals_overlap(s1: NaiveTime, e1: NaiveTime, s2: NaiveTime, e2: NaiveTime) -> bool {
    s1 < e2 && s2 < e1
}

/// Apply the candidate rejection rules: past starts, lead-time violations and
/// overlap with any blocking interval. Survivors keep generation order.
pub fn filter_candidates(
    candidates: &[NaiveTime],
    block_minutes: i64,
    date: NaiveDate,
    now: NaiveDateTime,
    policy: &BookingWindowPolicy,
    blocking: &[BlockingInterval],
) -> Vec<AvailableSlot> {
    let earliest = policy.earliest_bookable(now);

    candidates.iter()
        .filter_map(|&start| {
            let end = add_minutes(start, block_minutes)?;
            let starts_at = date.and_time(start);

            if starts_at <= now {
                return None;
            }
            if starts_at < earliest {
                return None;
            }
            if blocking.iter().any(|b| intervals_overlap(start, end, b.start, b.end)) {
                return None;
            }

            Some(AvailableSlot { start_time: start, end_time: end })
        })
        .collect()
}

// ==============================================================================
// BLOCKING-SET FETCH
// ==============================================================================

pub struct ConflictService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Active appointments blocking an employee's date, optionally unioned
    /// with the requesting client's own active appointments (self-overlap
    /// prevention) and excluding the appointment currently being edited.
    pub async fn get_blocking_appointments(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        client_id: Option<Uuid>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Fetching blocking appointments for employee {} on {}", employee_id, date);

        let mut blocking = self.get_active_for_date(
            &format!("employee_id=eq.{}", employee_id),
            date,
            exclude_appointment_id,
            auth_token,
        ).await?;

        if let Some(client_id) = client_id {
            let client_appointments = self.get_active_for_date(
                &format!("client_id=eq.{}", client_id),
                date,
                exclude_appointment_id,
                auth_token,
            ).await?;

            for appointment in client_appointments {
                if !blocking.iter().any(|a| a.id == appointment.id) {
                    blocking.push(appointment);
                }
            }
        }

        blocking.sort_by_key(|a| a.start_time);
        Ok(blocking)
    }

    /// Verify that a proposed interval overlaps none of the blocking set.
    pub async fn check_interval_free(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        client_id: Option<Uuid>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let blocking = self.get_blocking_appointments(
            employee_id,
            date,
            client_id,
            exclude_appointment_id,
            auth_token,
        ).await?;

        let conflicting = blocking.iter()
            .filter(|a| intervals_overlap(start, end, a.start_time, a.end_time))
            .count();

        if conflicting > 0 {
            warn!("Conflict detected for employee {} on {}: {} overlapping appointments",
                  employee_id, date, conflicting);
            return Err(SchedulingError::ConflictDetected);
        }

        Ok(())
    }

    async fn get_active_for_date(
        &self,
        owner_filter: &str,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut query_parts = vec![
            owner_filter.to_string(),
            format!("appointment_date=eq.{}", date),
            format!("status={}", AppointmentStatus::active_filter()),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointments?{}&order=start_time.asc",
                          query_parts.join("&"));

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }
}
