// libs/appointment-cell/src/services/consistency.rs
//
// Commit-time consistency for appointment writes. The availability pipeline
// is a read-only pre-check; without a guard between that read and the write,
// two concurrent bookings can both pass and both persist. Every write
// therefore goes through a per-(employee, date) scheduling lock with a final
// conflict re-check inside the locked section.
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, SchedulingError};
use crate::services::conflict::ConflictService;

pub struct ConsistencyService {
    supabase: Arc<SupabaseClient>,
    conflict_service: ConflictService,
    lock_timeout_seconds: i64,
    max_retry_attempts: u32,
}

impl ConsistencyService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            conflict_service: ConflictService::new(Arc::clone(&supabase)),
            supabase,
            lock_timeout_seconds: 30,
            max_retry_attempts: 3,
        }
    }

    /// Insert a new appointment under the employee/date lock. `payload` is the
    /// full appointments row; the interval fields are passed separately for
    /// the re-check.
    pub async fn atomic_create_appointment(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        client_id: Option<Uuid>,
        payload: Value,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let lock_id = self.acquire_lock_with_retry(employee_id, date, now, auth_token).await?;

        // Final conflict check under the lock: anything that appears now got
        // in between the caller's pre-check and this commit.
        let recheck = self.conflict_service.check_interval_free(
            employee_id, date, start, end, client_id, None, auth_token,
        ).await;

        if let Err(e) = recheck {
            self.release_lock(lock_id, auth_token).await;
            return Err(match e {
                SchedulingError::ConflictDetected => SchedulingError::ConcurrentConflict,
                other => other,
            });
        }

        let inserted = self.insert_appointment(payload, auth_token).await;
        self.release_lock(lock_id, auth_token).await;

        let appointment = inserted?;
        info!("Appointment {} committed for employee {} on {}", appointment.id, employee_id, date);
        Ok(appointment)
    }

    /// Move an existing appointment under the target employee/date lock,
    /// excluding the appointment itself from the re-check.
    pub async fn atomic_move_appointment(
        &self,
        appointment_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let lock_id = self.acquire_lock_with_retry(employee_id, date, now, auth_token).await?;

        let recheck = self.conflict_service.check_interval_free(
            employee_id, date, start, end, None, Some(appointment_id), auth_token,
        ).await;

        if let Err(e) = recheck {
            self.release_lock(lock_id, auth_token).await;
            return Err(match e {
                SchedulingError::ConflictDetected => SchedulingError::ConcurrentConflict,
                other => other,
            });
        }

        let update_data = json!({
            "employee_id": employee_id,
            "appointment_date": date,
            "start_time": start.format("%H:%M:%S").to_string(),
            "end_time": end.format("%H:%M:%S").to_string(),
            "updated_at": now,
        });

        let updated = self.patch_appointment(appointment_id, update_data, auth_token).await;
        self.release_lock(lock_id, auth_token).await;

        let appointment = updated?;
        info!("Appointment {} moved to employee {} on {} at {}", appointment.id, employee_id, date, start);
        Ok(appointment)
    }

    // ==========================================================================
    // LOCKING
    // ==========================================================================

    async fn acquire_lock_with_retry(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Uuid, SchedulingError> {
        let lock_key = format!("schedule:{}:{}", employee_id, date);

        for attempt in 1..=self.max_retry_attempts {
            debug!("Lock attempt {} for {}", attempt, lock_key);

            if let Some(lock_id) = self.try_acquire_lock(&lock_key, employee_id, now, auth_token).await? {
                return Ok(lock_id);
            }

            if attempt < self.max_retry_attempts {
                tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64)).await;
            }
        }

        warn!("Could not acquire scheduling lock {} after {} attempts", lock_key, self.max_retry_attempts);
        Err(SchedulingError::ConcurrentConflict)
    }

    async fn try_acquire_lock(
        &self,
        lock_key: &str,
        employee_id: Uuid,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Option<Uuid>, SchedulingError> {
        // Clear stale locks left by crashed writers before contending.
        let cleanup_path = format!(
            "/rest/v1/scheduling_locks?lock_key=eq.{}&expires_at=lt.{}",
            lock_key,
            urlencoding::encode(&now.format("%Y-%m-%dT%H:%M:%S").to_string()),
        );
        let _: Result<Vec<Value>, _> = self.supabase.request(
            Method::DELETE,
            &cleanup_path,
            Some(auth_token),
            None,
        ).await;

        let lock_data = json!({
            "lock_key": lock_key,
            "employee_id": employee_id,
            "acquired_at": now,
            "expires_at": now + Duration::seconds(self.lock_timeout_seconds),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        // A unique constraint on lock_key makes the insert the contention
        // point; a rejected insert means another writer holds the lock.
        let result: Result<Vec<Value>, _> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/scheduling_locks",
            Some(auth_token),
            Some(lock_data),
            Some(headers),
        ).await;

        match result {
            Ok(rows) => {
                let lock_id = rows.first()
                    .and_then(|row| row.get("id"))
                    .and_then(|id| id.as_str())
                    .and_then(|id| Uuid::parse_str(id).ok());
                Ok(lock_id)
            }
            Err(e) => {
                debug!("Lock {} contended: {}", lock_key, e);
                Ok(None)
            }
        }
    }

    async fn release_lock(&self, lock_id: Uuid, auth_token: &str) {
        let path = format!("/rest/v1/scheduling_locks?id=eq.{}", lock_id);
        let result: Result<Vec<Value>, _> = self.supabase.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await;

        if let Err(e) = result {
            // The expiry sweep will reclaim it.
            warn!("Failed to release scheduling lock {}: {}", lock_id, e);
        }
    }

    // ==========================================================================
    // WRITES
    // ==========================================================================

    async fn insert_appointment(
        &self,
        payload: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(payload),
            Some(headers),
        ).await.map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::DatabaseError("Failed to create appointment".to_string()));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse appointment: {}", e)))
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
