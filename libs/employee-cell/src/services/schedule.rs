// libs/employee-cell/src/services/schedule.rs
use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateAbsenceRequest, CreateScheduleRequest, Cutout, EmployeeAbsence,
    EmployeeWeeklySchedule, UpdateScheduleRequest, WorkingWindow,
};

pub struct ScheduleService {
    supabase: SupabaseClient,
}

fn weekday_index(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Reduce the weekly row by the date's absences. No weekly row, an off day
/// or a full-day absence all resolve to Unavailable; partial absences become
/// cutouts carried alongside the window.
pub fn reduce_window(
    schedule: Option<&EmployeeWeeklySchedule>,
    absences: &[EmployeeAbsence],
) -> WorkingWindow {
    let Some(schedule) = schedule else {
        return WorkingWindow::Unavailable;
    };
    if !schedule.is_available {
        return WorkingWindow::Unavailable;
    }
    let (Some(start), Some(end)) = (schedule.start_time, schedule.end_time) else {
        warn!("Schedule row {} marked available without a time range", schedule.id);
        return WorkingWindow::Unavailable;
    };

    if absences.iter().any(|a| a.is_full_day) {
        return WorkingWindow::Unavailable;
    }

    let mut cutouts: Vec<Cutout> = absences.iter()
        .filter_map(|a| match (a.start_time, a.end_time) {
            (Some(s), Some(e)) if s < e => Some(Cutout { start: s, end: e }),
            _ => {
                warn!("Partial absence {} has no usable time range, ignoring", a.id);
                None
            }
        })
        .collect();
    cutouts.sort_by_key(|c| c.start);

    WorkingWindow::Working { start, end, cutouts }
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Resolve an employee's working window for a date.
    ///
    /// Storage failures degrade to Unavailable: the engine never offers slots
    /// it could not verify against the schedule.
    pub async fn resolve_working_window(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> WorkingWindow {
        debug!("Resolving working window for employee {} on {}", employee_id, date);

        let schedule = match self.get_schedule_for_day(employee_id, weekday_index(date), auth_token).await {
            Ok(row) => row,
            Err(e) => {
                warn!("Schedule lookup failed for employee {}: {}", employee_id, e);
                return WorkingWindow::Unavailable;
            }
        };

        let absences = match self.get_absences_for_date(employee_id, date, auth_token).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Absence lookup failed for employee {}: {}", employee_id, e);
                return WorkingWindow::Unavailable;
            }
        };

        let window = reduce_window(schedule.as_ref(), &absences);
        debug!("Resolved window for employee {} on {}: {:?}", employee_id, date, window);
        window
    }

    // ==========================================================================
    // SCHEDULE CRUD
    // ==========================================================================

    pub async fn list_schedule(
        &self,
        employee_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<EmployeeWeeklySchedule>> {
        let path = format!(
            "/rest/v1/employee_schedules?employee_id=eq.{}&order=day_of_week.asc",
            employee_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let rows: Vec<EmployeeWeeklySchedule> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<EmployeeWeeklySchedule>, _>>()?;

        Ok(rows)
    }

    pub async fn create_schedule(
        &self,
        employee_id: Uuid,
        request: CreateScheduleRequest,
        auth_token: &str,
    ) -> Result<EmployeeWeeklySchedule> {
        debug!("Creating schedule for employee {} weekday {}", employee_id, request.day_of_week);

        if request.day_of_week < 0 || request.day_of_week > 6 {
            return Err(anyhow!("Day of week must be between 0 (Sunday) and 6 (Saturday)"));
        }

        validate_availability_range(request.is_available, request.start_time, request.end_time)?;

        let existing = self.get_schedule_for_day(employee_id, request.day_of_week, auth_token).await?;
        if existing.is_some() {
            return Err(anyhow!("Schedule already defined for this weekday"));
        }

        let schedule_data = json!({
            "employee_id": employee_id,
            "business_id": request.business_id,
            "day_of_week": request.day_of_week,
            "is_available": request.is_available,
            "start_time": request.start_time.map(|t| t.format("%H:%M:%S").to_string()),
            "end_time": request.end_time.map(|t| t.format("%H:%M:%S").to_string()),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/employee_schedules",
            Some(auth_token),
            Some(schedule_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create schedule"));
        }

        let row: EmployeeWeeklySchedule = serde_json::from_value(result[0].clone())?;
        debug!("Schedule created with ID: {}", row.id);
        Ok(row)
    }

    pub async fn update_schedule(
        &self,
        schedule_id: Uuid,
        request: UpdateScheduleRequest,
        auth_token: &str,
    ) -> Result<EmployeeWeeklySchedule> {
        debug!("Updating schedule: {}", schedule_id);

        let current = self.get_schedule_by_id(schedule_id, auth_token).await?;

        let is_available = request.is_available.unwrap_or(current.is_available);
        let start_time = request.start_time.or(current.start_time);
        let end_time = request.end_time.or(current.end_time);
        validate_availability_range(is_available, start_time, end_time)?;

        let mut update_data = serde_json::Map::new();
        if let Some(available) = request.is_available {
            update_data.insert("is_available".to_string(), json!(available));
        }
        if let Some(start) = request.start_time {
            update_data.insert("start_time".to_string(), json!(start.format("%H:%M:%S").to_string()));
        }
        if let Some(end) = request.end_time {
            update_data.insert("end_time".to_string(), json!(end.format("%H:%M:%S").to_string()));
        }

        let path = format!("/rest/v1/employee_schedules?id=eq.{}", schedule_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update schedule"));
        }

        let row: EmployeeWeeklySchedule = serde_json::from_value(result[0].clone())?;
        Ok(row)
    }

    // ==========================================================================
    // ABSENCE CRUD
    // ==========================================================================

    pub async fn list_absences(
        &self,
        employee_id: Uuid,
        from: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<EmployeeAbsence>> {
        let mut path = format!(
            "/rest/v1/employee_absences?employee_id=eq.{}&order=date.asc",
            employee_id
        );
        if let Some(from) = from {
            path.push_str(&format!("&date=gte.{}", from));
        }

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let rows: Vec<EmployeeAbsence> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<EmployeeAbsence>, _>>()?;

        Ok(rows)
    }

    pub async fn create_absence(
        &self,
        employee_id: Uuid,
        request: CreateAbsenceRequest,
        auth_token: &str,
    ) -> Result<EmployeeAbsence> {
        debug!("Creating absence for employee {} on {}", employee_id, request.date);

        if !request.is_full_day {
            match (request.start_time, request.end_time) {
                (Some(start), Some(end)) if start < end => {}
                _ => return Err(anyhow!("Partial absences require a start time before an end time")),
            }
        }

        let absence_data = json!({
            "employee_id": employee_id,
            "business_id": request.business_id,
            "date": request.date,
            "is_full_day": request.is_full_day,
            "start_time": request.start_time.map(|t| t.format("%H:%M:%S").to_string()),
            "end_time": request.end_time.map(|t| t.format("%H:%M:%S").to_string()),
            "reason": request.reason,
            "notes": request.notes,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/employee_absences",
            Some(auth_token),
            Some(absence_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create absence"));
        }

        let row: EmployeeAbsence = serde_json::from_value(result[0].clone())?;
        Ok(row)
    }

    pub async fn delete_absence(
        &self,
        absence_id: Uuid,
        auth_token: &str,
    ) -> Result<()> {
        debug!("Deleting absence: {}", absence_id);

        let path = format!("/rest/v1/employee_absences?id=eq.{}", absence_id);
        let _: Vec<Value> = self.supabase.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn get_schedule_by_id(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<EmployeeWeeklySchedule> {
        let path = format!("/rest/v1/employee_schedules?id=eq.{}", schedule_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Schedule not found"));
        }

        let row: EmployeeWeeklySchedule = serde_json::from_value(result[0].clone())?;
        Ok(row)
    }

    async fn get_schedule_for_day(
        &self,
        employee_id: Uuid,
        day_of_week: i32,
        auth_token: &str,
    ) -> Result<Option<EmployeeWeeklySchedule>> {
        let path = format!(
            "/rest/v1/employee_schedules?employee_id=eq.{}&day_of_week=eq.{}",
            employee_id, day_of_week
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn get_absences_for_date(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<EmployeeAbsence>> {
        let path = format!(
            "/rest/v1/employee_absences?employee_id=eq.{}&date=eq.{}",
            employee_id, date
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let rows: Vec<EmployeeAbsence> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<EmployeeAbsence>, _>>()?;

        Ok(rows)
    }
}

fn validate_availability_range(
    is_available: bool,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
) -> Result<()> {
    if !is_available {
        return Ok(());
    }

    match (start_time, end_time) {
        (Some(start), Some(end)) if start < end => Ok(()),
        (Some(_), Some(_)) => Err(anyhow!("Start time must be before end time")),
        _ => Err(anyhow!("Available days require both start and end times")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn schedule_row(is_available: bool, start: Option<NaiveTime>, end: Option<NaiveTime>) -> EmployeeWeeklySchedule {
        EmployeeWeeklySchedule {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            day_of_week: 2,
            is_available,
            start_time: start,
            end_time: end,
        }
    }

    fn absence_row(is_full_day: bool, start: Option<NaiveTime>, end: Option<NaiveTime>) -> EmployeeAbsence {
        EmployeeAbsence {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            is_full_day,
            start_time: start,
            end_time: end,
            reason: "personal".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_no_schedule_row_means_unavailable() {
        assert_eq!(reduce_window(None, &[]), WorkingWindow::Unavailable);
    }

    #[test]
    fn test_off_day_means_unavailable() {
        let schedule = schedule_row(false, None, None);
        assert_eq!(reduce_window(Some(&schedule), &[]), WorkingWindow::Unavailable);
    }

    #[test]
    fn test_full_day_absence_wins_over_schedule() {
        let schedule = schedule_row(true, Some(time(9, 0)), Some(time(17, 0)));
        let absence = absence_row(true, None, None);

        assert_eq!(reduce_window(Some(&schedule), &[absence]), WorkingWindow::Unavailable);
    }

    #[test]
    fn test_partial_absences_become_sorted_cutouts() {
        let schedule = schedule_row(true, Some(time(9, 0)), Some(time(17, 0)));
        let late = absence_row(false, Some(time(15, 0)), Some(time(16, 0)));
        let early = absence_row(false, Some(time(12, 0)), Some(time(13, 0)));

        let window = reduce_window(Some(&schedule), &[late, early]);
        assert_eq!(window, WorkingWindow::Working {
            start: time(9, 0),
            end: time(17, 0),
            cutouts: vec![
                Cutout { start: time(12, 0), end: time(13, 0) },
                Cutout { start: time(15, 0), end: time(16, 0) },
            ],
        });
    }

    #[test]
    fn test_malformed_partial_absence_is_ignored() {
        let schedule = schedule_row(true, Some(time(9, 0)), Some(time(17, 0)));
        let absence = absence_row(false, Some(time(14, 0)), None);

        let window = reduce_window(Some(&schedule), &[absence]);
        assert_eq!(window, WorkingWindow::Working {
            start: time(9, 0),
            end: time(17, 0),
            cutouts: vec![],
        });
    }

    #[test]
    fn test_validate_availability_range() {
        assert!(validate_availability_range(false, None, None).is_ok());
        assert!(validate_availability_range(true, Some(time(9, 0)), Some(time(17, 0))).is_ok());
        assert!(validate_availability_range(true, Some(time(17, 0)), Some(time(9, 0))).is_err());
        assert!(validate_availability_range(true, None, Some(time(17, 0))).is_err());
    }
}
