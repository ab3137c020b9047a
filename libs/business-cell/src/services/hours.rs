// libs/business-cell/src/services/hours.rs
use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    BusinessSettings, BusinessSpecialDate, BusinessWeeklyHours, DayHours,
    CreateSpecialDateRequest, CreateWeeklyHoursRequest, UpdateWeeklyHoursRequest,
};

pub struct HoursService {
    supabase: SupabaseClient,
}

/// Map a calendar date to the 0 (Sunday) .. 6 (Saturday) weekday index used
/// by the weekly-hours and schedule tables.
pub fn weekday_index(date: NaiveDate) -> i32 {
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

/// Merge one date's override row with the recurring weekly row. First match
/// wins: special date verbatim, then weekly hours, then the default window.
pub fn merge_day_hours(
    special: Option<&BusinessSpecialDate>,
    weekly: Option<&BusinessWeeklyHours>,
) -> DayHours {
    if let Some(special) = special {
        if special.is_closed {
            return DayHours::Closed;
        }
        if let (Some(open), Some(close)) = (special.open_time, special.close_time) {
            return DayHours::Open { open, close };
        }
        warn!("Special date {} has no open/close pair, falling through to weekly hours", special.date);
    }

    if let Some(weekly) = weekly {
        if weekly.is_closed {
            return DayHours::Closed;
        }
        if let (Some(open), Some(close)) = (weekly.open_time, weekly.close_time) {
            return DayHours::Open { open, close };
        }
        warn!("Weekly hours row for weekday {} has no open/close pair, using default window", weekly.day_of_week);
    }

    let (open, close) = default_window();
    DayHours::Open { open, close }
}

fn default_window() -> (NaiveTime, NaiveTime) {
    (
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    )
}

impl HoursService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Resolve the effective operating window for a business on a date.
    ///
    /// Lookup failures at either tier are absorbed: a transient storage error
    /// degrades the window to the next tier instead of blocking booking.
    pub async fn resolve_day_hours(
        &self,
        business_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> DayHours {
        debug!("Resolving operating hours for business {} on {}", business_id, date);

        let special = match self.get_special_date(business_id, date, auth_token).await {
            Ok(row) => row,
            Err(e) => {
                warn!("Special date lookup failed for business {}: {}", business_id, e);
                None
            }
        };

        let weekly = match self.get_weekly_hours_for_day(business_id, weekday_index(date), auth_token).await {
            Ok(row) => row,
            Err(e) => {
                warn!("Weekly hours lookup failed for business {}: {}", business_id, e);
                None
            }
        };

        let hours = merge_day_hours(special.as_ref(), weekly.as_ref());
        debug!("Resolved hours for business {} on {}: {:?}", business_id, date, hours);
        hours
    }

    /// Fetch per-business scheduling settings, degrading to defaults when the
    /// row cannot be read.
    pub async fn get_settings_or_default(
        &self,
        business_id: Uuid,
        auth_token: &str,
    ) -> BusinessSettings {
        match self.get_settings(business_id, auth_token).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Business settings lookup failed for {}: {}", business_id, e);
                BusinessSettings::fallback(business_id)
            }
        }
    }

    pub async fn get_settings(
        &self,
        business_id: Uuid,
        auth_token: &str,
    ) -> Result<BusinessSettings> {
        let path = format!("/rest/v1/businesses?id=eq.{}", business_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Business not found"));
        }

        let settings: BusinessSettings = serde_json::from_value(result[0].clone())?;
        Ok(settings)
    }

    // ==========================================================================
    // WEEKLY HOURS CRUD
    // ==========================================================================

    pub async fn list_weekly_hours(
        &self,
        business_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<BusinessWeeklyHours>> {
        let path = format!(
            "/rest/v1/business_weekly_hours?business_id=eq.{}&order=day_of_week.asc",
            business_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let rows: Vec<BusinessWeeklyHours> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<BusinessWeeklyHours>, _>>()?;

        Ok(rows)
    }

    pub async fn create_weekly_hours(
        &self,
        business_id: Uuid,
        request: CreateWeeklyHoursRequest,
        auth_token: &str,
    ) -> Result<BusinessWeeklyHours> {
        debug!("Creating weekly hours for business {} weekday {}", business_id, request.day_of_week);

        if request.day_of_week < 0 || request.day_of_week > 6 {
            return Err(anyhow!("Day of week must be between 0 (Sunday) and 6 (Saturday)"));
        }

        validate_open_close(request.is_closed, request.open_time, request.close_time)?;

        // At most one row per weekday per business
        let existing = self.get_weekly_hours_for_day(business_id, request.day_of_week, auth_token).await?;
        if existing.is_some() {
            return Err(anyhow!("Weekly hours already defined for this weekday"));
        }

        let hours_data = json!({
            "business_id": business_id,
            "day_of_week": request.day_of_week,
            "is_closed": request.is_closed,
            "open_time": request.open_time.map(|t| t.format("%H:%M:%S").to_string()),
            "close_time": request.close_time.map(|t| t.format("%H:%M:%S").to_string()),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/business_weekly_hours",
            Some(auth_token),
            Some(hours_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create weekly hours"));
        }

        let row: BusinessWeeklyHours = serde_json::from_value(result[0].clone())?;
        debug!("Weekly hours created with ID: {}", row.id);
        Ok(row)
    }

    pub async fn update_weekly_hours(
        &self,
        hours_id: Uuid,
        request: UpdateWeeklyHoursRequest,
        auth_token: &str,
    ) -> Result<BusinessWeeklyHours> {
        debug!("Updating weekly hours: {}", hours_id);

        let current = self.get_weekly_hours_by_id(hours_id, auth_token).await?;

        let is_closed = request.is_closed.unwrap_or(current.is_closed);
        let open_time = request.open_time.or(current.open_time);
        let close_time = request.close_time.or(current.close_time);
        validate_open_close(is_closed, open_time, close_time)?;

        let mut update_data = serde_json::Map::new();
        if let Some(closed) = request.is_closed {
            update_data.insert("is_closed".to_string(), json!(closed));
        }
        if let Some(open) = request.open_time {
            update_data.insert("open_time".to_string(), json!(open.format("%H:%M:%S").to_string()));
        }
        if let Some(close) = request.close_time {
            update_data.insert("close_time".to_string(), json!(close.format("%H:%M:%S").to_string()));
        }

        let path = format!("/rest/v1/business_weekly_hours?id=eq.{}", hours_id);
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
            return Err(anyhow!("Failed to update weekly hours"));
        }

        let row: BusinessWeeklyHours = serde_json::from_value(result[0].clone())?;
        Ok(row)
    }

    // ==========================================================================
    // SPECIAL DATES CRUD
    // ==========================================================================

    pub async fn list_special_dates(
        &self,
        business_id: Uuid,
        from: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<BusinessSpecialDate>> {
        let mut path = format!(
            "/rest/v1/business_special_dates?business_id=eq.{}&order=date.asc",
            business_id
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

        let rows: Vec<BusinessSpecialDate> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<BusinessSpecialDate>, _>>()?;

        Ok(rows)
    }

    pub async fn create_special_date(
        &self,
        business_id: Uuid,
        request: CreateSpecialDateRequest,
        auth_token: &str,
    ) -> Result<BusinessSpecialDate> {
        debug!("Creating special date for business {} on {}", business_id, request.date);

        validate_open_close(request.is_closed, request.open_time, request.close_time)?;

        // One override per calendar date
        let existing = self.get_special_date(business_id, request.date, auth_token).await?;
        if existing.is_some() {
            return Err(anyhow!("Special date already exists for this date"));
        }

        let date_data = json!({
            "business_id": business_id,
            "date": request.date,
            "is_closed": request.is_closed,
            "open_time": request.open_time.map(|t| t.format("%H:%M:%S").to_string()),
            "close_time": request.close_time.map(|t| t.format("%H:%M:%S").to_string()),
            "reason": request.reason,
            "description": request.description,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/business_special_dates",
            Some(auth_token),
            Some(date_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create special date"));
        }

        let row: BusinessSpecialDate = serde_json::from_value(result[0].clone())?;
        Ok(row)
    }

    pub async fn delete_special_date(
        &self,
        special_date_id: Uuid,
        auth_token: &str,
    ) -> Result<()> {
        debug!("Deleting special date: {}", special_date_id);

        let path = format!("/rest/v1/business_special_dates?id=eq.{}", special_date_id);
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

    async fn get_weekly_hours_by_id(
        &self,
        hours_id: Uuid,
        auth_token: &str,
    ) -> Result<BusinessWeeklyHours> {
        let path = format!("/rest/v1/business_weekly_hours?id=eq.{}", hours_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Weekly hours not found"));
        }

        let row: BusinessWeeklyHours = serde_json::from_value(result[0].clone())?;
        Ok(row)
    }

    async fn get_weekly_hours_for_day(
        &self,
        business_id: Uuid,
        day_of_week: i32,
        auth_token: &str,
    ) -> Result<Option<BusinessWeeklyHours>> {
        let path = format!(
            "/rest/v1/business_weekly_hours?business_id=eq.{}&day_of_week=eq.{}",
            business_id, day_of_week
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

    async fn get_special_date(
        &self,
        business_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Option<BusinessSpecialDate>> {
        let path = format!(
            "/rest/v1/business_special_dates?business_id=eq.{}&date=eq.{}",
            business_id, date
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
}

fn validate_open_close(
    is_closed: bool,
    open_time: Option<NaiveTime>,
    close_time: Option<NaiveTime>,
) -> Result<()> {
    if is_closed {
        if open_time.is_some() || close_time.is_some() {
            return Err(anyhow!("Closed entries must not carry open/close times"));
        }
        return Ok(());
    }

    match (open_time, close_time) {
        (Some(open), Some(close)) if open < close => Ok(()),
        (Some(_), Some(_)) => Err(anyhow!("Open time must be before close time")),
        _ => Err(anyhow!("Open entries require both open and close times")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn weekly_row(is_closed: bool, open: Option<NaiveTime>, close: Option<NaiveTime>) -> BusinessWeeklyHours {
        BusinessWeeklyHours {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            day_of_week: 1,
            is_closed,
            open_time: open,
            close_time: close,
        }
    }

    fn special_row(is_closed: bool, open: Option<NaiveTime>, close: Option<NaiveTime>) -> BusinessSpecialDate {
        BusinessSpecialDate {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            is_closed,
            open_time: open,
            close_time: close,
            reason: "holiday".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_special_date_closed_beats_weekly_hours() {
        let special = special_row(true, None, None);
        let weekly = weekly_row(false, Some(time(9, 0)), Some(time(18, 0)));

        let hours = merge_day_hours(Some(&special), Some(&weekly));
        assert_eq!(hours, DayHours::Closed);
    }

    #[test]
    fn test_special_date_window_beats_weekly_hours() {
        let special = special_row(false, Some(time(10, 0)), Some(time(16, 0)));
        let weekly = weekly_row(false, Some(time(9, 0)), Some(time(18, 0)));

        let hours = merge_day_hours(Some(&special), Some(&weekly));
        assert_eq!(hours, DayHours::Open { open: time(10, 0), close: time(16, 0) });
    }

    #[test]
    fn test_weekly_hours_used_without_override() {
        let weekly = weekly_row(false, Some(time(8, 30)), Some(time(17, 0)));

        let hours = merge_day_hours(None, Some(&weekly));
        assert_eq!(hours, DayHours::Open { open: time(8, 30), close: time(17, 0) });
    }

    #[test]
    fn test_weekly_closed_resolves_closed() {
        let weekly = weekly_row(true, None, None);

        let hours = merge_day_hours(None, Some(&weekly));
        assert_eq!(hours, DayHours::Closed);
    }

    #[test]
    fn test_default_window_when_no_rows() {
        let hours = merge_day_hours(None, None);
        assert_eq!(hours, DayHours::Open { open: time(9, 0), close: time(18, 0) });
    }

    #[test]
    fn test_malformed_special_date_falls_through() {
        // Not closed but missing the open/close pair: treated as no data
        let special = special_row(false, None, None);
        let weekly = weekly_row(false, Some(time(9, 0)), Some(time(18, 0)));

        let hours = merge_day_hours(Some(&special), Some(&weekly));
        assert_eq!(hours, DayHours::Open { open: time(9, 0), close: time(18, 0) });
    }

    #[test]
    fn test_weekday_index_is_sunday_based() {
        // 2025-03-09 is a Sunday
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()), 0);
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()), 1);
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()), 6);
    }

    #[test]
    fn test_validate_open_close() {
        assert!(validate_open_close(true, None, None).is_ok());
        assert!(validate_open_close(true, Some(time(9, 0)), None).is_err());
        assert!(validate_open_close(false, Some(time(9, 0)), Some(time(18, 0))).is_ok());
        assert!(validate_open_close(false, Some(time(18, 0)), Some(time(9, 0))).is_err());
        assert!(validate_open_close(false, Some(time(9, 0)), None).is_err());
    }
}
