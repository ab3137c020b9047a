// libs/business-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};

// ==============================================================================
// BUSINESS SETTINGS
// ==============================================================================

/// Per-business scheduling configuration: booking window bounds, slot
/// granularity and the client double-booking policy flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSettings {
    pub id: Uuid,
    pub name: String,
    pub min_booking_hours: i64,
    pub max_booking_days: i64,
    pub slot_interval_minutes: i64,
    pub prevent_client_double_booking: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessSettings {
    /// Conservative defaults used when the business row cannot be fetched.
    pub fn fallback(business_id: Uuid) -> Self {
        Self {
            id: business_id,
            name: String::new(),
            min_booking_hours: 2,
            max_booking_days: 90,
            slot_interval_minutes: 15,
            prevent_client_double_booking: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

// ==============================================================================
// OPERATING HOURS MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessWeeklyHours {
    pub id: Uuid,
    pub business_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: i32,
    pub is_closed: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSpecialDate {
    pub id: Uuid,
    pub business_id: Uuid,
    pub date: NaiveDate,
    pub is_closed: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub reason: String,
    pub description: Option<String>,
}

/// Effective operating window for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayHours {
    Closed,
    Open { open: NaiveTime, close: NaiveTime },
}

impl DayHours {
    pub fn is_closed(&self) -> bool {
        matches!(self, DayHours::Closed)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWeeklyHoursRequest {
    pub day_of_week: i32,
    pub is_closed: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWeeklyHoursRequest {
    pub is_closed: Option<bool>,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpecialDateRequest {
    pub date: NaiveDate,
    pub is_closed: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub reason: String,
    pub description: Option<String>,
}
