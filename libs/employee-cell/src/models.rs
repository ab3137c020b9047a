// libs/employee-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{NaiveDate, NaiveTime};

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeWeeklySchedule {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub business_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: i32,
    pub is_available: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeAbsence {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub business_id: Uuid,
    pub date: NaiveDate,
    pub is_full_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: String,
    pub notes: Option<String>,
}

/// A sub-interval of a working window removed by a partial absence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cutout {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// An employee's resolved working window for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkingWindow {
    Unavailable,
    Working {
        start: NaiveTime,
        end: NaiveTime,
        cutouts: Vec<Cutout>,
    },
}

impl WorkingWindow {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, WorkingWindow::Unavailable)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub business_id: Uuid,
    pub day_of_week: i32,
    pub is_available: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub is_available: Option<bool>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAbsenceRequest {
    pub business_id: Uuid,
    pub date: NaiveDate,
    pub is_full_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: String,
    pub notes: Option<String>,
}
