// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub business_id: Uuid,
    pub employee_id: Uuid,
    /// Registered client, or None for walk-ins
    pub client_id: Option<Uuid>,
    pub walk_in_name: Option<String>,
    pub service_ids: Vec<Uuid>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub total_price: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Duration of the booked block in minutes, from the stored interval.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.start_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that block a time slot for conflict detection.
    pub fn is_active(&self) -> bool {
        matches!(self,
            AppointmentStatus::Pending |
            AppointmentStatus::Confirmed |
            AppointmentStatus::InProgress
        )
    }

    /// PostgREST `in.` filter over the active status set.
    pub fn active_filter() -> &'static str {
        "in.(pending,confirmed,in_progress)"
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// SERVICE CATALOG MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub duration_minutes: i64,
    pub price: f64,
    pub is_active: bool,
}

/// The contiguous block a service selection occupies. Services are not
/// sub-scheduled individually; only the totals matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceBlock {
    pub total_minutes: i64,
    pub total_price: f64,
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Why a day has the slot list it has. Distinguishes an empty list caused by
/// bookings from one caused by a closed business or an absent employee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Available,
    FullyBooked,
    BusinessClosed,
    EmployeeUnavailable,
    OutsideBookingWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub slots: Vec<AvailableSlot>,
    pub duration_minutes: Option<i64>,
    pub total_price: Option<f64>,
}

impl DayAvailability {
    pub fn empty(date: NaiveDate, status: DayStatus) -> Self {
        Self {
            date,
            status,
            slots: vec![],
            duration_minutes: None,
            total_price: None,
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub business_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub service_ids: Vec<Uuid>,
    /// Requesting client, when known; enables self-overlap prevention
    pub client_id: Option<Uuid>,
    /// Appointment being edited, excluded from the blocking set
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub business_id: Uuid,
    pub employee_id: Uuid,
    pub client_id: Option<Uuid>,
    pub walk_in_name: Option<String>,
    pub service_ids: Vec<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    /// Target employee; None keeps the current assignment
    pub employee_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Quantize a pointer-derived start to the business slot interval
    pub snap: Option<bool>,
    /// Client self-service passes true; staff moves only require a future start
    pub enforce_booking_window: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Client,
    Staff,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

/// Date-picker bounds derived from the booking window policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWindowResponse {
    pub earliest_bookable: NaiveDateTime,
    pub latest_bookable_date: NaiveDate,
    pub slot_interval_minutes: i64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid service duration: {0}")]
    InvalidDuration(String),

    #[error("Booking window violation: {0}")]
    OutsideBookingWindow(String),

    #[error("Appointment conflicts with an existing booking")]
    ConflictDetected,

    #[error("Slot was taken by a concurrent booking, please retry")]
    ConcurrentConflict,

    #[error("Business is closed on the requested date")]
    BusinessClosed,

    #[error("Employee is not available on the requested date")]
    EmployeeUnavailable,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
