// libs/appointment-cell/src/services/policy.rs
use chrono::{Duration, NaiveDate, NaiveDateTime};

use business_cell::models::BusinessSettings;

use crate::models::SchedulingError;

/// Lead-time and horizon bounds for one business. `now` is always injected
/// by the caller so the policy stays a pure function of its inputs.
#[derive(Debug, Clone, Copy)]
pub struct BookingWindowPolicy {
    pub min_booking_hours: i64,
    pub max_booking_days: i64,
}

impl BookingWindowPolicy {
    pub fn from_settings(settings: &BusinessSettings) -> Self {
        Self {
            min_booking_hours: settings.min_booking_hours.max(0),
            max_booking_days: settings.max_booking_days.max(0),
        }
    }

    /// Earliest instant a new appointment may start.
    pub fn earliest_bookable(&self, now: NaiveDateTime) -> NaiveDateTime {
        now + Duration::hours(self.min_booking_hours)
    }

    /// Latest calendar date (inclusive) a new appointment may fall on.
    pub fn latest_bookable_date(&self, now: NaiveDateTime) -> NaiveDate {
        now.date() + Duration::days(self.max_booking_days)
    }

    /// Whether a calendar date may be offered in a date picker at all.
    pub fn is_date_selectable(&self, now: NaiveDateTime, date: NaiveDate) -> bool {
        date >= now.date()
            && date >= self.earliest_bookable(now).date()
            && date <= self.latest_bookable_date(now)
    }

    /// Final authority at submission time: reject any start outside the
    /// bounds regardless of what the UI allowed.
    pub fn validate_start(
        &self,
        now: NaiveDateTime,
        start: NaiveDateTime,
    ) -> Result<(), SchedulingError> {
        if start <= now {
            return Err(SchedulingError::OutsideBookingWindow(
                "requested start is in the past".to_string(),
            ));
        }

        let earliest = self.earliest_bookable(now);
        if start < earliest {
            return Err(SchedulingError::OutsideBookingWindow(format!(
                "requested start is inside the {}-hour minimum lead time",
                self.min_booking_hours
            )));
        }

        let latest = self.latest_bookable_date(now);
        if start.date() > latest {
            return Err(SchedulingError::OutsideBookingWindow(format!(
                "requested date is beyond the {}-day booking horizon",
                self.max_booking_days
            )));
        }

        Ok(())
    }
}
