use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn business_response(business_id: &str) -> serde_json::Value {
        json!({
            "id": business_id,
            "name": "Test Salon",
            "min_booking_hours": 2,
            "max_booking_days": 90,
            "slot_interval_minutes": 15,
            "prevent_client_double_booking": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn weekly_hours_response(business_id: &str, day_of_week: i32, open: &str, close: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "business_id": business_id,
            "day_of_week": day_of_week,
            "is_closed": false,
            "open_time": open,
            "close_time": close
        })
    }

    pub fn closed_weekly_hours_response(business_id: &str, day_of_week: i32) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "business_id": business_id,
            "day_of_week": day_of_week,
            "is_closed": true,
            "open_time": null,
            "close_time": null
        })
    }

    pub fn special_date_response(business_id: &str, date: &str, is_closed: bool) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "business_id": business_id,
            "date": date,
            "is_closed": is_closed,
            "open_time": if is_closed { None } else { Some("10:00:00") },
            "close_time": if is_closed { None } else { Some("16:00:00") },
            "reason": "holiday",
            "description": null
        })
    }

    pub fn employee_schedule_response(employee_id: &str, day_of_week: i32, start: &str, end: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "employee_id": employee_id,
            "business_id": Uuid::new_v4(),
            "day_of_week": day_of_week,
            "is_available": true,
            "start_time": start,
            "end_time": end
        })
    }

    pub fn absence_response(employee_id: &str, date: &str, is_full_day: bool) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "employee_id": employee_id,
            "business_id": Uuid::new_v4(),
            "date": date,
            "is_full_day": is_full_day,
            "start_time": if is_full_day { None } else { Some("12:00:00") },
            "end_time": if is_full_day { None } else { Some("13:00:00") },
            "reason": "personal",
            "notes": null
        })
    }

    pub fn service_response(service_id: &str, business_id: &str, duration_minutes: i32, price: f64) -> serde_json::Value {
        json!({
            "id": service_id,
            "business_id": business_id,
            "name": "Test Service",
            "duration_minutes": duration_minutes,
            "price": price,
            "is_active": true
        })
    }

    pub fn appointment_response(business_id: &str, employee_id: &str, date: &str, start: &str, end: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "business_id": business_id,
            "employee_id": employee_id,
            "client_id": Uuid::new_v4(),
            "walk_in_name": null,
            "service_ids": [Uuid::new_v4()],
            "appointment_date": date,
            "start_time": start,
            "end_time": end,
            "status": "confirmed",
            "total_price": 45.0,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(app_config.is_configured());
    }

    #[test]
    fn test_appointment_row_shape() {
        let row = MockSupabaseResponses::appointment_response(
            "b", "e", "2025-03-10", "10:00:00", "10:30:00",
        );
        assert_eq!(row["status"], "confirmed");
        assert_eq!(row["start_time"], "10:00:00");
    }
}
