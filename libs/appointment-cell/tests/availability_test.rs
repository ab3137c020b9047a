use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use appointment_cell::models::{AvailabilityRequest, DayStatus, SchedulingError};
use appointment_cell::services::booking::BookingService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const TOKEN: &str = "test-token";

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// Target date 2025-03-10 is a Monday; "now" is noon the day before
fn target_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 9).unwrap().and_time(time(12, 0))
}

fn business_row(business_id: &str, slot_interval: i64) -> Value {
    json!({
        "id": business_id,
        "name": "Test Salon",
        "min_booking_hours": 2,
        "max_booking_days": 90,
        "slot_interval_minutes": slot_interval,
        "prevent_client_double_booking": true,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

fn appointment_row(employee_id: &str, client_id: &str, start: &str, end: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "business_id": Uuid::new_v4(),
        "employee_id": employee_id,
        "client_id": client_id,
        "walk_in_name": null,
        "service_ids": [Uuid::new_v4()],
        "appointment_date": "2025-03-10",
        "start_time": start,
        "end_time": end,
        "status": "confirmed",
        "total_price": 45.0,
        "notes": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

struct DayFixture {
    business_id: String,
    employee_id: String,
    service_id: String,
}

impl DayFixture {
    fn new() -> Self {
        Self {
            business_id: Uuid::new_v4().to_string(),
            employee_id: Uuid::new_v4().to_string(),
            service_id: Uuid::new_v4().to_string(),
        }
    }

    fn request(&self) -> AvailabilityRequest {
        AvailabilityRequest {
            business_id: self.business_id.parse().unwrap(),
            employee_id: self.employee_id.parse().unwrap(),
            date: target_date(),
            service_ids: vec![self.service_id.parse().unwrap()],
            client_id: None,
            exclude_appointment_id: None,
        }
    }

    /// Open business 09:00-18:00, employee working 09:00-18:00, no absences,
    /// one service, no appointments unless a test mounts its own.
    async fn mount_open_day(
        &self,
        mock_server: &MockServer,
        slot_interval: i64,
        service_minutes: i32,
    ) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/businesses"))
            .and(query_param("id", format!("eq.{}", self.business_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                business_row(&self.business_id, slot_interval)
            ])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/business_special_dates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/business_weekly_hours"))
            .and(query_param("day_of_week", "eq.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::weekly_hours_response(&self.business_id, 1, "09:00:00", "18:00:00")
            ])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/employee_schedules"))
            .and(query_param("day_of_week", "eq.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::employee_schedule_response(&self.employee_id, 1, "09:00:00", "18:00:00")
            ])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/employee_absences"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::service_response(
                    &self.service_id, &self.business_id, service_minutes, 45.0)
            ])))
            .mount(mock_server)
            .await;
    }

    async fn mount_no_appointments(&self, mock_server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(mock_server)
            .await;
    }
}

async fn service_for(mock_server: &MockServer) -> BookingService {
    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    BookingService::new(&config)
}

#[tokio::test]
async fn test_open_day_yields_full_slot_grid() {
    // 09:00-18:00, 30-minute granularity, 60-minute service:
    // slots run 09:00..17:00, 17:30 is excluded because 18:30 > 18:00
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();
    fixture.mount_open_day(&mock_server, 30, 60).await;
    fixture.mount_no_appointments(&mock_server).await;

    let service = service_for(&mock_server).await;
    let availability = service.get_day_availability(fixture.request(), now(), TOKEN).await.unwrap();

    assert_eq!(availability.status, DayStatus::Available);
    assert_eq!(availability.slots.len(), 17);
    assert_eq!(availability.slots.first().unwrap().start_time, time(9, 0));
    assert_eq!(availability.slots.last().unwrap().start_time, time(17, 0));
    assert_eq!(availability.slots.last().unwrap().end_time, time(18, 0));
    assert!(availability.slots.iter().all(|s| s.start_time != time(17, 30)));
    assert_eq!(availability.duration_minutes, Some(60));
    assert_eq!(availability.total_price, Some(45.0));
}

#[tokio::test]
async fn test_full_day_absence_reports_employee_unavailable() {
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();

    Mock::given(method("GET"))
        .and(path("/rest/v1/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            business_row(&fixture.business_id, 30)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/business_special_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/business_weekly_hours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_hours_response(&fixture.business_id, 1, "09:00:00", "18:00:00")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employee_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_schedule_response(&fixture.employee_id, 1, "09:00:00", "18:00:00")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employee_absences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::absence_response(&fixture.employee_id, "2025-03-10", true)
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let availability = service.get_day_availability(fixture.request(), now(), TOKEN).await.unwrap();

    // "Employee unavailable", never "fully booked"
    assert_eq!(availability.status, DayStatus::EmployeeUnavailable);
    assert!(availability.slots.is_empty());
}

#[tokio::test]
async fn test_existing_appointment_blocks_overlap_but_not_adjacency() {
    // Existing appointment 10:00-10:30, 30-minute service
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();
    fixture.mount_open_day(&mock_server, 30, 30).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(&fixture.employee_id, &Uuid::new_v4().to_string(), "10:00:00", "10:30:00")
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let availability = service.get_day_availability(fixture.request(), now(), TOKEN).await.unwrap();

    let starts: Vec<NaiveTime> = availability.slots.iter().map(|s| s.start_time).collect();
    assert!(!starts.contains(&time(10, 0)));
    // Adjacent on both sides survives
    assert!(starts.contains(&time(9, 30)));
    assert!(starts.contains(&time(10, 30)));
}

#[tokio::test]
async fn test_special_closure_reports_business_closed() {
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();

    Mock::given(method("GET"))
        .and(path("/rest/v1/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            business_row(&fixture.business_id, 30)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/business_special_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::special_date_response(&fixture.business_id, "2025-03-10", true)
        ])))
        .mount(&mock_server)
        .await;
    // A normal weekly row exists; the override must still win
    Mock::given(method("GET"))
        .and(path("/rest/v1/business_weekly_hours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_hours_response(&fixture.business_id, 1, "09:00:00", "18:00:00")
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let availability = service.get_day_availability(fixture.request(), now(), TOKEN).await.unwrap();

    assert_eq!(availability.status, DayStatus::BusinessClosed);
    assert!(availability.slots.is_empty());
}

#[tokio::test]
async fn test_booked_out_day_reports_fully_booked() {
    // Window clipped to 09:00-10:00 by the employee schedule; the single
    // possible 60-minute slot is taken
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();

    Mock::given(method("GET"))
        .and(path("/rest/v1/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            business_row(&fixture.business_id, 30)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/business_special_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/business_weekly_hours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_hours_response(&fixture.business_id, 1, "09:00:00", "18:00:00")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employee_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::employee_schedule_response(&fixture.employee_id, 1, "09:00:00", "10:00:00")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employee_absences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(&fixture.service_id, &fixture.business_id, 60, 45.0)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(&fixture.employee_id, &Uuid::new_v4().to_string(), "09:00:00", "10:00:00")
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let availability = service.get_day_availability(fixture.request(), now(), TOKEN).await.unwrap();

    assert_eq!(availability.status, DayStatus::FullyBooked);
    assert!(availability.slots.is_empty());
}

#[tokio::test]
async fn test_date_beyond_horizon_is_outside_booking_window() {
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();

    // max_booking_days 7; requesting 2025-04-10 from 2025-03-09
    Mock::given(method("GET"))
        .and(path("/rest/v1/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": fixture.business_id,
            "name": "Test Salon",
            "min_booking_hours": 2,
            "max_booking_days": 7,
            "slot_interval_minutes": 30,
            "prevent_client_double_booking": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let mut request = fixture.request();
    request.date = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();

    let service = service_for(&mock_server).await;
    let availability = service.get_day_availability(request, now(), TOKEN).await.unwrap();

    assert_eq!(availability.status, DayStatus::OutsideBookingWindow);
    assert!(availability.slots.is_empty());
}

#[tokio::test]
async fn test_zero_duration_selection_is_a_hard_failure() {
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();
    fixture.mount_open_day(&mock_server, 30, 0).await;
    fixture.mount_no_appointments(&mock_server).await;

    let service = service_for(&mock_server).await;
    let result = service.get_day_availability(fixture.request(), now(), TOKEN).await;

    assert!(matches!(result, Err(SchedulingError::InvalidDuration(_))));
}

#[tokio::test]
async fn test_client_self_overlap_blocks_slot_with_other_employee() {
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();
    let client_id = Uuid::new_v4().to_string();
    fixture.mount_open_day(&mock_server, 30, 30).await;

    // The employee is free all day...
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("employee_id", format!("eq.{}", fixture.employee_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    // ...but the client already has a 10:00-10:30 appointment elsewhere
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("client_id", format!("eq.{}", client_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(&Uuid::new_v4().to_string(), &client_id, "10:00:00", "10:30:00")
        ])))
        .mount(&mock_server)
        .await;

    let mut request = fixture.request();
    request.client_id = Some(client_id.parse().unwrap());

    let service = service_for(&mock_server).await;
    let availability = service.get_day_availability(request, now(), TOKEN).await.unwrap();

    let starts: Vec<NaiveTime> = availability.slots.iter().map(|s| s.start_time).collect();
    assert!(!starts.contains(&time(10, 0)));
    assert!(starts.contains(&time(10, 30)));
}

#[tokio::test]
async fn test_pipeline_is_idempotent_for_identical_inputs() {
    let mock_server = MockServer::start().await;
    let fixture = DayFixture::new();
    fixture.mount_open_day(&mock_server, 15, 45).await;
    fixture.mount_no_appointments(&mock_server).await;

    let service = service_for(&mock_server).await;
    let first = service.get_day_availability(fixture.request(), now(), TOKEN).await.unwrap();
    let second = service.get_day_availability(fixture.request(), now(), TOKEN).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.slots, second.slots);
}
