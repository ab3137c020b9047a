use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::{method, path};

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::TestConfig;

async fn create_test_app(mock_server: &MockServer) -> Router {
    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    appointment_routes(Arc::new(config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn mount_business(mock_server: &MockServer, business_id: &str) -> Mock {
    Mock::given(method("GET"))
        .and(path("/rest/v1/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": business_id,
            "name": "Test Salon",
            "min_booking_hours": 2,
            "max_booking_days": 90,
            "slot_interval_minutes": 15,
            "prevent_client_double_booking": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
}

#[tokio::test]
async fn test_availability_endpoint_reports_window_violations() {
    let mock_server = MockServer::start().await;
    let business_id = Uuid::new_v4().to_string();
    mount_business(&mock_server, &business_id).mount(&mock_server).await;

    let app = create_test_app(&mock_server).await;

    // A date far in the past can never be selectable
    let uri = format!(
        "/availability?business_id={}&employee_id={}&date=2020-01-01&service_ids={}",
        business_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
    );
    let response = app
        .oneshot(Request::builder()
            .uri(uri)
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["availability"]["status"], "outside_booking_window");
    assert!(body["availability"]["slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_availability_endpoint_rejects_malformed_service_ids() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server).await;

    let uri = format!(
        "/availability?business_id={}&employee_id={}&date=2025-03-10&service_ids=not-a-uuid",
        Uuid::new_v4(),
        Uuid::new_v4(),
    );
    let response = app
        .oneshot(Request::builder()
            .uri(uri)
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_window_endpoint_returns_bounds() {
    let mock_server = MockServer::start().await;
    let business_id = Uuid::new_v4().to_string();
    mount_business(&mock_server, &business_id).mount(&mock_server).await;

    let app = create_test_app(&mock_server).await;

    let uri = format!("/booking-window?business_id={}", business_id);
    let response = app
        .oneshot(Request::builder()
            .uri(uri)
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["booking_window"]["earliest_bookable"].is_string());
    assert!(body["booking_window"]["latest_bookable_date"].is_string());
    assert_eq!(body["booking_window"]["slot_interval_minutes"], 15);
}

#[tokio::test]
async fn test_requests_without_bearer_token_are_rejected() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server).await;

    let uri = format!("/booking-window?business_id={}", Uuid::new_v4());
    let response = app
        .oneshot(Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap())
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
