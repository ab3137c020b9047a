use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use business_cell::router::business_routes;
use employee_cell::router::employee_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Velora Booking API is running!" }))
        .nest("/business", business_routes(state.clone()))
        .nest("/employees", employee_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
}
