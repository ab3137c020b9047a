use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Availability pipeline, shared by every booking surface
        .route("/availability", get(handlers::get_availability))
        .route("/booking-window", get(handlers::get_booking_window))

        // Core appointment management
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))

        // Appointment listings
        .route("/employees/{employee_id}", get(handlers::get_employee_day))
        .route("/clients/{client_id}", get(handlers::get_client_appointments))
        .with_state(state)
}
