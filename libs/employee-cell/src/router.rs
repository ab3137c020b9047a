use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn employee_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{employee_id}/availability", get(handlers::get_working_window))
        .route("/{employee_id}/schedule", get(handlers::list_schedule))
        .route("/{employee_id}/schedule", post(handlers::create_schedule))
        .route("/schedule/{schedule_id}", put(handlers::update_schedule))
        .route("/{employee_id}/absences", get(handlers::list_absences))
        .route("/{employee_id}/absences", post(handlers::create_absence))
        .route("/absences/{absence_id}", delete(handlers::delete_absence))
        .with_state(state)
}
