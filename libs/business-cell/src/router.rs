use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn business_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{business_id}/settings", get(handlers::get_business_settings))
        .route("/{business_id}/hours", get(handlers::list_weekly_hours))
        .route("/{business_id}/hours", post(handlers::create_weekly_hours))
        .route("/{business_id}/hours/resolve", get(handlers::resolve_day_hours))
        .route("/hours/{hours_id}", put(handlers::update_weekly_hours))
        .route("/{business_id}/special-dates", get(handlers::list_special_dates))
        .route("/{business_id}/special-dates", post(handlers::create_special_date))
        .route("/special-dates/{special_date_id}", delete(handlers::delete_special_date))
        .with_state(state)
}
