// Define data modules
pub mod config; // Process configuration (bind address, data path, logging)
pub mod error; // Error types and their HTTP mapping
pub mod grid; // Calendar grids and appointment bucketing
pub mod models; // Data structures (Appointment, Company, Settings, Db, etc.)
pub mod navigation; // Calendar focus and view transitions
pub mod routes_appointments; // HTTP handlers for appointments, services & settings
pub mod routes_calendar; // HTTP handlers for calendar views & navigation
pub mod routes_registration; // HTTP handlers for the registration wizard
pub mod status; // Appointment status and display metadata
pub mod store; // Persistent storage (load/save db.json)
pub mod wizard; // Registration wizard steps and validation

#[cfg(test)]
mod test_support;

use std::{path::PathBuf, sync::Arc};

// Import axum routing utilities and Router
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::store::Store;

// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

pub fn build_router(state: AppState, static_dir: PathBuf) -> Router {
    let api = Router::new()
        // calendar
        .route("/calendar/month", get(routes_calendar::get_month))
        .route("/calendar/week", get(routes_calendar::get_week))
        .route("/calendar/day", get(routes_calendar::get_day))
        .route("/calendar/agenda", get(routes_calendar::get_agenda))
        .route("/calendar/navigate", post(routes_calendar::navigate))
        .route("/calendar/today", post(routes_calendar::today))
        .route("/calendar/focus", post(routes_calendar::set_focus))
        .route("/calendar/drill-down", post(routes_calendar::drill_down))
        // appointments
        .route(
            "/appointments",
            get(routes_appointments::list_appointments).post(routes_appointments::create_appointment),
        )
        .route(
            "/appointments/:id",
            put(routes_appointments::update_appointment).delete(routes_appointments::delete_appointment),
        )
        .route("/appointments/:id/status", put(routes_appointments::set_status))
        .route(
            "/services",
            get(routes_appointments::list_services).post(routes_appointments::create_service),
        )
        .route("/statuses", get(routes_appointments::list_statuses))
        // settings
        .route(
            "/settings",
            get(routes_appointments::get_settings).put(routes_appointments::put_settings),
        )
        // registration
        .route("/registration/advance", post(routes_registration::advance))
        .route("/registration/back", post(routes_registration::back))
        .route("/registration/submit", post(routes_registration::submit));

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
