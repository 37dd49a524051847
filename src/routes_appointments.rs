// --------------------------------------------------
// Handles API endpoints related to appointment CRUD,
// the service catalog and calendar settings.
//
// Responsibilities:
// - List / create / update / delete appointments
// - Change appointment status
// - Read / extend a company's service catalog
// - Get / update calendar settings
// -------------------------------------------------

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::grid::{self, parse_date, time_slots, truncate_time, AppointmentOut, MINUTES_PER_DAY};
use crate::models::{Appointment, CalendarSettings, CatalogService, Client, Db, ServiceLine};
use crate::status::{AppointmentStatus, StatusMeta, STATUS_TABLE};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AppointmentsQuery {
    pub company_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<String>, // "YYYY-MM-DD"
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("invalid id".to_string()))
}

// -----------------------------
// GET /api/appointments
// Filters by company, status and date;
// oldest first unless a single date is asked for
// -----------------------------
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(q): Query<AppointmentsQuery>,
) -> Result<Response, ApiError> {
    let db = state.store.load()?;

    let scoped: Vec<Appointment> = db
        .appointments
        .into_iter()
        .filter(|a| q.company_id.is_none_or(|id| a.company_id == id))
        .filter(|a| q.status.is_none_or(|s| a.status == s))
        .collect();

    let list = match q.date.as_deref() {
        None => grid::agenda_order(&scoped),
        Some(raw) => {
            let date = parse_date(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid date {raw:?}")))?;
            grid::bucket_appointments(&scoped, date)
        }
    };

    let out: Vec<AppointmentOut> = list.into_iter().map(AppointmentOut::from).collect();
    Ok(Json(out).into_response())
}

#[derive(Debug, Deserialize)]
pub struct AppointmentInput {
    pub appointment_date: String, // "YYYY-MM-DD"
    pub start_time: String,       // "HH:MM" or "HH:MM:SS"
    #[serde(default)]
    pub duration_min: i64,
    pub client: Client,
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    pub notes: Option<String>,
}

// Checked and normalised fields shared by create and update
struct ValidAppointment {
    appointment_date: String,
    start_time: String,
    duration_min: i64,
    client: Client,
    services: Vec<ServiceLine>,
    notes: Option<String>,
}

fn validate(input: AppointmentInput) -> Result<ValidAppointment, ApiError> {
    let date = parse_date(&input.appointment_date)
        .ok_or_else(|| ApiError::BadRequest("invalid appointment_date".to_string()))?;
    let start_time = truncate_time(&input.start_time)
        .ok_or_else(|| ApiError::BadRequest("invalid start_time".to_string()))?;

    if input.client.name.trim().is_empty() {
        return Err(ApiError::BadRequest("client name required".to_string()));
    }
    if input.services.iter().any(|s| s.duration_min <= 0 || s.price < 0.0) {
        return Err(ApiError::BadRequest("invalid service line".to_string()));
    }

    let duration_min = if input.services.is_empty() {
        Some(input.duration_min)
    } else {
        input
            .services
            .iter()
            .try_fold(0i64, |acc, s| acc.checked_add(s.duration_min))
    };
    let duration_min = match duration_min {
        Some(m) if m <= 0 => {
            return Err(ApiError::BadRequest("duration must be positive".to_string()));
        }
        Some(m) if m <= MINUTES_PER_DAY => m,
        _ => {
            return Err(ApiError::BadRequest(format!(
                "duration must not exceed {MINUTES_PER_DAY} minutes"
            )));
        }
    };

    Ok(ValidAppointment {
        appointment_date: date.format("%Y-%m-%d").to_string(),
        start_time,
        duration_min,
        client: input.client,
        services: input.services,
        notes: input.notes,
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentInput {
    pub company_id: Uuid,
    #[serde(flatten)]
    pub appointment: AppointmentInput,
}

// -----------------------------
// POST /api/appointments
// Books a new appointment as pending
// -----------------------------
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(input): Json<CreateAppointmentInput>,
) -> Result<Response, ApiError> {
    let valid = validate(input.appointment)?;

    let _guard = state.store.lock().await;
    let mut db = state.store.load()?;

    if !db.companies.iter().any(|c| c.id == input.company_id) {
        return Err(ApiError::NotFound("company"));
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        company_id: input.company_id,
        appointment_date: valid.appointment_date,
        start_time: valid.start_time,
        duration_min: valid.duration_min,
        status: AppointmentStatus::Pending,
        client: valid.client,
        services: valid.services,
        notes: valid.notes,
    };

    db.appointments.push(appointment.clone());
    state.store.save(&db)?;

    tracing::info!(
        appointment_id = %appointment.id,
        company_id = %appointment.company_id,
        date = %appointment.appointment_date,
        start = %appointment.start_time,
        "appointment created"
    );
    Ok((StatusCode::CREATED, Json(AppointmentOut::from(&appointment))).into_response())
}

// -----------------------------
// PUT /api/appointments/:id
// Reschedules / edits an appointment; status is untouched
// ----------------------------
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AppointmentInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let valid = validate(input)?;

    let _guard = state.store.lock().await;
    let mut db = state.store.load()?;

    let Some(a) = db.appointments.iter_mut().find(|a| a.id == id) else {
        return Err(ApiError::NotFound("appointment"));
    };

    a.appointment_date = valid.appointment_date;
    a.start_time = valid.start_time;
    a.duration_min = valid.duration_min;
    a.client = valid.client;
    a.services = valid.services;
    a.notes = valid.notes;

    let updated = a.clone();
    state.store.save(&db)?;

    tracing::info!(appointment_id = %id, "appointment updated");
    Ok(Json(AppointmentOut::from(&updated)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: AppointmentStatus,
}

// -----------------------------
// PUT /api/appointments/:id/status
// Terminal statuses cannot be changed again
// -----------------------------
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<StatusInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;

    let _guard = state.store.lock().await;
    let mut db = state.store.load()?;

    let Some(a) = db.appointments.iter_mut().find(|a| a.id == id) else {
        return Err(ApiError::NotFound("appointment"));
    };

    if a.status.is_terminal() && a.status != input.status {
        return Err(ApiError::Conflict(format!(
            "appointment is {} and cannot change status",
            a.status.meta().label.to_lowercase()
        )));
    }

    let previous = a.status;
    a.status = input.status;
    let updated = a.clone();
    state.store.save(&db)?;

    tracing::info!(appointment_id = %id, from = ?previous, to = ?input.status, "appointment status changed");
    Ok(Json(AppointmentOut::from(&updated)).into_response())
}

// -----------------------------
// DELETE /api/appointments/:id
// Removes an appointment permanently
// -----------------------------
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;

    let _guard = state.store.lock().await;
    let mut db = state.store.load()?;

    let before = db.appointments.len();
    db.appointments.retain(|a| a.id != id);

    if db.appointments.len() == before {
        return Err(ApiError::NotFound("appointment"));
    }

    state.store.save(&db)?;

    tracing::info!(appointment_id = %id, "appointment deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ServicesQuery {
    pub company_id: Uuid,
}

// -----------------------------
// GET /api/services
// Bookable services of one company
// -----------------------------
pub async fn list_services(
    State(state): State<AppState>,
    Query(q): Query<ServicesQuery>,
) -> Result<Json<Vec<CatalogService>>, ApiError> {
    let db = state.store.load()?;
    let services = db
        .services
        .into_iter()
        .filter(|s| s.company_id == q.company_id)
        .collect();
    Ok(Json(services))
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceInput {
    pub company_id: Uuid,
    pub name: String,
    pub duration_min: i64,
    pub price: f64,
}

// -----------------------------
// POST /api/services
// -----------------------------
pub async fn create_service(
    State(state): State<AppState>,
    Json(input): Json<CreateServiceInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name required".to_string()));
    }
    if !(1..=MINUTES_PER_DAY).contains(&input.duration_min) || input.price < 0.0 {
        return Err(ApiError::BadRequest("invalid duration or price".to_string()));
    }

    let _guard = state.store.lock().await;
    let mut db: Db = state.store.load()?;

    if !db.companies.iter().any(|c| c.id == input.company_id) {
        return Err(ApiError::NotFound("company"));
    }

    let service = CatalogService {
        id: Uuid::new_v4(),
        company_id: input.company_id,
        name: input.name.trim().to_string(),
        duration_min: input.duration_min,
        price: input.price,
    };
    db.services.push(service.clone());
    state.store.save(&db)?;

    Ok((StatusCode::CREATED, Json(service)))
}

// -----------------------------
// GET /api/statuses
// Display metadata for every status
// -----------------------------
pub async fn list_statuses() -> Json<&'static [StatusMeta]> {
    Json(&STATUS_TABLE)
}

// -----------------------------
// GET /api/settings
// -----------------------------
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<CalendarSettings>, ApiError> {
    Ok(Json(state.store.load()?.settings))
}

// -----------------------------
// PUT /api/settings
// Rejects hours / slot lengths the calendar cannot lay out
// -----------------------------
pub async fn put_settings(
    State(state): State<AppState>,
    Json(s): Json<CalendarSettings>,
) -> Result<Json<CalendarSettings>, ApiError> {
    time_slots(s.day_start_hour, s.day_end_hour, s.slot_minutes)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let _guard = state.store.lock().await;
    let mut db = state.store.load()?;
    db.settings = s;
    state.store.save(&db)?;

    tracing::info!(settings = ?db.settings, "calendar settings updated");
    Ok(Json(db.settings))
}
