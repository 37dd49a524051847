// --------------------------------------------------
// Handles API endpoints for the calendar views and
// the navigation between them.
//
// Responsibilities:
// - Month / week / day / agenda grids with their buckets
// - Prev / next / today / jump navigation
// - Drill-down clicks on grid cells
// -------------------------------------------------

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::grid::{self, MalformedRecordWarning};
use crate::models::{Appointment, CalendarSettings, Db};
use crate::navigation::{self, CalendarFocus, CellTarget, Direction, DrillOutcome, Granularity};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub date: Option<String>, // "YYYY-MM-DD", defaults to today
    pub company_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AgendaQuery {
    pub company_id: Option<Uuid>,
}

fn view_date(raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    match raw {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("invalid date {s:?}"))),
    }
}

// Appointments of one tenant (or all) plus the settings to lay them out with.
// A registered tenant's own opening hours and slot length replace the global ones.
fn load_scope(
    state: &AppState,
    company_id: Option<Uuid>,
) -> Result<(Vec<Appointment>, CalendarSettings), ApiError> {
    let Db {
        settings,
        companies,
        appointments,
        ..
    } = state.store.load()?;

    let settings = match company_id.and_then(|id| companies.iter().find(|c| c.id == id)) {
        Some(company) => settings.for_company(company),
        None => settings,
    };

    let appointments = appointments
        .into_iter()
        .filter(|a| company_id.is_none_or(|id| a.company_id == id))
        .collect();
    Ok((appointments, settings))
}

fn report_warnings(view: &str, warnings: &[MalformedRecordWarning]) {
    for w in warnings {
        tracing::warn!(
            view,
            appointment_id = %w.appointment_id,
            field = ?w.field,
            value = %w.value,
            "malformed appointment left out of calendar"
        );
    }
}

// -----------------------------
// GET /api/calendar/month
// 6x7 month grid with each day's appointments
// -----------------------------
pub async fn get_month(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let date = view_date(q.date.as_deref())?;
    let (appointments, settings) = load_scope(&state, q.company_id)?;

    let view = grid::month_view(&appointments, date, &settings, Local::now().date_naive());
    report_warnings("month", &view.warnings);
    Ok(Json(view).into_response())
}

// -----------------------------
// GET /api/calendar/week
// 7 day columns split into time slots
// -----------------------------
pub async fn get_week(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let date = view_date(q.date.as_deref())?;
    let (appointments, settings) = load_scope(&state, q.company_id)?;

    let view = grid::week_view(&appointments, date, &settings, Local::now().date_naive())?;
    report_warnings("week", &view.warnings);
    Ok(Json(view).into_response())
}

// -----------------------------
// GET /api/calendar/day
// -----------------------------
pub async fn get_day(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let date = view_date(q.date.as_deref())?;
    let (appointments, settings) = load_scope(&state, q.company_id)?;

    let view = grid::day_view(&appointments, date, &settings, Local::now().date_naive())?;
    report_warnings("day", &view.warnings);
    Ok(Json(view).into_response())
}

// -----------------------------
// GET /api/calendar/agenda
// Every appointment, oldest first
// -----------------------------
pub async fn get_agenda(
    State(state): State<AppState>,
    Query(q): Query<AgendaQuery>,
) -> Result<Response, ApiError> {
    let (appointments, _) = load_scope(&state, q.company_id)?;

    let view = grid::agenda_view(&appointments);
    report_warnings("agenda", &view.warnings);
    Ok(Json(view).into_response())
}

#[derive(Debug, Deserialize)]
pub struct NavigateInput {
    pub focus: CalendarFocus,
    pub direction: Direction,
}

// -----------------------------
// POST /api/calendar/navigate
// Prev / next by the active granularity's step
// -----------------------------
pub async fn navigate(
    State(state): State<AppState>,
    Json(input): Json<NavigateInput>,
) -> Result<Json<CalendarFocus>, ApiError> {
    let settings = state.store.load()?.settings;
    Ok(Json(navigation::navigate(
        input.focus,
        input.direction,
        settings.month_step,
    )))
}

#[derive(Debug, Deserialize)]
pub struct FocusInput {
    pub focus: CalendarFocus,
}

// -----------------------------
// POST /api/calendar/today
// -----------------------------
pub async fn today(Json(input): Json<FocusInput>) -> Json<CalendarFocus> {
    Json(navigation::go_to_today(input.focus))
}

#[derive(Debug, Deserialize)]
pub struct SetFocusInput {
    pub focus: CalendarFocus,
    pub date: Option<String>,
    pub granularity: Option<Granularity>,
}

// -----------------------------
// POST /api/calendar/focus
// Date picker jumps and view tab switches
// -----------------------------
pub async fn set_focus(Json(input): Json<SetFocusInput>) -> Result<Json<CalendarFocus>, ApiError> {
    let mut focus = input.focus;
    if let Some(raw) = input.date.as_deref() {
        focus = navigation::jump_to(focus, view_date(Some(raw))?);
    }
    if let Some(g) = input.granularity {
        focus = navigation::with_granularity(focus, g);
    }
    Ok(Json(focus))
}

#[derive(Debug, Deserialize)]
pub struct DrillInput {
    pub focus: CalendarFocus,
    pub target: CellTarget,
    pub company_id: Option<Uuid>,
}

// -----------------------------
// POST /api/calendar/drill-down
// Zoom in, or tell the client which form to open.
// A day-view slot sent without an appointment id is
// checked against storage, row by row as the day view
// files it, before it counts as empty.
// -----------------------------
pub async fn drill_down(
    State(state): State<AppState>,
    Json(input): Json<DrillInput>,
) -> Result<Json<DrillOutcome>, ApiError> {
    let mut target = input.target;

    if let (
        Granularity::Day,
        CellTarget::Slot {
            date,
            slot,
            appointment_id: appointment_id @ None,
        },
    ) = (input.focus.granularity, &mut target)
    {
        let (appointments, settings) = load_scope(&state, input.company_id)?;
        *appointment_id = grid::slot_occupants(&appointments, *date, slot, &settings)?
            .into_iter()
            .find(|a| a.status.occupies_slot())
            .map(|a| a.id);
    }

    Ok(Json(navigation::drill_down(input.focus, &target)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    use crate::models::{Client, Company, Db};
    use crate::status::AppointmentStatus;
    use crate::test_support::{get, post, test_app};

    use super::*;

    fn appt(company_id: Uuid, date: &str, time: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            company_id,
            appointment_date: date.to_string(),
            start_time: time.to_string(),
            duration_min: 30,
            status: AppointmentStatus::Scheduled,
            client: Client {
                name: "Lucia".to_string(),
                phone: Some("5551234".to_string()),
                email: None,
            },
            services: Vec::new(),
            notes: None,
        }
    }

    fn company(open_hour: u32, close_hour: u32, slot_minutes: i64) -> Company {
        Company {
            id: Uuid::new_v4(),
            name: "Clinica Sur".to_string(),
            tax_id: "30-2".to_string(),
            email: "hola@sur.com".to_string(),
            phone: "5559876543".to_string(),
            admin_name: "Marta".to_string(),
            admin_email: "marta@sur.com".to_string(),
            open_hour,
            close_hour,
            slot_minutes,
        }
    }

    fn slot_labels(column: &serde_json::Value) -> Vec<String> {
        column["slots"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["slot"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn day_view_buckets_and_warns() {
        let (app, _dir, store) = test_app();
        let tenant = Uuid::new_v4();
        let a = appt(tenant, "2024-01-15", "09:00:00");
        let b = appt(tenant, "2024-01-15", "09:00");
        let bad = appt(tenant, "2024-01-15", "garbage");
        let other = appt(Uuid::new_v4(), "2024-01-15", "09:00");
        store
            .save(&Db {
                appointments: vec![a.clone(), b.clone(), bad.clone(), other],
                ..Db::default()
            })
            .unwrap();

        let (status, body) = get(&app, &format!("/api/calendar/day?date=2024-01-15&company_id={tenant}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2024-01-15");

        let nine = body["slots"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["slot"] == "09:00")
            .unwrap();
        let ids: Vec<_> = nine["appointments"].as_array().unwrap().iter().map(|a| a["id"].clone()).collect();
        assert_eq!(ids, vec![json!(a.id), json!(b.id)]);

        assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(body["warnings"][0]["appointment_id"], json!(bad.id));
        assert_eq!(body["warnings"][0]["field"], "start_time");
    }

    #[tokio::test]
    async fn month_view_has_42_cells() {
        let (app, _dir, _store) = test_app();
        let (status, body) = get(&app, "/api/calendar/month?date=2024-02-10").await;
        assert_eq!(status, StatusCode::OK);
        let weeks = body["weeks"].as_array().unwrap();
        assert_eq!(weeks.len(), 6);
        assert!(weeks.iter().all(|w| w.as_array().unwrap().len() == 7));
        assert_eq!(weeks[0][0]["date"], "2024-01-28");
        assert_eq!(weeks[0][0]["is_current_month"], false);
    }

    #[tokio::test]
    async fn bad_date_is_rejected() {
        let (app, _dir, _store) = test_app();
        let (status, body) = get(&app, "/api/calendar/week?date=15-01-2024").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid date"));
    }

    #[tokio::test]
    async fn broken_settings_are_a_server_error() {
        let (app, _dir, store) = test_app();
        let mut db = Db::default();
        db.settings.slot_minutes = 0;
        store.save(&db).unwrap();

        let (status, _) = get(&app, "/api/calendar/week?date=2024-01-15").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn agenda_is_sorted() {
        let (app, _dir, store) = test_app();
        let tenant = Uuid::new_v4();
        store
            .save(&Db {
                appointments: vec![
                    appt(tenant, "2024-02-01", "08:00"),
                    appt(tenant, "2024-01-01", "17:00"),
                    appt(tenant, "2024-01-01", "08:30:00"),
                ],
                ..Db::default()
            })
            .unwrap();

        let (status, body) = get(&app, "/api/calendar/agenda").await;
        assert_eq!(status, StatusCode::OK);
        let order: Vec<_> = body["appointments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| (a["appointment_date"].as_str().unwrap().to_string(), a["start_time"].as_str().unwrap().to_string()))
            .collect();
        assert_eq!(order[0], ("2024-01-01".to_string(), "08:30:00".to_string()));
        assert_eq!(order[2].0, "2024-02-01");
    }

    #[tokio::test]
    async fn navigate_uses_stored_month_step() {
        let (app, _dir, store) = test_app();
        let input = json!({
            "focus": { "focus_date": "2024-01-31", "granularity": "month" },
            "direction": "next"
        });

        let (status, body) = post(&app, "/api/calendar/navigate", input.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["focus_date"], "2024-03-02");

        let mut db = Db::default();
        db.settings.month_step = crate::models::MonthStep::Clamp;
        store.save(&db).unwrap();
        let (_, body) = post(&app, "/api/calendar/navigate", input).await;
        assert_eq!(body["focus_date"], "2024-02-29");
        assert_eq!(body["granularity"], "month");
    }

    #[tokio::test]
    async fn focus_today_and_drill_down() {
        let (app, _dir, _store) = test_app();
        let focus = json!({ "focus_date": "2020-05-05", "granularity": "week" });

        let (_, body) = post(&app, "/api/calendar/today", json!({ "focus": focus })).await;
        assert_eq!(body["focus_date"], json!(Local::now().date_naive()));
        assert_eq!(body["granularity"], "week");

        let (_, body) = post(
            &app,
            "/api/calendar/focus",
            json!({ "focus": focus, "date": "2021-01-01", "granularity": "day" }),
        )
        .await;
        assert_eq!(body, json!({ "focus_date": "2021-01-01", "granularity": "day" }));

        let (status, body) = post(
            &app,
            "/api/calendar/drill-down",
            json!({
                "focus": { "focus_date": "2024-01-17", "granularity": "day" },
                "target": { "kind": "slot", "date": "2024-01-17", "slot": "10:00", "appointment_id": null }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "action": "create_appointment", "date": "2024-01-17", "slot": "10:00" }));
    }

    #[tokio::test]
    async fn drill_down_finds_stored_occupant() {
        let (app, _dir, store) = test_app();
        let tenant = Uuid::new_v4();
        let mut cancelled = appt(tenant, "2024-01-17", "10:00");
        cancelled.status = AppointmentStatus::Cancelled;
        let booked = appt(tenant, "2024-01-17", "10:00:00");
        store
            .save(&Db {
                appointments: vec![cancelled, booked.clone()],
                ..Db::default()
            })
            .unwrap();

        let click = |date: &str| {
            json!({
                "focus": { "focus_date": date, "granularity": "day" },
                "target": { "kind": "slot", "date": date, "slot": "10:00", "appointment_id": null },
                "company_id": tenant
            })
        };

        let (_, body) = post(&app, "/api/calendar/drill-down", click("2024-01-17")).await;
        assert_eq!(body, json!({ "action": "edit_appointment", "appointment_id": booked.id }));

        let (_, body) = post(&app, "/api/calendar/drill-down", click("2024-01-18")).await;
        assert_eq!(body["action"], "create_appointment");
    }

    #[tokio::test]
    async fn drill_down_uses_the_row_the_day_view_shows() {
        let (app, _dir, store) = test_app();
        let tenant = Uuid::new_v4();
        let off_grid = appt(tenant, "2024-01-17", "09:20");
        store
            .save(&Db {
                appointments: vec![off_grid.clone()],
                ..Db::default()
            })
            .unwrap();

        let (_, day) = get(&app, &format!("/api/calendar/day?date=2024-01-17&company_id={tenant}")).await;
        let nine = day["slots"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["slot"] == "09:00")
            .unwrap();
        assert_eq!(nine["occupied"], true);
        assert_eq!(nine["appointments"][0]["end_time"], "09:50");

        let click = |slot: &str| {
            json!({
                "focus": { "focus_date": "2024-01-17", "granularity": "day" },
                "target": { "kind": "slot", "date": "2024-01-17", "slot": slot, "appointment_id": null },
                "company_id": tenant
            })
        };
        let (status, body) = post(&app, "/api/calendar/drill-down", click("09:00")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "action": "edit_appointment", "appointment_id": off_grid.id }));

        let (_, body) = post(&app, "/api/calendar/drill-down", click("09:30")).await;
        assert_eq!(body["action"], "create_appointment");
    }

    #[tokio::test]
    async fn company_hours_shape_its_views() {
        let (app, _dir, store) = test_app();
        let clinic = company(10, 12, 60);
        let evening = appt(clinic.id, "2024-01-17", "08:00");
        let late_morning = appt(clinic.id, "2024-01-17", "11:40");
        store
            .save(&Db {
                companies: vec![clinic.clone()],
                appointments: vec![evening.clone(), late_morning.clone()],
                ..Db::default()
            })
            .unwrap();

        let (status, day) = get(&app, &format!("/api/calendar/day?date=2024-01-17&company_id={}", clinic.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(slot_labels(&day), vec!["10:00", "11:00", "12:00"]);
        assert_eq!(day["outside_hours"][0]["id"], json!(evening.id));
        assert_eq!(day["slots"][1]["appointments"][0]["id"], json!(late_morning.id));

        let (_, week) = get(&app, &format!("/api/calendar/week?date=2024-01-17&company_id={}", clinic.id)).await;
        assert_eq!(slot_labels(&week["days"][0]), vec!["10:00", "11:00", "12:00"]);

        // unscoped views keep the shared 8-18 half-hour grid
        let (_, shared) = get(&app, "/api/calendar/day?date=2024-01-17").await;
        assert_eq!(shared["slots"].as_array().unwrap().len(), 21);
        assert!(shared["outside_hours"].as_array().unwrap().is_empty());

        // drill-down reads the same per-company rows
        let (_, body) = post(
            &app,
            "/api/calendar/drill-down",
            json!({
                "focus": { "focus_date": "2024-01-17", "granularity": "day" },
                "target": { "kind": "slot", "date": "2024-01-17", "slot": "11:00", "appointment_id": null },
                "company_id": clinic.id
            }),
        )
        .await;
        assert_eq!(body, json!({ "action": "edit_appointment", "appointment_id": late_morning.id }));
    }
}
