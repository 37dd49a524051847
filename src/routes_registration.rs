// --------------------------------------------------
// Handles the company registration wizard.
//
// The client keeps the draft and the current step; every
// request is checked against the step's rules here.
// -------------------------------------------------

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::wizard::{self, RegistrationDraft, RegistrationStep};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StepInput {
    pub step: RegistrationStep,
    #[serde(default)]
    pub draft: RegistrationDraft,
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub step: RegistrationStep,
    pub number: u8,
}

impl From<RegistrationStep> for StepResponse {
    fn from(step: RegistrationStep) -> Self {
        Self {
            step,
            number: step.number(),
        }
    }
}

// -----------------------------
// POST /api/registration/advance
// Next step, or 422 with the fields to fix
// -----------------------------
pub async fn advance(Json(input): Json<StepInput>) -> Result<Json<StepResponse>, ApiError> {
    let next = wizard::advance(input.step, &input.draft)?;
    Ok(Json(next.into()))
}

// -----------------------------
// POST /api/registration/back
// -----------------------------
pub async fn back(Json(input): Json<StepInput>) -> Json<StepResponse> {
    Json(wizard::back(input.step).into())
}

// -----------------------------
// POST /api/registration/submit
// Creates the company from a reviewed draft
// -----------------------------
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<StepInput>,
) -> Result<impl IntoResponse, ApiError> {
    let company = wizard::complete(input.step, &input.draft)?;

    let _guard = state.store.lock().await;
    let mut db = state.store.load()?;

    if db
        .companies
        .iter()
        .any(|c| c.tax_id.eq_ignore_ascii_case(&company.tax_id))
    {
        return Err(ApiError::Conflict("a company with this tax id already exists".to_string()));
    }

    db.companies.push(company.clone());
    state.store.save(&db)?;

    tracing::info!(company_id = %company.id, name = %company.name, "company registered");
    Ok((StatusCode::CREATED, Json(company)))
}
