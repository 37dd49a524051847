/*
Company registration wizard.
Steps run in a fixed order and a step can only be left forward
once its own fields pass validation.
*/

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::grid::time_slots;
use crate::models::Company;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Company,
    Contact,
    Admin,
    Schedule,
    Review,
    Completed,
}

impl RegistrationStep {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Company => Some(Self::Contact),
            Self::Contact => Some(Self::Admin),
            Self::Admin => Some(Self::Schedule),
            Self::Schedule => Some(Self::Review),
            Self::Review => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Company | Self::Contact => Self::Company,
            Self::Admin => Self::Contact,
            Self::Schedule => Self::Admin,
            Self::Review => Self::Schedule,
            Self::Completed => Self::Completed,
        }
    }

    // 1-based position shown in the progress bar
    pub fn number(self) -> u8 {
        match self {
            Self::Company => 1,
            Self::Contact => 2,
            Self::Admin => 3,
            Self::Schedule => 4,
            Self::Review | Self::Completed => 5,
        }
    }
}

// Everything the form collects across the five steps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationDraft {
    pub company_name: String,
    pub tax_id: String,
    pub email: String,
    pub phone: String,
    pub admin_name: String,
    pub admin_email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub password_confirmation: String,
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: i64,
    pub accepted_terms: bool,
}

impl Default for RegistrationDraft {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            tax_id: String::new(),
            email: String::new(),
            phone: String::new(),
            admin_name: String::new(),
            admin_email: String::new(),
            password: String::new(),
            password_confirmation: String::new(),
            open_hour: 8,
            close_hour: 18,
            slot_minutes: 30,
            accepted_terms: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub step: RegistrationStep,
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("step has invalid fields")]
    Invalid(Vec<FieldError>),

    #[error("registration is already completed")]
    AlreadyCompleted,

    #[error("registration can only be submitted from review, not {0:?}")]
    NotAtReview(RegistrationStep),
}

pub const MIN_PASSWORD_LEN: usize = 8;
const MIN_PHONE_DIGITS: usize = 7;

fn looks_like_email(s: &str) -> bool {
    match s.trim().split_once('@') {
        Some((user, domain)) => {
            !user.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// Field errors for one step; empty means the step may be left forward.
pub fn validate_step(step: RegistrationStep, draft: &RegistrationDraft) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let mut fail = |field, message| errors.push(FieldError { step, field, message });

    match step {
        RegistrationStep::Company => {
            if draft.company_name.trim().is_empty() {
                fail("company_name", "company name required");
            }
            if draft.tax_id.trim().is_empty() {
                fail("tax_id", "tax id required");
            }
        }
        RegistrationStep::Contact => {
            if !looks_like_email(&draft.email) {
                fail("email", "invalid email");
            }
            let digits = draft.phone.chars().filter(char::is_ascii_digit).count();
            if digits < MIN_PHONE_DIGITS {
                fail("phone", "phone must have at least 7 digits");
            }
        }
        RegistrationStep::Admin => {
            if draft.admin_name.trim().is_empty() {
                fail("admin_name", "admin name required");
            }
            if !looks_like_email(&draft.admin_email) {
                fail("admin_email", "invalid email");
            }
            if draft.password.chars().count() < MIN_PASSWORD_LEN {
                fail("password", "password must have at least 8 characters");
            }
            if draft.password != draft.password_confirmation {
                fail("password_confirmation", "passwords do not match");
            }
        }
        RegistrationStep::Schedule => {
            if draft.open_hour >= draft.close_hour || draft.close_hour > 24 {
                fail("close_hour", "closing hour must be after opening hour");
            }
            if time_slots(0, 1, draft.slot_minutes).is_err() {
                fail("slot_minutes", "slot length must divide an hour or be whole hours");
            }
        }
        RegistrationStep::Review => {
            if !draft.accepted_terms {
                fail("accepted_terms", "terms must be accepted");
            }
        }
        RegistrationStep::Completed => {}
    }

    errors
}

pub fn advance(
    step: RegistrationStep,
    draft: &RegistrationDraft,
) -> Result<RegistrationStep, WizardError> {
    let next = step.next().ok_or(WizardError::AlreadyCompleted)?;
    let errors = validate_step(step, draft);
    if errors.is_empty() {
        Ok(next)
    } else {
        Err(WizardError::Invalid(errors))
    }
}

pub fn back(step: RegistrationStep) -> RegistrationStep {
    step.prev()
}

/// Turn a reviewed draft into a company.
///
/// Every step is checked again; a client cannot skip one by posting
/// `review` directly.
pub fn complete(step: RegistrationStep, draft: &RegistrationDraft) -> Result<Company, WizardError> {
    if step != RegistrationStep::Review {
        return Err(WizardError::NotAtReview(step));
    }

    let errors: Vec<FieldError> = [
        RegistrationStep::Company,
        RegistrationStep::Contact,
        RegistrationStep::Admin,
        RegistrationStep::Schedule,
        RegistrationStep::Review,
    ]
    .into_iter()
    .flat_map(|s| validate_step(s, draft))
    .collect();
    if !errors.is_empty() {
        return Err(WizardError::Invalid(errors));
    }

    Ok(Company {
        id: Uuid::new_v4(),
        name: draft.company_name.trim().to_string(),
        tax_id: draft.tax_id.trim().to_string(),
        email: draft.email.trim().to_string(),
        phone: draft.phone.trim().to_string(),
        admin_name: draft.admin_name.trim().to_string(),
        admin_email: draft.admin_email.trim().to_string(),
        open_hour: draft.open_hour,
        close_hour: draft.close_hour,
        slot_minutes: draft.slot_minutes,
    })
}
