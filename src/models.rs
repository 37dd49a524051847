use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::AppointmentStatus;

// Person the appointment is booked for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// One bookable service line on an appointment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceLine {
    pub name: String,
    pub duration_min: i64,
    pub price: f64,
}

// Appointment as it arrives from storage or from a client.
//
// Date and time stay as raw strings: records with bad values are
// reported by the calendar views instead of being rejected on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub appointment_date: String, // "YYYY-MM-DD"
    pub start_time: String,       // "HH:MM" or "HH:MM:SS"
    pub duration_min: i64,
    pub status: AppointmentStatus,
    pub client: Client,
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    pub notes: Option<String>,
}

impl Appointment {
    // Sum of service durations, falling back to the stored duration
    pub fn total_duration_min(&self) -> i64 {
        let from_services = self
            .services
            .iter()
            .fold(0i64, |acc, s| acc.saturating_add(s.duration_min));
        if from_services > 0 {
            from_services
        } else {
            self.duration_min
        }
    }
}

// Entry in a company's service catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogService {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub duration_min: i64,
    pub price: f64,
}

// Registered tenant (clinic, salon, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub tax_id: String,
    pub email: String,
    pub phone: String,
    pub admin_name: String,
    pub admin_email: String,
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: i64,
}

// First column of week and month grids
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

// How month navigation treats a day-of-month the target month lacks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonthStep {
    // Excess days spill into the following month (Jan 31 -> Mar 2/3)
    #[default]
    Rollover,
    // Pin to the target month's last day (Jan 31 -> Feb 28/29)
    Clamp,
}

// Calendar rendering settings, persisted with the data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarSettings {
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    pub slot_minutes: i64,
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default)]
    pub month_step: MonthStep,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            day_start_hour: 8,
            day_end_hour: 18,
            slot_minutes: 30,
            week_start: WeekStart::Sunday,
            month_step: MonthStep::Rollover,
        }
    }
}

impl CalendarSettings {
    // Layout for one tenant: its opening hours and slot length,
    // the shared week start and month stepping
    pub fn for_company(&self, company: &Company) -> Self {
        Self {
            day_start_hour: company.open_hour,
            day_end_hour: company.close_hour,
            slot_minutes: company.slot_minutes,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Db {
    #[serde(default)]
    pub settings: CalendarSettings,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub services: Vec<CatalogService>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}
