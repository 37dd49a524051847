/*
Calendar focus and the transitions between views.
Every operation takes a focus by value and returns a new one.
*/

use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MonthStep;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Month,
    Week,
    Day,
    Agenda,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Prev,
    Next,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarFocus {
    pub focus_date: NaiveDate,
    pub granularity: Granularity,
}

impl CalendarFocus {
    // Initial state when a calendar view opens
    pub fn today(granularity: Granularity) -> Self {
        Self {
            focus_date: Local::now().date_naive(),
            granularity,
        }
    }
}

// Cell the user clicked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellTarget {
    Day {
        date: NaiveDate,
    },
    Slot {
        date: NaiveDate,
        slot: String, // "HH:MM"
        appointment_id: Option<Uuid>,
    },
}

// Result of a click: a new focus, or a request for the create/edit forms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DrillOutcome {
    Focus { focus: CalendarFocus },
    CreateAppointment { date: NaiveDate, slot: String },
    EditAppointment { appointment_id: Uuid },
    Unchanged { focus: CalendarFocus },
}

fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    let step = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(step)
    } else {
        date.checked_sub_days(step)
    };
    shifted.unwrap_or(date)
}

fn last_day_of_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(31, |d| d.day())
}

/// Move `date` by `delta` calendar months.
///
/// With `MonthStep::Rollover` the day-of-month is kept and any excess over
/// the target month's length spills into the month after it, so Jan 31 + 1
/// lands on Mar 2 (leap year) or Mar 3. `MonthStep::Clamp` stops at the
/// target month's last day instead.
pub fn shift_month(date: NaiveDate, delta: i32, step: MonthStep) -> NaiveDate {
    let total_months = date.year() * 12 + date.month0() as i32 + delta;
    let year = total_months.div_euclid(12);
    let month = total_months.rem_euclid(12) as u32 + 1;

    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return date;
    };

    match step {
        MonthStep::Rollover => shift_days(first, i64::from(date.day0())),
        MonthStep::Clamp => {
            let day = date.day().min(last_day_of_month(first));
            first.with_day(day).unwrap_or(first)
        }
    }
}

pub fn navigate(focus: CalendarFocus, direction: Direction, month_step: MonthStep) -> CalendarFocus {
    let sign = match direction {
        Direction::Prev => -1,
        Direction::Next => 1,
    };

    let focus_date = match focus.granularity {
        Granularity::Month => shift_month(focus.focus_date, sign, month_step),
        Granularity::Week => shift_days(focus.focus_date, 7 * i64::from(sign)),
        Granularity::Day => shift_days(focus.focus_date, i64::from(sign)),
        // agenda lists everything, there is nothing to page through
        Granularity::Agenda => focus.focus_date,
    };

    CalendarFocus { focus_date, ..focus }
}

pub fn go_to_today(focus: CalendarFocus) -> CalendarFocus {
    CalendarFocus {
        focus_date: Local::now().date_naive(),
        ..focus
    }
}

pub fn jump_to(focus: CalendarFocus, date: NaiveDate) -> CalendarFocus {
    CalendarFocus {
        focus_date: date,
        ..focus
    }
}

pub fn with_granularity(focus: CalendarFocus, granularity: Granularity) -> CalendarFocus {
    CalendarFocus {
        granularity,
        ..focus
    }
}

/// Apply a click on a grid cell.
///
/// month + day cell zooms into that day's week, week + slot zooms into that
/// day. In day view a slot click asks for the create form when the slot is
/// empty and for the edit form when it holds an appointment. Any other
/// combination leaves the focus unchanged.
pub fn drill_down(focus: CalendarFocus, target: &CellTarget) -> DrillOutcome {
    match (focus.granularity, target) {
        (Granularity::Month, CellTarget::Day { date }) => DrillOutcome::Focus {
            focus: CalendarFocus {
                focus_date: *date,
                granularity: Granularity::Week,
            },
        },
        (Granularity::Week, CellTarget::Slot { date, .. }) => DrillOutcome::Focus {
            focus: CalendarFocus {
                focus_date: *date,
                granularity: Granularity::Day,
            },
        },
        (Granularity::Day, CellTarget::Slot { appointment_id: Some(id), .. }) => {
            DrillOutcome::EditAppointment { appointment_id: *id }
        }
        (Granularity::Day, CellTarget::Slot { date, slot, appointment_id: None }) => {
            DrillOutcome::CreateAppointment {
                date: *date,
                slot: slot.clone(),
            }
        }
        _ => DrillOutcome::Unchanged { focus },
    }
}
