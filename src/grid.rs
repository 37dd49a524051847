/*
Calendar grid logic: time slots, month/week layouts and appointment bucketing.
Module is written independently from HTTP / Axum for testing.
*/

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Timelike};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::CalendarError;
use crate::models::{Appointment, CalendarSettings, WeekStart};

pub const GRID_WEEKS: usize = 6;
pub const GRID_CELLS: usize = GRID_WEEKS * 7;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

// Which raw field of a record could not be read
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    AppointmentDate,
    StartTime,
}

// Non-fatal: the record is left out of every bucket and reported once
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MalformedRecordWarning {
    pub appointment_id: Uuid,
    pub field: RecordField,
    pub value: String,
}

// One day in the 6x7 month matrix
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub is_today: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Vec<DayCell>>, // always 6 rows of 7
}

impl MonthGrid {
    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flatten()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthViewCell<'a> {
    #[serde(flatten)]
    pub cell: DayCell,
    #[serde(serialize_with = "with_end_times")]
    pub appointments: Vec<&'a Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView<'a> {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Vec<MonthViewCell<'a>>>,
    pub warnings: Vec<MalformedRecordWarning>,
}

// One time-slot row of a day column
#[derive(Debug, Clone, Serialize)]
pub struct SlotRow<'a> {
    pub slot: String, // "HH:MM"
    pub occupied: bool,
    #[serde(serialize_with = "with_end_times")]
    pub appointments: Vec<&'a Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayColumn<'a> {
    pub date: NaiveDate,
    pub is_today: bool,
    pub slots: Vec<SlotRow<'a>>,
    // starts before the first slot or after the last one ends
    #[serde(serialize_with = "with_end_times")]
    pub outside_hours: Vec<&'a Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekView<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DayColumn<'a>>,
    pub warnings: Vec<MalformedRecordWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView<'a> {
    #[serde(flatten)]
    pub column: DayColumn<'a>,
    pub warnings: Vec<MalformedRecordWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgendaView<'a> {
    #[serde(serialize_with = "with_end_times")]
    pub appointments: Vec<&'a Appointment>,
    pub warnings: Vec<MalformedRecordWarning>,
}

// Appointment as sent to clients, with its derived end time
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentOut<'a> {
    #[serde(flatten)]
    pub appointment: &'a Appointment,
    pub end_time: Option<String>, // "HH:MM", null when start or duration is unusable
}

impl<'a> From<&'a Appointment> for AppointmentOut<'a> {
    fn from(appointment: &'a Appointment) -> Self {
        Self {
            appointment,
            end_time: end_time(appointment).map(slot_label),
        }
    }
}

fn with_end_times<S: Serializer>(list: &[&Appointment], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(list.iter().map(|a| AppointmentOut::from(*a)))
}

// Appointment with its date and start time already parsed
#[derive(Debug, Clone, Copy)]
struct Placed<'a> {
    appt: &'a Appointment,
    date: NaiveDate,
    start: NaiveTime,
}

/// Build the time-slot sequence from `start_hour` to `end_hour`, both inclusive.
///
/// The step must divide an hour or be a whole number of hours, so slots
/// always line up with hour boundaries. Hour 24 is allowed as an end but
/// midnight is never emitted twice.
pub fn time_slots(
    start_hour: u32,
    end_hour: u32,
    step_minutes: i64,
) -> Result<Vec<NaiveTime>, CalendarError> {
    if step_minutes <= 0 {
        return Err(CalendarError::Configuration(format!(
            "slot step must be positive, got {step_minutes}"
        )));
    }
    if start_hour > end_hour {
        return Err(CalendarError::Configuration(format!(
            "start hour {start_hour} is after end hour {end_hour}"
        )));
    }
    if end_hour > 24 {
        return Err(CalendarError::Configuration(format!(
            "end hour {end_hour} is past the end of the day"
        )));
    }
    if step_minutes > MINUTES_PER_DAY {
        return Err(CalendarError::Configuration(format!(
            "slot step {step_minutes} is longer than a day"
        )));
    }
    if 60 % step_minutes != 0 && step_minutes % 60 != 0 {
        return Err(CalendarError::Configuration(format!(
            "slot step {step_minutes} does not align with hour boundaries"
        )));
    }

    let first = i64::from(start_hour) * 60;
    let last = (i64::from(end_hour) * 60).min(MINUTES_PER_DAY - 1);

    let mut slots = Vec::new();
    let mut minute = first;
    while minute <= last {
        // minute < 1440 here, so the conversion cannot fail
        if let Some(t) = NaiveTime::from_num_seconds_from_midnight_opt((minute * 60) as u32, 0) {
            slots.push(t);
        }
        // both terms are at most a day, no overflow
        minute += step_minutes;
    }
    Ok(slots)
}

// "HH:MM" label used on the wire
pub fn slot_label(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Read a calendar date from `YYYY-MM-DD` or an ISO date-time.
///
/// Only the date components are used; no timezone conversion happens,
/// so `2024-01-15T23:30:00Z` is still the 15th.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    let rest = &raw[10..];
    if !rest.is_empty() && !rest.starts_with(['T', ' ']) {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Read a time-of-day from its first two colon-delimited components.
///
/// `"09:00"`, `"9:00"` and `"09:00:00"` all give 09:00. Anything without
/// a colon, with non-digit components or out of range gives `None`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let mut parts = raw.trim().split(':');
    let hours = parts.next()?;
    let minutes = parts.next()?;

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return None;
    }

    let h: u32 = hours.parse().ok()?;
    let m: u32 = minutes.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

// Canonical "HH:MM" form of a start time string
pub fn truncate_time(raw: &str) -> Option<String> {
    parse_time(raw).map(slot_label)
}

// End time derived from start time and the services booked.
// Wraps past midnight; durations outside one day give None.
pub fn end_time(appt: &Appointment) -> Option<NaiveTime> {
    let start = parse_time(&appt.start_time)?;
    let minutes = appt.total_duration_min();
    if !(0..=MINUTES_PER_DAY).contains(&minutes) {
        return None;
    }
    let (end, _wrapped) = start.overflowing_add_signed(Duration::minutes(minutes));
    Some(end)
}

fn place(appt: &Appointment) -> Result<Placed<'_>, MalformedRecordWarning> {
    let Some(date) = parse_date(&appt.appointment_date) else {
        return Err(MalformedRecordWarning {
            appointment_id: appt.id,
            field: RecordField::AppointmentDate,
            value: appt.appointment_date.clone(),
        });
    };
    let Some(start) = parse_time(&appt.start_time) else {
        return Err(MalformedRecordWarning {
            appointment_id: appt.id,
            field: RecordField::StartTime,
            value: appt.start_time.clone(),
        });
    };
    Ok(Placed { appt, date, start })
}

// Parse every record once; input order is kept
fn place_all(appointments: &[Appointment]) -> (Vec<Placed<'_>>, Vec<MalformedRecordWarning>) {
    let mut placed = Vec::with_capacity(appointments.len());
    let mut warnings = Vec::new();
    for appt in appointments {
        match place(appt) {
            Ok(p) => placed.push(p),
            Err(w) => warnings.push(w),
        }
    }
    (placed, warnings)
}

// Days between the week's first day and `date`
fn week_offset(date: NaiveDate, week_start: WeekStart) -> i64 {
    let n = match week_start {
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        WeekStart::Monday => date.weekday().num_days_from_monday(),
    };
    i64::from(n)
}

pub fn week_start_of(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    date - Duration::days(week_offset(date, week_start))
}

// The 7 dates of the week containing `focus`
pub fn week_days(focus: NaiveDate, week_start: WeekStart) -> [NaiveDate; 7] {
    let start = week_start_of(focus, week_start);
    std::array::from_fn(|i| start + Duration::days(i as i64))
}

// Month matrix with `is_today` taken from the local clock at call time
pub fn month_grid(focus: NaiveDate, week_start: WeekStart) -> MonthGrid {
    month_grid_at(focus, week_start, Local::now().date_naive())
}

/// 42-cell grid for the month containing `focus`.
///
/// Starts on the week boundary on or before the 1st and is padded with
/// days of the neighbouring months, whatever the month length.
pub fn month_grid_at(focus: NaiveDate, week_start: WeekStart, today: NaiveDate) -> MonthGrid {
    // day 1 exists in every month
    let first = focus - Duration::days(i64::from(focus.day0()));
    let grid_start = week_start_of(first, week_start);

    let cells: Vec<DayCell> = (0..GRID_CELLS as i64)
        .map(|i| {
            let date = grid_start + Duration::days(i);
            DayCell {
                date,
                is_current_month: date.month() == focus.month() && date.year() == focus.year(),
                is_today: date == today,
            }
        })
        .collect();

    MonthGrid {
        year: focus.year(),
        month: focus.month(),
        weeks: cells.chunks(7).map(<[DayCell]>::to_vec).collect(),
    }
}

/// Appointments on `date`, in input order.
///
/// Records with an unreadable date or start time are never included.
pub fn bucket_appointments(appointments: &[Appointment], date: NaiveDate) -> Vec<&Appointment> {
    appointments
        .iter()
        .filter_map(|a| place(a).ok())
        .filter(|p| p.date == date)
        .map(|p| p.appt)
        .collect()
}

// Appointments on `date` whose start time truncates to `slot`
pub fn bucket_by_time_slot<'a>(
    appointments: &'a [Appointment],
    date: NaiveDate,
    slot: &str,
) -> Vec<&'a Appointment> {
    let Some(slot) = parse_time(slot) else {
        return Vec::new();
    };
    appointments
        .iter()
        .filter_map(|a| place(a).ok())
        .filter(|p| p.date == date && p.start == slot)
        .map(|p| p.appt)
        .collect()
}

/// Every appointment, ascending by `(date, start time)`.
///
/// The sort is stable. Nothing is filtered: records whose date or time
/// cannot be read go to the end in their original order.
pub fn agenda_order(appointments: &[Appointment]) -> Vec<&Appointment> {
    let mut keyed: Vec<(Option<(NaiveDate, NaiveTime)>, &Appointment)> = appointments
        .iter()
        .map(|a| (place(a).ok().map(|p| (p.date, p.start)), a))
        .collect();
    keyed.sort_by_key(|(key, _)| (key.is_none(), *key));
    keyed.into_iter().map(|(_, a)| a).collect()
}

pub fn month_view<'a>(
    appointments: &'a [Appointment],
    focus: NaiveDate,
    settings: &CalendarSettings,
    today: NaiveDate,
) -> MonthView<'a> {
    let grid = month_grid_at(focus, settings.week_start, today);
    let (placed, warnings) = place_all(appointments);

    let weeks = grid
        .weeks
        .iter()
        .map(|week| {
            week.iter()
                .map(|cell| MonthViewCell {
                    cell: *cell,
                    appointments: placed
                        .iter()
                        .filter(|p| p.date == cell.date)
                        .map(|p| p.appt)
                        .collect(),
                })
                .collect()
        })
        .collect();

    MonthView {
        year: grid.year,
        month: grid.month,
        weeks,
        warnings,
    }
}

// Slot rows of one day: the slot starts plus where the last row stops
struct SlotLayout {
    slots: Vec<NaiveTime>,
    last_end: i64, // seconds from midnight, exclusive
}

impl SlotLayout {
    fn new(settings: &CalendarSettings) -> Result<Self, CalendarError> {
        let slots = time_slots(settings.day_start_hour, settings.day_end_hour, settings.slot_minutes)?;
        let day_end = i64::from(settings.day_end_hour) * 3600;
        let last_start = slots
            .last()
            .map_or(0, |t| i64::from(t.num_seconds_from_midnight()));

        // a slot starting on the closing hour keeps its full length,
        // otherwise the last row stops at the closing hour
        let full = last_start + settings.slot_minutes * 60;
        let last_end = if last_start >= day_end { full } else { full.min(day_end) };
        Ok(Self { slots, last_end })
    }

    // Index of the slot holding `t`, or None when outside the day's hours
    fn index_of(&self, t: NaiveTime) -> Option<usize> {
        let first = *self.slots.first()?;
        if t < first || i64::from(t.num_seconds_from_midnight()) >= self.last_end {
            return None;
        }
        Some(self.slots.partition_point(|s| *s <= t) - 1)
    }
}

/// Appointments filed under the day-view row `slot` on `date`.
///
/// Uses the same containing-slot rule as the week and day views, so a
/// 09:20 start occupies the 09:00 row of a half-hour grid. A `slot` that
/// is not one of the row starts has no occupants.
pub fn slot_occupants<'a>(
    appointments: &'a [Appointment],
    date: NaiveDate,
    slot: &str,
    settings: &CalendarSettings,
) -> Result<Vec<&'a Appointment>, CalendarError> {
    let layout = SlotLayout::new(settings)?;
    let Some(row) = parse_time(slot).and_then(|t| layout.slots.iter().position(|s| *s == t)) else {
        return Ok(Vec::new());
    };

    Ok(appointments
        .iter()
        .filter_map(|a| place(a).ok())
        .filter(|p| p.date == date && layout.index_of(p.start) == Some(row))
        .map(|p| p.appt)
        .collect())
}

fn day_column<'a>(
    date: NaiveDate,
    placed: &[Placed<'a>],
    layout: &SlotLayout,
    today: NaiveDate,
) -> DayColumn<'a> {
    let mut rows: Vec<SlotRow<'a>> = layout
        .slots
        .iter()
        .map(|s| SlotRow {
            slot: slot_label(*s),
            occupied: false,
            appointments: Vec::new(),
        })
        .collect();
    let mut outside_hours = Vec::new();

    for p in placed.iter().filter(|p| p.date == date) {
        match layout.index_of(p.start) {
            Some(i) => {
                let row = &mut rows[i];
                row.occupied |= p.appt.status.occupies_slot();
                row.appointments.push(p.appt);
            }
            None => outside_hours.push(p.appt),
        }
    }

    DayColumn {
        date,
        is_today: date == today,
        slots: rows,
        outside_hours,
    }
}

pub fn week_view<'a>(
    appointments: &'a [Appointment],
    focus: NaiveDate,
    settings: &CalendarSettings,
    today: NaiveDate,
) -> Result<WeekView<'a>, CalendarError> {
    let layout = SlotLayout::new(settings)?;
    let (placed, warnings) = place_all(appointments);
    let days = week_days(focus, settings.week_start);

    Ok(WeekView {
        start: days[0],
        end: days[6],
        days: days
            .iter()
            .map(|d| day_column(*d, &placed, &layout, today))
            .collect(),
        warnings,
    })
}

pub fn day_view<'a>(
    appointments: &'a [Appointment],
    focus: NaiveDate,
    settings: &CalendarSettings,
    today: NaiveDate,
) -> Result<DayView<'a>, CalendarError> {
    let layout = SlotLayout::new(settings)?;
    let (placed, warnings) = place_all(appointments);

    Ok(DayView {
        column: day_column(focus, &placed, &layout, today),
        warnings,
    })
}

// Flat chronological list of every well-formed appointment
pub fn agenda_view(appointments: &[Appointment]) -> AgendaView<'_> {
    let (mut placed, warnings) = place_all(appointments);
    placed.sort_by_key(|p| (p.date, p.start));
    AgendaView {
        appointments: placed.into_iter().map(|p| p.appt).collect(),
        warnings,
    }
}
