/*
Appointment status and its display metadata.
Every view reads labels, colors and icons from the one table below.
*/

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Scheduled,
    Cancelled,
    Completed,
    InProgress,
    NoShow,
    Expired,
    Rescheduled,
    Waitlist,
}

// How a status is shown to the user
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StatusMeta {
    pub status: AppointmentStatus,
    pub label: &'static str,
    pub color: &'static str, // hex, "#RRGGBB"
    pub icon: &'static str,
}

pub static STATUS_TABLE: [StatusMeta; 10] = [
    StatusMeta { status: AppointmentStatus::Pending, label: "Pending", color: "#F59E0B", icon: "clock" },
    StatusMeta { status: AppointmentStatus::Confirmed, label: "Confirmed", color: "#10B981", icon: "check-circle" },
    StatusMeta { status: AppointmentStatus::Scheduled, label: "Scheduled", color: "#3B82F6", icon: "calendar" },
    StatusMeta { status: AppointmentStatus::Cancelled, label: "Cancelled", color: "#EF4444", icon: "x-circle" },
    StatusMeta { status: AppointmentStatus::Completed, label: "Completed", color: "#6B7280", icon: "check-check" },
    StatusMeta { status: AppointmentStatus::InProgress, label: "In progress", color: "#8B5CF6", icon: "play" },
    StatusMeta { status: AppointmentStatus::NoShow, label: "No show", color: "#F97316", icon: "user-x" },
    StatusMeta { status: AppointmentStatus::Expired, label: "Expired", color: "#9CA3AF", icon: "hourglass" },
    StatusMeta { status: AppointmentStatus::Rescheduled, label: "Rescheduled", color: "#06B6D4", icon: "refresh-cw" },
    StatusMeta { status: AppointmentStatus::Waitlist, label: "Waitlist", color: "#A855F7", icon: "list" },
];

impl AppointmentStatus {
    pub fn meta(self) -> &'static StatusMeta {
        // table order follows declaration order
        &STATUS_TABLE[self as usize]
    }

    // No further transitions are expected from these
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Completed | Self::NoShow | Self::Expired
        )
    }

    // Whether the appointment still holds its slot in the calendar
    pub fn occupies_slot(self) -> bool {
        !matches!(
            self,
            Self::Cancelled | Self::Expired | Self::Rescheduled | Self::NoShow | Self::Waitlist
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_status() {
        for (i, meta) in STATUS_TABLE.iter().enumerate() {
            assert_eq!(meta.status as usize, i);
            assert_eq!(meta.status.meta(), meta);
        }
    }

    #[test]
    fn snake_case_on_the_wire() {
        let s = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(s, "\"no_show\"");
        let back: AppointmentStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(back, AppointmentStatus::InProgress);
        assert!(serde_json::from_str::<AppointmentStatus>("\"lost\"").is_err());
    }

    #[test]
    fn slot_occupancy() {
        assert!(AppointmentStatus::Confirmed.occupies_slot());
        assert!(!AppointmentStatus::Waitlist.occupies_slot());
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(!AppointmentStatus::Pending.is_terminal());
    }
}
