//! SLA clock
//!
//! Pure deadline arithmetic over calendar dates. No state, no side
//! effects; safe to evaluate anywhere without locking.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SLA status of an open stage relative to its due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlaStatus {
    /// More than one day remaining
    Normal,
    /// Due today or tomorrow
    Warning,
    /// Due date has passed
    Overdue,
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlaStatus::Normal => "NORMAL",
            SlaStatus::Warning => "WARNING",
            SlaStatus::Overdue => "OVERDUE",
        };
        write!(f, "{}", s)
    }
}

/// Due date for a stage entered at the given instant.
///
/// Computed once at stage entry and never recomputed for the life of
/// that stage.
pub fn due_date_after(entered: DateTime<Utc>, sla_days: u32) -> NaiveDate {
    (entered + Duration::days(i64::from(sla_days))).date_naive()
}

/// SLA status of a due date as of the given day
pub fn calculate_sla_status(due_date: NaiveDate, today: NaiveDate) -> SlaStatus {
    let remaining = (due_date - today).num_days();
    if remaining < 0 {
        SlaStatus::Overdue
    } else if remaining <= 1 {
        SlaStatus::Warning
    } else {
        SlaStatus::Normal
    }
}

/// Display label for a due date: D-{n} with n days remaining, D+{n} when
/// n days overdue
pub fn sla_label(due_date: NaiveDate, today: NaiveDate) -> String {
    let remaining = (due_date - today).num_days();
    if remaining < 0 {
        format!("D+{}", -remaining)
    } else {
        format!("D-{}", remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sla_boundaries() {
        let today = day(2026, 8, 29);

        assert_eq!(calculate_sla_status(today, today), SlaStatus::Warning);
        assert_eq!(calculate_sla_status(day(2026, 8, 30), today), SlaStatus::Warning);
        assert_eq!(calculate_sla_status(day(2026, 8, 28), today), SlaStatus::Overdue);
        assert_eq!(calculate_sla_status(day(2026, 8, 31), today), SlaStatus::Normal);
    }

    #[test]
    fn test_labels() {
        let today = day(2026, 8, 29);

        assert_eq!(sla_label(today, today), "D-0");
        assert_eq!(sla_label(day(2026, 8, 31), today), "D-2");
        assert_eq!(sla_label(day(2026, 8, 27), today), "D+2");
    }

    #[test]
    fn test_due_date_after() {
        let entered = DateTime::parse_from_rfc3339("2026-08-29T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(due_date_after(entered, 2), day(2026, 8, 31));
        assert_eq!(due_date_after(entered, 0), day(2026, 8, 29));
    }
}
