//! SLA configuration and status models.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::classify::Priority;

/// Live status of an item's response-time obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    /// Comfortably inside the allowance.
    OnTime,
    /// Less than the at-risk fraction of the allowance remains.
    AtRisk,
    /// The deadline has passed.
    Overdue,
}

impl SlaStatus {
    /// Parse from storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "on_time" => Some(Self::OnTime),
            "at_risk" => Some(Self::AtRisk),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    /// Convert to storage string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "on_time",
            Self::AtRisk => "at_risk",
            Self::Overdue => "overdue",
        }
    }
}

/// Daily hour range inside which deadline time accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    /// First working hour of the day (0..=23).
    pub start_hour: u32,
    /// Hour the working day ends, exclusive (1..=24).
    pub end_hour: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
        }
    }
}

/// Response-time policy: per-priority allowances plus working-hours and
/// weekend handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    /// Allowance for critical items, in hours.
    pub critical_hours: f32,
    /// Allowance for high-priority items, in hours.
    pub high_hours: f32,
    /// Allowance for medium-priority items, in hours.
    pub medium_hours: f32,
    /// Allowance for low-priority items, in hours.
    pub low_hours: f32,
    /// When set, deadline arithmetic clamps into this daily window.
    pub working_hours: Option<WorkingHours>,
    /// Skip Saturdays and Sundays when accruing deadline time.
    pub skip_weekends: bool,
    /// Fraction of the allowance below which an item is at risk.
    pub at_risk_fraction: f32,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical_hours: 4.0,
            high_hours: 24.0,
            medium_hours: 72.0,
            low_hours: 168.0,
            working_hours: None,
            skip_weekends: false,
            at_risk_fraction: 0.2,
        }
    }
}

impl SlaPolicy {
    /// Base allowance for a priority, in hours.
    #[must_use]
    pub const fn allowance_hours(&self, priority: Priority) -> f32 {
        match priority {
            Priority::Critical => self.critical_hours,
            Priority::High => self.high_hours,
            Priority::Medium => self.medium_hours,
            Priority::Low => self.low_hours,
        }
    }

    /// The daily accrual window; a full day when no working hours are
    /// configured, or when the configured range is empty or out of
    /// bounds (a window that never opens would never accrue time).
    #[must_use]
    pub fn window(&self) -> (u32, u32) {
        match self.working_hours {
            Some(w) if w.start_hour < 24 && w.end_hour <= 24 && w.start_hour < w.end_hour => {
                (w.start_hour, w.end_hour)
            }
            _ => (0, 24),
        }
    }

    /// Whether deadline time accrues on the given date.
    #[must_use]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.skip_weekends || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [SlaStatus::OnTime, SlaStatus::AtRisk, SlaStatus::Overdue] {
            assert_eq!(SlaStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SlaStatus::parse("late"), None);
    }

    #[test]
    fn test_allowance_table() {
        let policy = SlaPolicy::default();
        assert!((policy.allowance_hours(Priority::Critical) - 4.0).abs() < f32::EPSILON);
        assert!((policy.allowance_hours(Priority::Low) - 168.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_window_rejects_degenerate_ranges() {
        let mut policy = SlaPolicy::default();
        assert_eq!(policy.window(), (0, 24));

        policy.working_hours = Some(WorkingHours {
            start_hour: 9,
            end_hour: 17,
        });
        assert_eq!(policy.window(), (9, 17));

        for bad in [
            WorkingHours {
                start_hour: 17,
                end_hour: 17,
            },
            WorkingHours {
                start_hour: 17,
                end_hour: 9,
            },
            WorkingHours {
                start_hour: 25,
                end_hour: 26,
            },
        ] {
            policy.working_hours = Some(bad);
            assert_eq!(policy.window(), (0, 24));
        }
    }

    #[test]
    fn test_working_day() {
        let mut policy = SlaPolicy::default();
        let saturday = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        assert!(policy.is_working_day(saturday));

        policy.skip_weekends = true;
        assert!(!policy.is_working_day(saturday));
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert!(policy.is_working_day(monday));
    }
}
