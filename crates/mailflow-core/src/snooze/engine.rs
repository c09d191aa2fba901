//! Quick snooze menu and content-aware suggestions.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Timelike, Utc, Weekday};

use super::model::{QuickSnoozeOption, SnoozeAlternative, SnoozeRequest, SnoozeSuggestion};
use crate::classify::Priority;
use crate::sla::WorkingHours;

/// Weekday mentions that steer the primary suggestion.
const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Phrases that call for resurfacing the same day.
const SAME_DAY_MARKERS: &[&str] = &["end of day", "eod", "asap", "urgent", "this afternoon"];

/// Local evening hour for the "this evening" quick pick.
const EVENING_HOUR: u32 = 18;

/// Suggests snooze times from message content and priority. Advisory
/// only; it never touches queue state.
#[derive(Debug, Clone, Default)]
pub struct SnoozeEngine {
    working_hours: WorkingHours,
}

impl SnoozeEngine {
    /// Creates an engine that aligns picks to the given working hours.
    #[must_use]
    pub const fn new(working_hours: WorkingHours) -> Self {
        Self { working_hours }
    }

    /// The fixed quick-pick menu, relative to `now`.
    ///
    /// "This evening" is omitted once the evening has passed.
    #[must_use]
    pub fn quick_options(&self, now: DateTime<Utc>) -> Vec<QuickSnoozeOption> {
        let mut options = vec![QuickSnoozeOption {
            label: "Later today".to_string(),
            time: self.later_today(now),
            reason: "a short break from the inbox".to_string(),
        }];

        let evening = day_at(now.date_naive(), EVENING_HOUR);
        if now < evening {
            options.push(QuickSnoozeOption {
                label: "This evening".to_string(),
                time: evening,
                reason: "after the working day".to_string(),
            });
        }

        options.push(QuickSnoozeOption {
            label: "Tomorrow morning".to_string(),
            time: self.tomorrow_morning(now),
            reason: "start of the next day".to_string(),
        });
        options.push(QuickSnoozeOption {
            label: "This weekend".to_string(),
            time: day_at(
                next_weekday(now.date_naive(), Weekday::Sat),
                self.working_hours.start_hour,
            ),
            reason: "when the week is done".to_string(),
        });
        options.push(QuickSnoozeOption {
            label: "Next week".to_string(),
            time: self.next_monday(now),
            reason: "start of next week".to_string(),
        });
        options
    }

    /// Suggest a snooze time for one message.
    ///
    /// Deadline phrasing wins over priority: an explicit weekday or
    /// "tomorrow" in the text steers the pick directly. Alternatives
    /// are the closest quick options that differ from the pick, at
    /// most three.
    #[must_use]
    pub fn suggest(&self, req: &SnoozeRequest) -> SnoozeSuggestion {
        let text = format!("{}\n{}", req.subject, req.body).to_lowercase();

        let (suggested_time, reasoning, confidence) = self.primary_pick(&text, req);

        let alternatives = self
            .quick_options(req.now)
            .into_iter()
            .filter(|o| o.time != suggested_time)
            .take(3)
            .map(|o| SnoozeAlternative {
                label: o.label,
                time: o.time,
            })
            .collect();

        SnoozeSuggestion {
            suggested_time,
            reasoning,
            confidence,
            alternatives,
        }
    }

    fn primary_pick(&self, text: &str, req: &SnoozeRequest) -> (DateTime<Utc>, String, f32) {
        // "tomorrow" first: it is the most common phrasing and an
        // explicit weekday in the same sentence usually restates it.
        if text.contains("tomorrow") {
            return (
                self.tomorrow_morning(req.now),
                "the message points at tomorrow".to_string(),
                0.8,
            );
        }

        for (name, weekday) in WEEKDAYS {
            if text.contains(name) {
                let time = day_at(
                    next_weekday(req.now.date_naive(), *weekday),
                    self.working_hours.start_hour,
                );
                return (
                    time,
                    format!("the message mentions {name}; resurfacing that morning"),
                    0.8,
                );
            }
        }

        if text.contains("next week") {
            return (
                self.next_monday(req.now),
                "the message points at next week".to_string(),
                0.7,
            );
        }

        if SAME_DAY_MARKERS.iter().any(|m| text.contains(m)) {
            return (
                self.later_today(req.now),
                "same-day language in the message".to_string(),
                0.7,
            );
        }

        match req.priority {
            Priority::Critical | Priority::High => (
                self.later_today(req.now),
                "high priority; keep it close".to_string(),
                0.5,
            ),
            Priority::Medium => (
                self.tomorrow_morning(req.now),
                "no deadline found; revisit tomorrow".to_string(),
                0.5,
            ),
            Priority::Low => (
                self.next_monday(req.now),
                "low priority; revisit next week".to_string(),
                0.5,
            ),
        }
    }

    /// Three hours out, clamped into working hours; past the close of
    /// day it becomes tomorrow at opening.
    fn later_today(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let target = now + Duration::hours(3);
        let close = day_at(now.date_naive(), self.working_hours.end_hour);
        if target >= close {
            self.tomorrow_morning(now)
        } else if target.hour() < self.working_hours.start_hour {
            day_at(now.date_naive(), self.working_hours.start_hour)
        } else {
            target
        }
    }

    fn tomorrow_morning(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        day_at(
            now.date_naive() + Days::new(1),
            self.working_hours.start_hour,
        )
    }

    fn next_monday(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        day_at(
            next_weekday(now.date_naive(), Weekday::Mon),
            self.working_hours.start_hour,
        )
    }
}

/// This date at this whole hour, UTC.
#[allow(clippy::expect_used)] // whole hours are always valid times
fn day_at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, 0, 0)
        .expect("whole hour is a valid time")
        .and_utc()
}

/// The next `target` weekday strictly after `date`.
fn next_weekday(date: NaiveDate, target: Weekday) -> NaiveDate {
    let mut d = date + Days::new(1);
    while d.weekday() != target {
        d = d + Days::new(1);
    }
    d
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
            .and_utc()
    }

    fn request(subject: &str, body: &str, priority: Priority, now: DateTime<Utc>) -> SnoozeRequest {
        SnoozeRequest {
            subject: subject.to_string(),
            body: body.to_string(),
            priority,
            now,
        }
    }

    // Wednesday mid-morning.
    fn wednesday() -> DateTime<Utc> {
        utc(2025, 1, 8, 10, 0)
    }

    #[test]
    fn test_quick_options_midmorning() {
        let engine = SnoozeEngine::default();
        let options = engine.quick_options(wednesday());

        let by_label = |label: &str| {
            options
                .iter()
                .find(|o| o.label == label)
                .map(|o| o.time)
                .unwrap()
        };
        assert_eq!(by_label("Later today"), utc(2025, 1, 8, 13, 0));
        assert_eq!(by_label("This evening"), utc(2025, 1, 8, 18, 0));
        assert_eq!(by_label("Tomorrow morning"), utc(2025, 1, 9, 9, 0));
        assert_eq!(by_label("This weekend"), utc(2025, 1, 11, 9, 0));
        assert_eq!(by_label("Next week"), utc(2025, 1, 13, 9, 0));
    }

    #[test]
    fn test_later_today_clamps_past_close() {
        let engine = SnoozeEngine::default();
        // 16:00 + 3h would land after the 17:00 close.
        let options = engine.quick_options(utc(2025, 1, 8, 16, 0));
        assert_eq!(options[0].label, "Later today");
        assert_eq!(options[0].time, utc(2025, 1, 9, 9, 0));
    }

    #[test]
    fn test_evening_option_omitted_late() {
        let engine = SnoozeEngine::default();
        let options = engine.quick_options(utc(2025, 1, 8, 20, 0));
        assert!(options.iter().all(|o| o.label != "This evening"));
    }

    #[test]
    fn test_weekday_mention_steers_pick() {
        let engine = SnoozeEngine::default();
        let suggestion = engine.suggest(&request(
            "Contract",
            "Please have this signed by Friday.",
            Priority::Medium,
            wednesday(),
        ));
        assert_eq!(suggestion.suggested_time, utc(2025, 1, 10, 9, 0));
        assert!((suggestion.confidence - 0.8).abs() < f32::EPSILON);
        assert!(suggestion.reasoning.contains("friday"));
    }

    #[test]
    fn test_tomorrow_mention_wins_over_weekday() {
        let engine = SnoozeEngine::default();
        let suggestion = engine.suggest(&request(
            "Standup",
            "Let's pick this up tomorrow, not Friday.",
            Priority::Medium,
            wednesday(),
        ));
        assert_eq!(suggestion.suggested_time, utc(2025, 1, 9, 9, 0));
    }

    #[test]
    fn test_priority_fallbacks() {
        let engine = SnoozeEngine::default();
        let now = wednesday();

        let high = engine.suggest(&request("Note", "No dates here.", Priority::High, now));
        assert_eq!(high.suggested_time, utc(2025, 1, 8, 13, 0));

        let low = engine.suggest(&request("Note", "No dates here.", Priority::Low, now));
        assert_eq!(low.suggested_time, utc(2025, 1, 13, 9, 0));
    }

    #[test]
    fn test_alternatives_capped_and_distinct() {
        let engine = SnoozeEngine::default();
        let suggestion = engine.suggest(&request(
            "Note",
            "No dates here.",
            Priority::Medium,
            wednesday(),
        ));
        assert!(suggestion.alternatives.len() <= 3);
        for alt in &suggestion.alternatives {
            assert_ne!(alt.time, suggestion.suggested_time);
        }
    }

    #[test]
    fn test_suggestion_is_deterministic() {
        let engine = SnoozeEngine::default();
        let req = request("Contract", "Signed by Friday.", Priority::Medium, wednesday());
        let a = engine.suggest(&req);
        let b = engine.suggest(&req);
        assert_eq!(a.suggested_time, b.suggested_time);
        assert_eq!(a.reasoning, b.reasoning);
    }
}
