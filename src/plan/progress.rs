use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::error::{Error, Result};
use crate::plan::schedule::Schedule;

/// Lifecycle of a single schedule day.
///
/// The clock drives `Locked -> Unlocked` (forward only); `mark_watched`
/// drives `Unlocked -> InProgress -> Completed`. The watched count never
/// decreases except through an explicit progress reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DayStatus {
    Locked,
    Unlocked,
    InProgress,
    Completed,
}

/// Per-plan watch progress, persisted alongside the schedule and mutated by
/// every mark-watched / view-day action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Fixed at plan creation; anchors the current-day computation. Used as
    /// the raw timestamp, not truncated to midnight. Absent until the first
    /// plan save.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    /// Days the user has opened. Unordered set semantics.
    pub viewed_days: BTreeSet<u32>,
    /// Watched item indices per day, always a prefix of that day's bucket.
    pub watched: BTreeMap<u32, Vec<usize>>,
}

impl ProgressState {
    pub fn new(start_date: OffsetDateTime) -> Self {
        Self {
            start_date: Some(start_date),
            ..Self::default()
        }
    }

    /// The 1-based day the plan is on at `now`, clamped to 1 when the clock
    /// is behind the start date. Without a start date the plan is on day 1.
    pub fn current_day(&self, now: OffsetDateTime) -> u32 {
        let Some(start) = self.start_date else {
            return 1;
        };
        let elapsed = (now - start).whole_days();
        if elapsed < 0 { 1 } else { elapsed as u32 + 1 }
    }

    /// A day is accessible once the current day reaches it; pure in the day
    /// numbers, independent of watch state.
    pub fn is_day_unlocked(day: u32, current_day: u32) -> bool {
        day >= 1 && day <= current_day
    }

    /// Mark the item at `index` of `day`'s bucket as watched.
    ///
    /// Sequential-unlock policy: only the next unwatched index is accepted.
    /// Re-marking an already watched index is an idempotent no-op and an
    /// out-of-order mark is rejected as a no-op; both return `false`. An
    /// index beyond the day's bucket is an error.
    pub fn mark_watched(&mut self, schedule: &Schedule, day: u32, index: usize) -> Result<bool> {
        let bucket = schedule
            .get(&day)
            .ok_or_else(|| Error::NotFound(format!("no schedule entry for day {day}")))?;
        if index >= bucket.len() {
            return Err(Error::InvalidInput(format!(
                "day {day} has {} videos, no index {index}",
                bucket.len()
            )));
        }
        let watched = self.watched.entry(day).or_default();
        // anything but the next expected index is a no-op: already watched
        // or ahead of the sequential unlock
        if index != watched.len() {
            return Ok(false);
        }
        watched.push(index);
        Ok(true)
    }

    /// Record that a day was opened. Returns `false` if it already was.
    pub fn view_day(&mut self, day: u32) -> bool {
        self.viewed_days.insert(day)
    }

    /// `(watched, total)` for one day of the schedule.
    pub fn day_completion(&self, schedule: &Schedule, day: u32) -> (usize, usize) {
        let total = schedule.get(&day).map_or(0, |bucket| bucket.len());
        let watched = self.watched.get(&day).map_or(0, |marked| marked.len());
        (watched, total)
    }

    pub fn day_status(&self, schedule: &Schedule, day: u32, current_day: u32) -> DayStatus {
        if !Self::is_day_unlocked(day, current_day) {
            return DayStatus::Locked;
        }
        let (watched, total) = self.day_completion(schedule, day);
        if total > 0 && watched >= total {
            DayStatus::Completed
        } else if watched > 0 {
            DayStatus::InProgress
        } else {
            DayStatus::Unlocked
        }
    }

    /// Clear watch progress. The schedule and its start date survive; only
    /// deleting the whole plan removes those.
    pub fn reset(&mut self) {
        self.viewed_days.clear();
        self.watched.clear();
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::plan::schedule::{Item, build_schedule};

    fn sample_schedule(items: usize, days: u32) -> Schedule {
        let items: Vec<Item> = (0..items)
            .map(|i| Item {
                title: format!("video {i}"),
                length: 600,
                url: format!("https://youtu.be/vid{i}"),
            })
            .collect();
        build_schedule(&items, days)
    }

    #[test]
    fn current_day_at_start_is_one() {
        let start = datetime!(2025-03-01 09:30 UTC);
        let progress = ProgressState::new(start);
        assert_eq!(progress.current_day(start), 1);
    }

    #[test]
    fn current_day_after_two_and_a_half_days_is_three() {
        let progress = ProgressState::new(datetime!(2025-03-01 00:00 UTC));
        assert_eq!(progress.current_day(datetime!(2025-03-03 12:00 UTC)), 3);
    }

    #[test]
    fn current_day_is_clamped_before_start() {
        let progress = ProgressState::new(datetime!(2025-03-10 00:00 UTC));
        assert_eq!(progress.current_day(datetime!(2025-03-01 00:00 UTC)), 1);
    }

    #[test]
    fn current_day_is_monotone() {
        let progress = ProgressState::new(datetime!(2025-03-01 08:00 UTC));
        let mut previous = 0;
        for hour in 0..96 {
            let now = datetime!(2025-03-01 08:00 UTC) + time::Duration::hours(hour);
            let day = progress.current_day(now);
            assert!(day >= previous);
            previous = day;
        }
        assert_eq!(previous, 4);
    }

    #[test]
    fn marks_advance_sequentially() {
        let schedule = sample_schedule(4, 2);
        let mut progress = ProgressState::new(datetime!(2025-03-01 00:00 UTC));

        // out of order first: rejected without effect
        assert!(!progress.mark_watched(&schedule, 1, 1).unwrap());
        assert!(progress.mark_watched(&schedule, 1, 0).unwrap());
        assert!(progress.mark_watched(&schedule, 1, 1).unwrap());
        assert_eq!(progress.watched[&1], vec![0, 1]);
    }

    #[test]
    fn mark_watched_is_idempotent() {
        let schedule = sample_schedule(4, 2);
        let mut progress = ProgressState::new(datetime!(2025-03-01 00:00 UTC));
        assert!(progress.mark_watched(&schedule, 1, 0).unwrap());
        assert!(!progress.mark_watched(&schedule, 1, 0).unwrap());
        assert_eq!(progress.watched[&1], vec![0]);
    }

    #[test]
    fn mark_watched_rejects_unknown_day_and_index() {
        let schedule = sample_schedule(4, 2);
        let mut progress = ProgressState::default();
        assert!(matches!(
            progress.mark_watched(&schedule, 9, 0),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            progress.mark_watched(&schedule, 1, 7),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn day_status_transitions() {
        let schedule = sample_schedule(4, 2);
        let mut progress = ProgressState::new(datetime!(2025-03-01 00:00 UTC));

        assert_eq!(progress.day_status(&schedule, 2, 1), DayStatus::Locked);
        assert_eq!(progress.day_status(&schedule, 1, 1), DayStatus::Unlocked);

        progress.mark_watched(&schedule, 1, 0).unwrap();
        assert_eq!(progress.day_status(&schedule, 1, 1), DayStatus::InProgress);

        progress.mark_watched(&schedule, 1, 1).unwrap();
        assert_eq!(progress.day_status(&schedule, 1, 1), DayStatus::Completed);

        // time unlocks day 2 without touching watch state
        assert_eq!(progress.day_status(&schedule, 2, 2), DayStatus::Unlocked);
    }

    #[test]
    fn reset_clears_progress_but_keeps_start_date() {
        let schedule = sample_schedule(4, 2);
        let start = datetime!(2025-03-01 00:00 UTC);
        let mut progress = ProgressState::new(start);
        progress.mark_watched(&schedule, 1, 0).unwrap();
        progress.view_day(1);

        progress.reset();
        assert!(progress.watched.is_empty());
        assert!(progress.viewed_days.is_empty());
        assert_eq!(progress.start_date, Some(start));
    }

    #[test]
    fn completion_counts() {
        let schedule = sample_schedule(5, 2);
        let mut progress = ProgressState::new(datetime!(2025-03-01 00:00 UTC));
        progress.mark_watched(&schedule, 1, 0).unwrap();
        assert_eq!(progress.day_completion(&schedule, 1), (1, 3));
        assert_eq!(progress.day_completion(&schedule, 2), (0, 2));
        assert_eq!(progress.day_completion(&schedule, 9), (0, 0));
    }
}
