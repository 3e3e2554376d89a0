use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use serde::Serialize;

use crate::models::{SessionStatus, WorkoutSession};

const WEEKS_SHOWN: i64 = 8;
const MAX_STREAK_DAYS: u32 = 365;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekBucket {
    /// Sunday the week starts on, e.g. "Mar 3".
    pub week: String,
    pub workouts: u32,
    pub minutes: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_workouts: u32,
    pub total_minutes: u32,
    pub current_streak: u32,
    /// Oldest week first; the last bucket holds the current week.
    pub weekly: Vec<WeekBucket>,
}

/// Aggregates completed sessions as seen from `now`'s calendar (and time zone).
pub fn summarize<Tz: TimeZone>(sessions: &[WorkoutSession], now: &DateTime<Tz>) -> ProgressSummary {
    let tz = now.timezone();
    let today = now.date_naive();
    let completed: Vec<(NaiveDate, u32)> = sessions
        .iter()
        .filter(|session| session.status == SessionStatus::Completed)
        .map(|session| {
            (
                session.start_time.with_timezone(&tz).date_naive(),
                session.duration_minutes.unwrap_or(0),
            )
        })
        .collect();

    ProgressSummary {
        total_workouts: completed.len() as u32,
        total_minutes: completed.iter().map(|(_, minutes)| minutes).sum(),
        current_streak: current_streak(completed.iter().map(|(day, _)| *day), today),
        weekly: weekly_buckets(&completed, today),
    }
}

/// Consecutive calendar days with a completed workout, counted back from `today`.
/// A rest day today does not break the streak, but the last workout must be today
/// or yesterday.
pub fn current_streak(days: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = days.into_iter().collect();
    let yesterday = today.pred_opt();
    if !days.contains(&today) && yesterday.map_or(true, |day| !days.contains(&day)) {
        return 0;
    }

    let mut streak = 0;
    let mut check = today;
    for offset in 0..MAX_STREAK_DAYS {
        if days.contains(&check) {
            streak += 1;
        } else if offset > 0 {
            break;
        }
        match check.pred_opt() {
            Some(previous) => check = previous,
            None => break,
        }
    }
    streak
}

fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_sunday()))
}

fn weekly_buckets(completed: &[(NaiveDate, u32)], today: NaiveDate) -> Vec<WeekBucket> {
    let current = week_start(today);
    (0..WEEKS_SHOWN)
        .rev()
        .map(|weeks_back| {
            let start = current - Duration::weeks(weeks_back);
            let in_week: Vec<u32> = completed
                .iter()
                .filter(|(day, _)| week_start(*day) == start)
                .map(|(_, minutes)| *minutes)
                .collect();
            WeekBucket {
                week: start.format("%b %-d").to_string(),
                workouts: in_week.len() as u32,
                minutes: in_week.iter().sum(),
            }
        })
        .collect()
}
