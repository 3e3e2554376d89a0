use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::models::{PlanStatus, SessionStatus};

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// JSON columns hold nested documents (workouts, per-exercise results).
pub fn parse_json<T: DeserializeOwned>(value: &str, field: &str) -> Result<T> {
    serde_json::from_str(value).with_context(|| format!("failed to parse {field} JSON"))
}

pub fn parse_session_status(value: &str) -> Result<SessionStatus> {
    match value {
        "in_progress" => Ok(SessionStatus::InProgress),
        "completed" => Ok(SessionStatus::Completed),
        "incomplete" => Ok(SessionStatus::Incomplete),
        other => Err(anyhow!("unknown session status {other}")),
    }
}

pub fn parse_plan_status(value: &str) -> Result<PlanStatus> {
    match value {
        "draft" => Ok(PlanStatus::Draft),
        "active" => Ok(PlanStatus::Active),
        "archived" => Ok(PlanStatus::Archived),
        other => Err(anyhow!("unknown plan status {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_round_trip_through_their_column_text() {
        for status in [
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Incomplete,
        ] {
            assert_eq!(parse_session_status(status.as_str()).unwrap(), status);
        }
        for status in [PlanStatus::Draft, PlanStatus::Active, PlanStatus::Archived] {
            assert_eq!(parse_plan_status(status.as_str()).unwrap(), status);
        }
        assert!(parse_session_status("Running").is_err());
    }

    #[test]
    fn rejects_negative_counts_and_bad_timestamps() {
        assert_eq!(to_u32(45, "duration_minutes").unwrap(), 45);
        let err = to_u32(-1, "duration_minutes").unwrap_err();
        assert!(err.to_string().contains("duration_minutes"));
        assert!(parse_datetime("yesterday", "start_time").is_err());
        assert_eq!(parse_optional_datetime(None, "end_time").unwrap(), None);
    }
}
