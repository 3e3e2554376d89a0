/// Rest countdown display, `m:ss`.
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Workout clock display: `m:ss` under an hour, `h:mm:ss` after.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Session length for summaries: "45 min" or "1h 5m".
pub fn format_duration_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes} min");
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_pads_seconds() {
        assert_eq!(format_countdown(0), "0:00");
        assert_eq!(format_countdown(90), "1:30");
        assert_eq!(format_countdown(605), "10:05");
    }

    #[test]
    fn elapsed_switches_to_hours() {
        assert_eq!(format_elapsed(59), "0:59");
        assert_eq!(format_elapsed(3599), "59:59");
        assert_eq!(format_elapsed(3600), "1:00:00");
        assert_eq!(format_elapsed(3725), "1:02:05");
    }

    #[test]
    fn duration_uses_hours_from_sixty_minutes() {
        assert_eq!(format_duration_minutes(45), "45 min");
        assert_eq!(format_duration_minutes(60), "1h 0m");
        assert_eq!(format_duration_minutes(125), "2h 5m");
    }
}
