use anyhow::{Context, Result};
use chrono::{Duration, NaiveTime};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// The bot's mention suffix, e.g. "@reviewbot". Inbound text beginning
    /// with it gets the mention stripped before classification.
    pub bot_mention: String,
    /// Start of the notifiable window, UTC.
    pub notify_start_utc: NaiveTime,
    /// End of the notifiable window, UTC (exclusive).
    pub notify_end_utc: NaiveTime,
    /// When set, reminders fire regardless of the workday calendar.
    pub work_on_holiday: bool,
    /// Reminder re-arm interval.
    pub notify_interval: Duration,
    /// Scheduler tick delay.
    pub poll_delay: std::time::Duration,
    /// Max items fetched per scheduler tick.
    pub notify_batch_size: usize,
    /// Minimum team size before an item can be moved to review.
    pub min_team_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_mention =
            env::var("BOT_MENTION").context("BOT_MENTION environment variable is required")?;

        let notify_start_utc = parse_time_of_day(
            &env::var("NOTIFY_START_UTC").unwrap_or_else(|_| "09:00".to_string()),
        )
        .context("NOTIFY_START_UTC must be HH:MM")?;

        let notify_end_utc = parse_time_of_day(
            &env::var("NOTIFY_END_UTC").unwrap_or_else(|_| "18:00".to_string()),
        )
        .context("NOTIFY_END_UTC must be HH:MM")?;

        let work_on_holiday = match env::var("WORK_ON_HOLIDAY") {
            Ok(value) => parse_flag(&value).context("WORK_ON_HOLIDAY must be true or false")?,
            Err(_) => false,
        };

        let notify_interval_minutes = env::var("NOTIFY_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<i64>()
            .context("NOTIFY_INTERVAL_MINUTES must be a valid number")?;

        let poll_seconds = env::var("NOTIFY_POLL_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .context("NOTIFY_POLL_SECONDS must be a valid number")?;

        let notify_batch_size = env::var("NOTIFY_BATCH_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()
            .context("NOTIFY_BATCH_SIZE must be a valid number")?;

        let min_team_size = env::var("MIN_TEAM_SIZE")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<usize>()
            .context("MIN_TEAM_SIZE must be a valid number")?;

        Ok(Config {
            bot_mention,
            notify_start_utc,
            notify_end_utc,
            work_on_holiday,
            notify_interval: Duration::minutes(notify_interval_minutes),
            poll_delay: std::time::Duration::from_secs(poll_seconds),
            notify_batch_size,
            min_team_size,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_mention: "@reviewbot".to_string(),
            notify_start_utc: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            notify_end_utc: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            work_on_holiday: false,
            notify_interval: Duration::minutes(60),
            poll_delay: std::time::Duration::from_secs(60),
            notify_batch_size: 10,
            min_team_size: 2,
        }
    }
}

/// Parse an `HH:MM` time of day.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("invalid time of day: {value:?}"))
}

/// Parse a boolean flag value; only `true`/`false` are accepted.
pub fn parse_flag(value: &str) -> Result<bool> {
    value
        .trim()
        .parse::<bool>()
        .with_context(|| format!("invalid boolean: {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_of_day_valid() {
        assert_eq!(
            parse_time_of_day("09:00").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time_of_day(" 18:30 ").unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_time_of_day_invalid() {
        assert!(parse_time_of_day("").is_err());
        assert!(parse_time_of_day("9am").is_err());
        assert!(parse_time_of_day("25:00").is_err());
    }

    #[test]
    fn test_parse_flag_valid() {
        assert!(parse_flag("true").unwrap());
        assert!(!parse_flag(" false ").unwrap());
    }

    #[test]
    fn test_parse_flag_rejects_garbage() {
        assert!(parse_flag("yes").is_err());
        assert!(parse_flag("1").is_err());
        assert!(parse_flag("").is_err());
    }

    #[test]
    fn test_default_window_is_working_hours() {
        let config = Config::default();
        assert!(config.notify_start_utc < config.notify_end_utc);
        assert!(!config.work_on_holiday);
        assert_eq!(config.notify_batch_size, 10);
        assert_eq!(config.min_team_size, 2);
    }
}
