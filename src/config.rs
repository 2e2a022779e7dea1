use std::env;

use chrono::{Duration, Utc};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub overdue_threshold: Duration,
    pub overdue_check_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) => parse_log_format(&raw)?,
            Err(_) => LogFormat::Compact,
        };

        let overdue_threshold =
            overdue_threshold(parse_or_default("OVERDUE_THRESHOLD_MINUTES", 45)?)?;

        let overdue_check_interval_secs: u64 = parse_or_default("OVERDUE_CHECK_INTERVAL_SECS", 30)?;
        if overdue_check_interval_secs == 0 {
            return Err(AppError::Internal(
                "invalid OVERDUE_CHECK_INTERVAL_SECS: must be > 0".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            overdue_threshold,
            overdue_check_interval_secs,
        })
    }
}

/// The threshold must be positive and small enough to subtract from the
/// current time.
fn overdue_threshold(minutes: i64) -> Result<Duration, AppError> {
    if minutes <= 0 {
        return Err(AppError::Internal(
            "invalid OVERDUE_THRESHOLD_MINUTES: must be > 0".to_string(),
        ));
    }

    Duration::try_minutes(minutes)
        .filter(|threshold| Utc::now().checked_sub_signed(*threshold).is_some())
        .ok_or_else(|| {
            AppError::Internal(format!(
                "invalid OVERDUE_THRESHOLD_MINUTES: {minutes} is out of range"
            ))
        })
}

fn parse_log_format(raw: &str) -> Result<LogFormat, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        other => Err(AppError::Internal(format!(
            "invalid LOG_FORMAT: {other}, expected compact or json"
        ))),
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
