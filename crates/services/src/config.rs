use std::env;
use std::time::Duration;

use crate::exams::TimerConfig;

pub const DEFAULT_DB_URL: &str = "sqlite://lms.sqlite3";
pub const DEFAULT_TICK_MILLIS: u64 = 1000;

/// Runtime settings for the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesConfig {
    pub db_url: String,
    pub tick_period: Duration,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            tick_period: Duration::from_millis(DEFAULT_TICK_MILLIS),
        }
    }
}

impl ServicesConfig {
    /// Read `LMS_DB_URL` and `LMS_TICK_MILLIS`, falling back to defaults for
    /// missing, blank or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_url = lookup("LMS_DB_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.into());
        let tick_millis = lookup("LMS_TICK_MILLIS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .unwrap_or(DEFAULT_TICK_MILLIS);

        Self {
            db_url,
            tick_period: Duration::from_millis(tick_millis),
        }
    }

    #[must_use]
    pub fn timer(&self) -> TimerConfig {
        TimerConfig::new(self.tick_period)
    }
}
