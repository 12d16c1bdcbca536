//! Application configuration read from the process environment.
//!
//! Every setting has a default so a development server starts with an empty
//! environment; numbers that fail to parse fall back to the default with a
//! warning instead of aborting startup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use migraine_diary_data::database::DatabaseConfig;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Weather client and backfill settings
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub forecast_url: String,
    pub archive_url: String,
    /// Entries handled per backfill run
    pub backfill_batch_size: usize,
    /// Pause between two upstream calls during backfill
    pub request_delay: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            backfill_batch_size: 25,
            request_delay: Duration::from_millis(1000),
        }
    }
}

/// OpenAI-compatible gateway settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    /// `None` disables the narrative report
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}

/// Push gateway settings; without a URL notifications are only logged
#[derive(Debug, Clone, Default)]
pub struct PushConfig {
    pub gateway_url: Option<String>,
    pub gateway_key: Option<String>,
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: String,
    pub database: DatabaseConfig,
    /// Shared secret expected in the `x-cron-secret` header; `None` locks the cron routes
    pub cron_secret: Option<String>,
    /// Reminder poll interval; zero disables the in-process scheduler
    pub reminder_poll_interval: Duration,
    pub weather: WeatherConfig,
    pub llm: LlmConfig,
    pub push: PushConfig,
    /// Lifetime of a doctor share when the request names none
    pub share_default_hours: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            environment: "development".to_string(),
            database: DatabaseConfig::default(),
            cron_secret: None,
            reminder_poll_interval: Duration::from_secs(60),
            weather: WeatherConfig::default(),
            llm: LlmConfig::default(),
            push: PushConfig::default(),
            share_default_hours: 24,
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_var("PORT", defaults.port),
            environment: env::var("APP_ENV").unwrap_or(defaults.environment),
            database: DatabaseConfig::from_env().unwrap_or_else(|e| {
                warn!("Invalid database configuration ({}), using defaults", e);
                DatabaseConfig::default()
            }),
            cron_secret: non_empty_var("CRON_SECRET"),
            reminder_poll_interval: Duration::from_secs(parse_var("REMINDER_POLL_SECONDS", 60)),
            weather: WeatherConfig {
                forecast_url: non_empty_var("WEATHER_FORECAST_URL").unwrap_or(defaults.weather.forecast_url),
                archive_url: non_empty_var("WEATHER_ARCHIVE_URL").unwrap_or(defaults.weather.archive_url),
                backfill_batch_size: parse_var("WEATHER_BACKFILL_BATCH_SIZE", defaults.weather.backfill_batch_size),
                request_delay: Duration::from_millis(parse_var("WEATHER_REQUEST_DELAY_MS", 1000)),
            },
            llm: LlmConfig {
                base_url: non_empty_var("LLM_BASE_URL").unwrap_or(defaults.llm.base_url),
                api_key: non_empty_var("LLM_API_KEY"),
                model: non_empty_var("LLM_MODEL").unwrap_or(defaults.llm.model),
            },
            push: PushConfig {
                gateway_url: non_empty_var("PUSH_GATEWAY_URL"),
                gateway_key: non_empty_var("PUSH_GATEWAY_KEY"),
            },
            share_default_hours: parse_var("SHARE_DEFAULT_HOURS", defaults.share_default_hours),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using default {:?}", raw, name, default);
            default
        }),
        Err(_) => default,
    }
}
