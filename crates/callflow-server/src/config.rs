//! Server configuration
//!
//! Read once at startup from Shuttle secrets, falling back to the process
//! environment (and a `.env` file in local development).

use std::time::Duration;

use callflow::{FlowSettings, WebhookUrls, DEFAULT_MAX_RETRIES};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Telephony provider (Vonage Voice API) settings
#[derive(Debug, Clone)]
pub struct VonageConfig {
    pub api_url: String,
    /// Pre-minted application JWT
    pub api_token: String,
    pub from_number: String,
}

/// Retry scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub batch_size: i64,
    pub attempt_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 10,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public base URL the provider calls back on
    pub base_url: String,
    pub api_key: Option<String>,
    pub vonage: Option<VonageConfig>,
    /// Operator phone escalated calls are transferred to
    pub admin_phone: Option<String>,
    pub scheduler: SchedulerConfig,
    pub delivery_max_retries: i32,
    pub delivery_signing_secret: Option<String>,
    pub max_invalid_attempts: Option<u32>,
}

impl AppConfig {
    /// Build from Shuttle secrets, then the environment
    pub fn from_secrets(secrets: &shuttle_runtime::SecretStore) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| secrets.get(key).or_else(|| std::env::var(key).ok()))
    }

    /// Build from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get("BASE_URL").ok_or(ConfigError::Missing("BASE_URL"))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "BASE_URL",
                value: base_url,
            });
        }

        let vonage = match (get("VONAGE_API_TOKEN"), get("VONAGE_FROM_NUMBER")) {
            (Some(api_token), Some(from_number)) => Some(VonageConfig {
                api_url: get("VONAGE_API_URL")
                    .unwrap_or_else(|| "https://api.nexmo.com".to_string()),
                api_token,
                from_number,
            }),
            _ => None,
        };

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            interval: parse_number::<u64>(&get, "RETRY_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            batch_size: parse_number(&get, "RETRY_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            attempt_timeout: parse_number::<u64>(&get, "RETRY_ATTEMPT_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.attempt_timeout),
        };
        if scheduler.interval.is_zero() || scheduler.attempt_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "RETRY_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        if scheduler.batch_size < 1 {
            return Err(ConfigError::Invalid {
                key: "RETRY_BATCH_SIZE",
                value: scheduler.batch_size.to_string(),
            });
        }

        let delivery_max_retries =
            parse_number(&get, "DELIVERY_MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_RETRIES);
        if delivery_max_retries < 1 {
            return Err(ConfigError::Invalid {
                key: "DELIVERY_MAX_RETRIES",
                value: delivery_max_retries.to_string(),
            });
        }

        Ok(Self {
            base_url,
            api_key: get("CALLFLOW_API_KEY"),
            vonage,
            admin_phone: get("ADMIN_PHONE"),
            scheduler,
            delivery_max_retries,
            delivery_signing_secret: get("DELIVERY_SIGNING_SECRET"),
            max_invalid_attempts: parse_number(&get, "MAX_INVALID_ATTEMPTS")?
                .filter(|n: &u32| *n > 0),
        })
    }

    pub fn webhook_urls(&self) -> WebhookUrls {
        WebhookUrls::new(&self.base_url)
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            max_invalid_attempts: self.max_invalid_attempts,
            ..FlowSettings::default()
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(None),
    }
}
