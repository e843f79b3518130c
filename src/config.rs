//! Minimal runtime configuration helpers.
//! Credentials come from the environment (optionally via a .env file).

use std::time::Duration;

pub const DEFAULT_POLL_SECS: u64 = 30;
pub const DEFAULT_LANG: &str = "en_GB";

#[derive(Debug, Clone)]
pub struct Config {
    /// Fenix V24 account email.
    pub email: String,
    /// Fenix V24 account password.
    pub password: String,
    /// Smarthome identifier, taken from the Fenix V24 website URL.
    pub smarthome_id: String,
    /// Polling cadence for zone readings.
    pub poll_interval: Duration,
    /// Language for zone labels and backend error messages.
    pub lang: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let email = required("FENIX_EMAIL")?;
        let password = required("FENIX_PASSWORD")?;
        let smarthome_id = required("FENIX_SMARTHOME_ID")?;

        let poll_secs = match std::env::var("POLL_INTERVAL_SECS") {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<u64>()
                .map_err(|_| "POLL_INTERVAL_SECS must be a positive integer".to_string())?,
            _ => DEFAULT_POLL_SECS,
        };

        let lang = std::env::var("FENIX_LANG").unwrap_or_else(|_| DEFAULT_LANG.to_string());

        Ok(Config {
            email,
            password,
            smarthome_id,
            poll_interval: Duration::from_secs(poll_secs),
            lang,
        })
    }
}

fn required(name: &str) -> Result<String, String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(format!("Missing required environment variable: {}", name)),
    }
}
