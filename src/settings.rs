use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub debug: bool,
    pub enable_swagger: bool,
    pub port: u16,
    pub search_debounce_ms: u64,
    pub seed_sample_data: bool,
    pub min_password_length: usize,
    pub session_ttl_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_SEARCH_DEBOUNCE_MS -> search_debounce_ms
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("search_debounce_ms", 300)?
            .set_default("seed_sample_data", true)?
            .set_default("min_password_length", 6)?
            .set_default("session_ttl_secs", 86_400)?
            .build()?;

        config.try_deserialize()
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            enable_swagger: true,
            port: 8080,
            search_debounce_ms: 300,
            seed_sample_data: true,
            min_password_length: 6,
            session_ttl_secs: 86_400,
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const KEYS: [&str; 4] = [
        "APP_PORT",
        "APP_SEARCH_DEBOUNCE_MS",
        "APP_SEED_SAMPLE_DATA",
        "APP_SESSION_TTL_SECS",
    ];

    fn clear_env() {
        for key in KEYS {
            // SAFETY: tests touching the environment are serialized
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.search_debounce(), Duration::from_millis(300));
        assert!(settings.seed_sample_data);
        assert_eq!(settings.min_password_length, 6);
        assert_eq!(settings.session_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        // SAFETY: tests touching the environment are serialized
        unsafe {
            std::env::set_var("APP_PORT", "9090");
            std::env::set_var("APP_SEARCH_DEBOUNCE_MS", "150");
            std::env::set_var("APP_SEED_SAMPLE_DATA", "false");
            std::env::set_var("APP_SESSION_TTL_SECS", "900");
        }
        let settings = Settings::from_env().unwrap();
        clear_env();

        assert_eq!(settings.port, 9090);
        assert_eq!(settings.search_debounce_ms, 150);
        assert!(!settings.seed_sample_data);
        assert_eq!(settings.session_ttl(), Duration::from_secs(900));
    }
}
