use chrono::NaiveDateTime;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

/// Timestamp format used for logging and the AFTER option.
pub const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

const DEFAULT_START_FLOOR: &str = "2020-01-01 00:00:00";

#[derive(Clone, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    /// Maximum number of channels archived concurrently.
    pub concurrency: usize,
    /// Size of one crawl window, in days.
    pub interval_days: i64,
    /// Informational crawl floor; window generation always starts at channel
    /// creation regardless of this value.
    pub start_floor: NaiveDateTime,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let start_floor = env::var("AFTER").unwrap_or_else(|_| DEFAULT_START_FLOOR.to_string());
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/guildvault.db".to_string()),
            concurrency: env::var("CONCURRENCY")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .unwrap_or(6),
            interval_days: env::var("INTERVAL_DAYS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            start_floor: NaiveDateTime::parse_from_str(&start_floor, DATE_FMT)
                .map_err(|_| anyhow::anyhow!("AFTER must match {DATE_FMT}"))?,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("database_url", &self.database_url)
            .field("concurrency", &self.concurrency)
            .field("interval_days", &self.interval_days)
            .field("start_floor", &self.start_floor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_logic() {
        // 1. Missing token is an error
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("DATABASE_URL");
        env::remove_var("CONCURRENCY");
        env::remove_var("INTERVAL_DAYS");
        env::remove_var("AFTER");
        assert!(Config::build().is_err(), "should fail without DISCORD_TOKEN");

        // 2. Defaults
        env::set_var("DISCORD_TOKEN", "test_token");
        let config = Config::build().unwrap();
        assert_eq!(config.database_url, "data/guildvault.db");
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.interval_days, 60);
        assert_eq!(
            config.start_floor,
            NaiveDateTime::parse_from_str(DEFAULT_START_FLOOR, DATE_FMT).unwrap()
        );

        // 3. Overrides
        env::set_var("CONCURRENCY", "3");
        env::set_var("INTERVAL_DAYS", "14");
        env::set_var("AFTER", "2022-06-01 12:30:00");
        let config = Config::build().unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.interval_days, 14);
        assert_eq!(
            config.start_floor,
            NaiveDateTime::parse_from_str("2022-06-01 12:30:00", DATE_FMT).unwrap()
        );

        // 4. Malformed floor is rejected
        env::set_var("AFTER", "junk");
        assert!(Config::build().is_err());

        // 5. Debug redaction
        env::set_var("AFTER", "2022-06-01 12:30:00");
        let debug_output = format!("{:?}", Config::build().unwrap());
        assert!(!debug_output.contains("test_token"));
        assert!(debug_output.contains("[REDACTED]"));

        // Cleanup
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("CONCURRENCY");
        env::remove_var("INTERVAL_DAYS");
        env::remove_var("AFTER");
    }
}
