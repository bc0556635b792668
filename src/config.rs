use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use crate::utils::report_cache::DEFAULT_REPORT_CACHE_TTL_SECS;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Report cache; a ttl of 0 disables caching
    pub report_cache_ttl_secs: u64,
    pub report_cache_capacity: u64,

    // Attendance rules
    pub work_start_hour: u32,
    pub standard_work_minutes: i64,

    pub app_env: String,
    pub log_dir: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let work_start_hour: u32 = or_default("WORK_START_HOUR", 9)?;
        if work_start_hour > 23 {
            anyhow::bail!("WORK_START_HOUR must be between 0 and 23");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            report_cache_ttl_secs: or_default("REPORT_CACHE_TTL_SECS", DEFAULT_REPORT_CACHE_TTL_SECS)?,
            report_cache_capacity: or_default("REPORT_CACHE_CAPACITY", 1000)?,

            work_start_hour,
            standard_work_minutes: or_default("STANDARD_WORK_MINUTES", 480)?, // 8h

            app_env: env::var("APP_ENV").unwrap_or_else(|_| "production".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }

    /// Underlying error text is only sent to clients outside production.
    pub fn expose_error_details(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            report_cache_ttl_secs: DEFAULT_REPORT_CACHE_TTL_SECS,
            report_cache_capacity: 0,
            work_start_hour: 9,
            standard_work_minutes: 480,
            app_env: "production".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}
