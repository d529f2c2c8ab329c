use crate::domain::{Address, Ticker, Vault};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub quote_symbol: String,
    pub reference_refresh_interval: Duration,
    pub api_limit: u32,
    pub vaults: Vec<Vault>,
    pub vault_pnl_start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let quote_symbol = env_map
            .get("QUOTE_SYMBOL")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "USDC".to_string());
        if quote_symbol.is_empty() {
            return Err(ConfigError::InvalidValue(
                "QUOTE_SYMBOL".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let refresh_ms = env_map
            .get("REFERENCE_REFRESH_INTERVAL_MS")
            .map(|s| s.as_str())
            .unwrap_or("30000")
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REFERENCE_REFRESH_INTERVAL_MS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let api_limit = env_map
            .get("API_LIMIT")
            .map(|s| s.as_str())
            .unwrap_or("1000")
            .parse::<u32>()
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "API_LIMIT".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let vaults = parse_vaults_from_map(&env_map)?;

        let vault_pnl_start_date = env_map
            .get("VAULT_PNL_START_DATE")
            .map(|raw| parse_timestamp("VAULT_PNL_START_DATE", raw))
            .transpose()?;

        Ok(Config {
            database_path,
            quote_symbol,
            reference_refresh_interval: Duration::from_millis(refresh_ms),
            api_limit,
            vaults,
            vault_pnl_start_date,
        })
    }
}

fn parse_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("'{}': {}", raw, e)))
}

/// One `address:ticker[:createdAtRfc3339]` entry.
fn parse_vault_entry(key: &str, entry: &str) -> Result<Vault, ConfigError> {
    let mut parts = entry.splitn(3, ':');
    let address = parts.next().map(str::trim).unwrap_or_default();
    let ticker = parts.next().map(str::trim).unwrap_or_default();
    if address.is_empty() || ticker.is_empty() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("expected address:ticker[:createdAt], got '{}'", entry),
        ));
    }
    let created_at = parts.next().map(|raw| parse_timestamp(key, raw)).transpose()?;
    Ok(Vault {
        address: Address::new(address),
        ticker: Ticker::new(ticker),
        created_at,
    })
}

fn parse_vaults_from_map(env_map: &HashMap<String, String>) -> Result<Vec<Vault>, ConfigError> {
    if let Some(vaults_str) = env_map.get("VAULTS") {
        vaults_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| parse_vault_entry("VAULTS", entry))
            .collect()
    } else if let Some(file_path) = env_map.get("VAULTS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "VAULTS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|entry| parse_vault_entry("VAULTS_FILE", entry))
            .collect()
    } else {
        Ok(Vec::new())
    }
}
