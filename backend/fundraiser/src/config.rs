//! Application configuration loaded from environment variables.

use crate::errors::{FundraiserError, Result};
use crate::progress::DEFAULT_TARGET;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite URL or path of the document database, or `memory`.
    /// Unset means the service runs without a store.
    pub database_url: Option<String>,
    /// Database name reported by the diagnostic endpoint
    pub database_name: Option<String>,
    /// Port for the REST API server
    pub port: u16,
    /// Fixed funding goal the campaign reports progress against
    pub target_amount: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Empty values are
    /// treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .trim()
            .parse()
            .map_err(|_| FundraiserError::Config("Invalid PORT".to_string()))?;

        let target_amount = match var("TARGET_AMOUNT") {
            None => DEFAULT_TARGET,
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && *t >= 0.0)
                .ok_or_else(|| FundraiserError::Config("Invalid TARGET_AMOUNT".to_string()))?,
        };

        Ok(Config {
            database_url: var("DATABASE_URL"),
            database_name: var("DATABASE_NAME"),
            port,
            target_amount,
        })
    }
}
