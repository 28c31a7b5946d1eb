//! Layered configuration loading: defaults -> `config/*.toml` -> environment
//! variables prefixed `EDGAR_`, following the pattern the teacher's
//! `econ-graph-sec-crawler::config_loader` uses for its JSON config files,
//! generalized here to the `config` + `dotenvy` crates the teacher's root
//! manifest already depends on.

use crate::error::{EdgarError, EdgarResult};
use serde::Deserialize;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SecApiConfig {
    #[validate(custom(function = "validate_rate_limit"))]
    pub rate_limit: f64,
    pub timeout_secs: u64,
    #[validate(length(min = 10, message = "user_agent must be at least 10 characters"))]
    #[validate(custom(function = "validate_contact_address"))]
    pub user_agent: String,
    #[serde(default = "default_batch_success_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub batch_success_threshold: f64,
}

fn validate_rate_limit(rate_limit: f64) -> Result<(), ValidationError> {
    if rate_limit > 0.0 && rate_limit <= 10.0 {
        Ok(())
    } else {
        Err(ValidationError::new("out_of_range")
            .with_message("rate_limit must be in (0, 10] requests/sec".into()))
    }
}

fn validate_contact_address(user_agent: &str) -> Result<(), ValidationError> {
    if user_agent.contains('@') {
        Ok(())
    } else {
        Err(ValidationError::new("missing_contact_address")
            .with_message("user_agent must contain a contact address".into()))
    }
}

fn default_batch_success_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub pool_size: u32,
    pub timeout_secs: u64,
    #[serde(default = "default_wal_enabled")]
    pub wal_enabled: bool,
}

fn default_wal_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkerConfig {
    pub min_tokens: u32,
    pub max_tokens: u32,
    pub overlap_tokens: u32,
    pub tokens_per_word: f64,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            min_tokens: 100,
            max_tokens: 512,
            overlap_tokens: 50,
            tokens_per_word: 1.33,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_tolerance_percent")]
    pub tolerance_percent: f64,
    #[serde(default)]
    pub strict_mode: bool,
}

fn default_tolerance_percent() -> f64 {
    1.0
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            tolerance_percent: default_tolerance_percent(),
            strict_mode: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeatureFlags {
    #[serde(default)]
    pub async_downloads: bool,
    #[serde(default)]
    pub section_extraction: bool,
    #[serde(default)]
    pub table_extraction: bool,
    #[serde(default)]
    pub caching_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub sec_api: SecApiConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub chunker: ChunkerConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Loads configuration from (in ascending priority) built-in defaults,
    /// an optional `config/default.toml`, and `EDGAR_`-prefixed environment
    /// variables, then validates every fatal invariant from spec section 6.
    pub fn load() -> EdgarResult<Self> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .set_default("sec_api.rate_limit", 8.0)?
            .set_default("sec_api.timeout_secs", 30)?
            .set_default("sec_api.batch_success_threshold", 0.5)?
            .set_default("storage.database_path", "data/edgar.sqlite3")?
            .set_default("database.pool_size", 4)?
            .set_default("database.timeout_secs", 30)?
            .set_default("database.wal_enabled", true)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("EDGAR").separator("__"));

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Runs the `validator`-derived field checks on `sec_api` (contact
    /// address, rate-limit bounds), then the one invariant `validator`
    /// can't express as a field attribute: the database path's parent
    /// directory must already exist.
    fn validate(&self) -> EdgarResult<()> {
        Validate::validate(self).map_err(|errors| EdgarError::config(errors.to_string()))?;

        let db_path = std::path::Path::new(&self.storage.database_path);
        match db_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                return Err(EdgarError::config(format!(
                    "storage.database_path parent directory does not exist: {}",
                    parent.display()
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(user_agent: &str, db_path: &str) -> AppConfig {
        AppConfig {
            sec_api: SecApiConfig {
                rate_limit: 8.0,
                timeout_secs: 30,
                user_agent: user_agent.to_string(),
                batch_success_threshold: 0.5,
            },
            storage: StorageConfig {
                database_path: db_path.to_string(),
            },
            database: DatabaseConfig {
                pool_size: 4,
                timeout_secs: 30,
                wal_enabled: true,
            },
            chunker: ChunkerConfig::default(),
            reconciler: ReconcilerConfig::default(),
            features: FeatureFlags::default(),
        }
    }

    #[test]
    fn rejects_user_agent_without_contact() {
        let cfg = base_config("too-short", "data/edgar.sqlite3");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_rate_limit() {
        let mut cfg = base_config("Research Team contact@example.com", "data/edgar.sqlite3");
        cfg.sec_api.rate_limit = 11.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_missing_parent_directory() {
        let cfg = base_config(
            "Research Team contact@example.com",
            "/definitely/not/a/real/path/edgar.sqlite3",
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("edgar.sqlite3");
        let cfg = base_config(
            "Research Team contact@example.com",
            db_path.to_str().unwrap(),
        );
        assert!(cfg.validate().is_ok());
    }
}
