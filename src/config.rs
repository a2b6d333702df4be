// Disburser configuration
//
// Sources, later ones winning:
// 1. built-in defaults
// 2. optional `disburser.toml` in the working directory
// 3. environment variables (`DISTRIBUTOR_SECRET_KEY`, `INTERVAL_HOURS`, ...)

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::error::{AppError, AppResult};
use crate::execution::RetryPolicy;
use crate::ledger::{
    horizon::{PUBLIC_HORIZON_URL, PUBLIC_NETWORK_PASSPHRASE},
    keys::{decode_account_id, Keypair},
    StellarConfig,
};
use crate::settlement::ScheduleConfig;

pub const DEFAULT_RECEIVER: &str = "GDPQWQ37LPPLJJ4SWG5KMHEISATFMD4QTZFWN25UGGHFJ34BY5WTT3DN";

/// Shortest accepted interval between two runs; run ids are second-granular
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Longest accepted interval between two runs
pub const MAX_INTERVAL: Duration = Duration::from_secs(366 * 24 * 3600);

#[derive(Debug, Clone, Deserialize)]
pub struct DisburserConfig {
    /// Secret seed (`S...`) of the funding account
    #[serde(default)]
    pub distributor_secret_key: Option<String>,
    #[serde(default = "default_receiver_address")]
    pub receiver_address: String,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: f64,
    /// Baseline fee per operation, in stroops
    #[serde(default = "default_base_fee")]
    pub base_fee: u32,
    #[serde(default = "default_max_fee")]
    pub max_fee: u32,
    #[serde(default = "default_horizon_url")]
    pub horizon_url: String,
    #[serde(default = "default_network_passphrase")]
    pub network_passphrase: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_retry_deadline_secs")]
    pub retry_deadline_secs: u64,
}

fn default_receiver_address() -> String {
    DEFAULT_RECEIVER.to_string()
}

fn default_interval_hours() -> f64 {
    3.0
}

fn default_base_fee() -> u32 {
    100
}

fn default_max_fee() -> u32 {
    2000
}

fn default_horizon_url() -> String {
    PUBLIC_HORIZON_URL.to_string()
}

fn default_network_passphrase() -> String {
    PUBLIC_NETWORK_PASSPHRASE.to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_retry_deadline_secs() -> u64 {
    15 * 60
}

/// Validated configuration, ready to wire the disburser
#[derive(Debug)]
pub struct Settings {
    pub keypair: Keypair,
    pub receiver: String,
    pub schedule: ScheduleConfig,
    pub retry: RetryPolicy,
    pub stellar: StellarConfig,
    pub log_dir: PathBuf,
}

impl DisburserConfig {
    /// Load from `disburser.toml` (if present) and the environment
    pub fn load() -> AppResult<Self> {
        let config = Config::builder()
            .add_source(File::with_name("disburser").required(false))
            .add_source(Environment::default())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn from_toml(contents: &str) -> AppResult<Self> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(self) -> AppResult<Settings> {
        let secret = self
            .distributor_secret_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config("DISTRIBUTOR_SECRET_KEY must be set".to_string()))?;
        let keypair = Keypair::from_secret_seed(secret)
            .map_err(|e| AppError::Config(format!("DISTRIBUTOR_SECRET_KEY is invalid: {}", e)))?;

        let receiver = self.receiver_address.trim().to_string();
        decode_account_id(&receiver)
            .map_err(|e| AppError::Config(format!("RECEIVER_ADDRESS is invalid: {}", e)))?;

        let interval_secs = self.interval_hours * 3600.0;
        if !interval_secs.is_finite()
            || interval_secs < MIN_INTERVAL.as_secs_f64()
            || interval_secs > MAX_INTERVAL.as_secs_f64()
        {
            return Err(AppError::Config(format!(
                "INTERVAL_HOURS must be between {} minute(s) and {} hours, got {}",
                MIN_INTERVAL.as_secs() / 60,
                MAX_INTERVAL.as_secs() / 3600,
                self.interval_hours
            )));
        }

        if self.base_fee == 0 || self.base_fee > self.max_fee {
            return Err(AppError::Config(format!(
                "BASE_FEE must be between 1 and MAX_FEE ({}), got {}",
                self.max_fee, self.base_fee
            )));
        }

        if self.retry_deadline_secs == 0 {
            return Err(AppError::Config("RETRY_DEADLINE_SECS must be positive".to_string()));
        }

        Ok(Settings {
            keypair,
            receiver,
            schedule: ScheduleConfig::every_hours(self.interval_hours),
            retry: RetryPolicy {
                baseline_fee: self.base_fee,
                max_fee: self.max_fee,
                deadline: Duration::from_secs(self.retry_deadline_secs),
                ..RetryPolicy::default()
            },
            stellar: StellarConfig {
                horizon_url: self.horizon_url.trim_end_matches('/').to_string(),
                network_passphrase: self.network_passphrase,
                ..StellarConfig::default()
            },
            log_dir: self.log_dir,
        })
    }
}
