use std::env;
use std::time::Duration;

use crate::risk::DEFAULT_LIQUIDATION_THRESHOLD;

/// Upper bound for simulated price jitter, in basis points.
pub const MAX_PRICE_JITTER_BPS: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Standard,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "text" | "" => Ok(LogFormat::Standard),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("LOG_FORMAT must be 'standard' or 'json', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub log_format: LogFormat,

    // Risk / pricing
    pub liquidation_threshold: f64,
    pub price_jitter_bps: u32,
    pub collaborator_timeout: Duration,
    pub execution_lease_enabled: bool,

    // Block monitor
    pub monitor_poll_interval: Duration,

    // HTTP guards
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_hour: u32,
    /// Key rate limits on `x-forwarded-for` / `x-real-ip` instead of the
    /// peer address. Only safe behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,
    pub api_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let liquidation_threshold: f64 = env::var("LIQUIDATION_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_LIQUIDATION_THRESHOLD.to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("LIQUIDATION_THRESHOLD is not a number: {e}"))?;

        let price_jitter_bps: u32 = env::var("PRICE_JITTER_BPS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("PRICE_JITTER_BPS is not an integer: {e}"))?;

        let collaborator_timeout_ms: u64 = env::var("COLLABORATOR_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()?;

        let monitor_poll_interval_secs: u64 = env::var("MONITOR_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()?;

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            log_format: LogFormat::from_str(
                &env::var("LOG_FORMAT").unwrap_or_else(|_| "standard".into()),
            )?,

            liquidation_threshold,
            price_jitter_bps,
            collaborator_timeout: Duration::from_millis(collaborator_timeout_ms),
            execution_lease_enabled: env::var("EXECUTION_LEASE_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .map_err(|e| anyhow::anyhow!("EXECUTION_LEASE_ENABLED must be true or false: {e}"))?,

            monitor_poll_interval: Duration::from_secs(monitor_poll_interval_secs),

            rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
            rate_limit_per_hour: env::var("RATE_LIMIT_PER_HOUR")
                .unwrap_or_else(|_| "1000".into())
                .parse()?,
            trust_proxy_headers: env::var("TRUST_PROXY_HEADERS")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .map_err(|e| anyhow::anyhow!("TRUST_PROXY_HEADERS must be true or false: {e}"))?,
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot operate with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.liquidation_threshold > 0.0 && self.liquidation_threshold <= 1.0) {
            anyhow::bail!(
                "LIQUIDATION_THRESHOLD must be in (0, 1], got {}",
                self.liquidation_threshold
            );
        }
        if self.price_jitter_bps > MAX_PRICE_JITTER_BPS {
            anyhow::bail!(
                "PRICE_JITTER_BPS must be at most {MAX_PRICE_JITTER_BPS}, got {}",
                self.price_jitter_bps
            );
        }
        if self.collaborator_timeout.is_zero() {
            anyhow::bail!("COLLABORATOR_TIMEOUT_MS must be positive");
        }
        if self.monitor_poll_interval.is_zero() {
            anyhow::bail!("MONITOR_POLL_INTERVAL_SECS must be positive");
        }
        if self.rate_limit_per_minute == 0 || self.rate_limit_per_hour == 0 {
            anyhow::bail!("rate limits must be positive");
        }
        Ok(())
    }

    /// Returns true if bearer-token auth is enforced on the API.
    pub fn auth_enabled(&self) -> bool {
        self.api_token.is_some()
    }
}
