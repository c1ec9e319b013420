//! Environment-driven configuration.
//!
//! `GatewayConfig::from_env` only reads variables; call `validate` before
//! wiring the gateway so a missing API key fails at startup instead of on
//! the first checkout.

use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.idpay.ir";
const DEFAULT_GATEWAY_ID: &str = "idpay_offsite_redirect";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingVariable { name: String },

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Whether requests run against the sandbox or real money. The processor
/// switches on the `X-SANDBOX` header, same base URL either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Test,
    Live,
}

impl GatewayMode {
    pub fn is_sandbox(&self) -> bool {
        matches!(self, GatewayMode::Test)
    }
}

impl FromStr for GatewayMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "test" => Ok(GatewayMode::Test),
            "live" => Ok(GatewayMode::Live),
            other => Err(ConfigError::InvalidValue {
                name: "IDPAY_MODE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Identifier stamped onto every payment record this gateway creates.
    pub gateway_id: String,
    pub api_key: String,
    pub mode: GatewayMode,
    pub base_url: String,
    /// Site base the processor redirects customers back to.
    pub return_base_url: String,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mode = match std::env::var("IDPAY_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => GatewayMode::Live,
        };
        let timeout_secs = match std::env::var("IDPAY_TIMEOUT_SECS") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "IDPAY_TIMEOUT_SECS".to_string(),
                value,
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            gateway_id: std::env::var("IDPAY_GATEWAY_ID")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_ID.to_string()),
            api_key: std::env::var("IDPAY_API_KEY").unwrap_or_default(),
            mode,
            base_url: std::env::var("IDPAY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            return_base_url: std::env::var("RETURN_BASE_URL").unwrap_or_default(),
            timeout_secs,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingVariable {
                name: "IDPAY_API_KEY".to_string(),
            });
        }
        if self.return_base_url.trim().is_empty() {
            return Err(ConfigError::MissingVariable {
                name: "RETURN_BASE_URL".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                name: "IDPAY_BASE_URL".to_string(),
                value: self.base_url.clone(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "IDPAY_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
