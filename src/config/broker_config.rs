//! Brokerage configuration.
//!
//! Credentials are read from the environment (or a local `.env`) only; there are
//! no compiled-in defaults for them.

use super::source::ConfigSource;
use crate::domain::trading::Credentials;

pub const DEFAULT_ALPACA_BASE_URL: &str = "https://paper-api.alpaca.markets";
pub const DEFAULT_ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

#[derive(Debug, Clone, Default)]
pub struct BrokerEnvConfig {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub data_url: String,
}

impl BrokerEnvConfig {
    pub fn from_env() -> Self {
        Self::from_source(&ConfigSource::process())
    }

    pub fn from_source(source: &ConfigSource) -> Self {
        Self {
            api_key: source.string_or("ALPACA_API_KEY", ""),
            secret_key: source.string_or("ALPACA_SECRET_KEY", ""),
            base_url: source.string_or("ALPACA_BASE_URL", DEFAULT_ALPACA_BASE_URL),
            data_url: source.string_or("ALPACA_DATA_URL", DEFAULT_ALPACA_DATA_URL),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            api_secret: self.secret_key.clone(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}
