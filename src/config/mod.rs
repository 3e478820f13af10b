//! Configuration module for sentitrade.
//!
//! Structured configuration loaded from environment variables, optionally layered
//! over a TOML file, organized by concern: Broker, Loop and Search.

mod broker_config;
mod loop_config;
mod search_config;
mod source;

pub use broker_config::BrokerEnvConfig;
pub use loop_config::LoopEnvConfig;
pub use search_config::SearchEnvConfig;
pub use source::ConfigSource;

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::str::FromStr;

/// Where data comes from and where orders go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mock,
    Alpaca,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "alpaca" => Ok(Mode::Alpaca),
            _ => bail!("Invalid MODE: {}. Must be 'mock' or 'alpaca'", s),
        }
    }
}

/// Prediction engine the search tunes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEngine {
    Logistic,
    Boosted,
}

impl FromStr for ModelEngine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logistic" => Ok(ModelEngine::Logistic),
            "boosted" => Ok(ModelEngine::Boosted),
            _ => bail!(
                "Invalid MODEL_ENGINE: {}. Must be 'logistic' or 'boosted'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub engine: ModelEngine,
    pub broker: BrokerEnvConfig,
    pub trading: LoopEnvConfig,
    pub search: SearchEnvConfig,
}

impl Config {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&ConfigSource::process())
    }

    /// Load configuration, reading `path` first when given. Environment variables
    /// override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_source(&ConfigSource::with_file(path)?),
            None => Self::from_env(),
        }
    }

    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        let mode = Mode::from_str(&source.string_or("MODE", "mock"))?;
        let engine = ModelEngine::from_str(&source.string_or("MODEL_ENGINE", "logistic"))?;

        let config = Self {
            mode,
            engine,
            broker: BrokerEnvConfig::from_source(source),
            trading: LoopEnvConfig::from_source(source).context("Failed to load loop config")?,
            search: SearchEnvConfig::from_source(source).context("Failed to load search config")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.trading.validate().context("Invalid loop config")?;
        self.search.validate().context("Invalid search config")?;
        if self.mode == Mode::Alpaca && !self.broker.has_credentials() {
            bail!("MODE=alpaca requires ALPACA_API_KEY and ALPACA_SECRET_KEY");
        }
        Ok(())
    }
}
