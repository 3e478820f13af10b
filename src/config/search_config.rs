//! Feature and hyperparameter-search configuration.

use super::source::ConfigSource;
use crate::application::optimization::SearchSettings;
use crate::application::optimization::search::DEFAULT_TRIAL_BUDGET;
use crate::domain::features::DEFAULT_WINDOW_LENGTH;
use anyhow::{Result, bail};

pub const DEFAULT_SEARCH_SEED: u64 = 42;
pub const DEFAULT_TRAINING_EPOCHS: usize = 30;
pub const DEFAULT_VALIDATION_RATIO: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct SearchEnvConfig {
    pub window_length: usize,
    pub trial_budget: usize,
    pub seed: u64,
    pub parallelism: usize,
    pub training_epochs: usize,
    pub validation_ratio: f64,
}

impl SearchEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&ConfigSource::process())
    }

    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        Ok(Self {
            window_length: source.parse_or("WINDOW_LENGTH", DEFAULT_WINDOW_LENGTH)?,
            trial_budget: source.parse_or("TRIAL_BUDGET", DEFAULT_TRIAL_BUDGET)?,
            seed: source.parse_or("SEARCH_SEED", DEFAULT_SEARCH_SEED)?,
            parallelism: source.parse_or("SEARCH_PARALLELISM", 1usize)?,
            training_epochs: source.parse_or("TRAINING_EPOCHS", DEFAULT_TRAINING_EPOCHS)?,
            validation_ratio: source.parse_or("VALIDATION_RATIO", DEFAULT_VALIDATION_RATIO)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_length < 2 {
            bail!("WINDOW_LENGTH must be at least 2, got {}", self.window_length);
        }
        if self.trial_budget == 0 {
            bail!("TRIAL_BUDGET must be at least 1");
        }
        if self.parallelism == 0 {
            bail!("SEARCH_PARALLELISM must be at least 1");
        }
        if self.training_epochs == 0 {
            bail!("TRAINING_EPOCHS must be at least 1");
        }
        if !(self.validation_ratio > 0.0 && self.validation_ratio < 1.0) {
            bail!(
                "VALIDATION_RATIO must be in (0, 1), got {}",
                self.validation_ratio
            );
        }
        Ok(())
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            trial_budget: self.trial_budget,
            seed: self.seed,
            parallelism: self.parallelism,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchEnvConfig::from_source(&ConfigSource::from_pairs(&[])).unwrap();
        assert_eq!(config.window_length, 50);
        assert_eq!(config.trial_budget, 50);
        assert_eq!(config.seed, 42);
        assert_eq!(config.parallelism, 1);
        assert_eq!(config.training_epochs, 30);
        assert_eq!(config.validation_ratio, 0.2);
        config.validate().unwrap();
    }

    #[test]
    fn test_settings_carry_budget_seed_and_parallelism() {
        let config = SearchEnvConfig::from_source(&ConfigSource::from_pairs(&[
            ("TRIAL_BUDGET", "12"),
            ("SEARCH_SEED", "7"),
            ("SEARCH_PARALLELISM", "4"),
        ]))
        .unwrap();

        let settings = config.search_settings();
        assert_eq!(settings.trial_budget, 12);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.parallelism, 4);
    }

    #[test]
    fn test_validation() {
        let mut config = SearchEnvConfig::from_source(&ConfigSource::from_pairs(&[])).unwrap();

        config.window_length = 1;
        assert!(config.validate().is_err());

        config.window_length = 50;
        config.trial_budget = 0;
        assert!(config.validate().is_err());

        config.trial_budget = 50;
        config.validation_ratio = 1.0;
        assert!(config.validate().is_err());
    }
}
