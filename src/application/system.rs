use crate::application::cycle::{CyclePorts, CycleSettings, TradingCycle};
use crate::application::decision::DecisionPolicy;
use crate::application::executor::PortfolioExecutor;
use crate::application::scheduler::Scheduler;
use crate::config::{Config, Mode};
use crate::domain::features::FeatureBuilder;
use crate::infrastructure::alpaca::{AlpacaBrokerage, AlpacaMarketDataService};
use crate::infrastructure::mock::{MockBrokerage, MockMarketDataService};
use crate::infrastructure::models::trainer_for;
use crate::infrastructure::news::{MockNewsService, RssNewsService, SentimentAnalyzer};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires adapters for the configured mode into a runnable cycle.
pub struct Application {
    pub config: Config,
    pub cycle: Arc<TradingCycle>,
}

impl Application {
    pub fn build(config: Config) -> Result<Self> {
        config.validate()?;
        info!(
            "Building sentitrade application (Mode: {:?}, Engine: {:?})...",
            config.mode, config.engine
        );

        let ports = Self::ports(&config);
        let trainer = trainer_for(config.engine);

        let policy = DecisionPolicy::new(config.trading.probability_threshold)
            .with_dead_zone(config.trading.decision_dead_zone);
        let executor =
            PortfolioExecutor::new(ports.brokerage.clone(), config.trading.order_quantity);
        let features = FeatureBuilder::new(config.search.window_length);

        let settings = CycleSettings {
            ticker: config.trading.ticker.clone(),
            history: config.trading.history,
            credentials: config.broker.credentials(),
            validation_ratio: config.search.validation_ratio,
            training_epochs: config.search.training_epochs,
            search: config.search.search_settings(),
        };

        let cycle = TradingCycle::new(ports, trainer, features, policy, executor, settings);

        Ok(Self {
            config,
            cycle: Arc::new(cycle),
        })
    }

    fn ports(config: &Config) -> CyclePorts {
        let ticker = config.trading.ticker.as_str();
        let classifier = Arc::new(SentimentAnalyzer::new());

        match config.mode {
            Mode::Mock => {
                info!("Using Mock services");
                CyclePorts {
                    market_data: Arc::new(MockMarketDataService::default()),
                    news: Arc::new(MockNewsService::covering(ticker, config.trading.history)),
                    classifier,
                    brokerage: Arc::new(MockBrokerage::default()),
                }
            }
            Mode::Alpaca => {
                info!("Using Alpaca services ({})", config.broker.base_url);
                CyclePorts {
                    market_data: Arc::new(AlpacaMarketDataService::new(
                        config.broker.api_key.clone(),
                        config.broker.secret_key.clone(),
                        config.broker.data_url.clone(),
                    )),
                    news: Arc::new(RssNewsService::new(&config.trading.news_feed_url, ticker)),
                    classifier,
                    brokerage: Arc::new(AlpacaBrokerage::new(config.broker.base_url.clone())),
                }
            }
        }
    }

    pub fn scheduler(&self, shutdown: CancellationToken) -> Scheduler {
        Scheduler::new(
            self.cycle.clone(),
            self.config.trading.rebalance_interval,
            shutdown,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;

    #[test]
    fn test_mock_mode_builds_without_credentials() {
        let config = Config::from_source(&ConfigSource::from_pairs(&[("TICKER", "aapl")])).unwrap();
        let app = Application::build(config).unwrap();
        assert_eq!(app.config.trading.ticker, "AAPL");
    }

    #[test]
    fn test_alpaca_mode_without_credentials_does_not_build() {
        let mut config =
            Config::from_source(&ConfigSource::from_pairs(&[("TICKER", "AAPL")])).unwrap();
        config.mode = Mode::Alpaca;
        assert!(Application::build(config).is_err());
    }
}
