//! Control loop configuration: instrument, history range, cadence and trading rule.

use super::source::ConfigSource;
use crate::application::decision::DEFAULT_PROBABILITY_THRESHOLD;
use crate::domain::market::HistoryRange;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::time::Duration;

pub const DEFAULT_LOOKBACK_DAYS: u64 = 730;
pub const DEFAULT_REBALANCE_INTERVAL_SECS: u64 = 86_400;
pub const DEFAULT_NEWS_FEED_URL: &str =
    "https://feeds.finance.yahoo.com/rss/2.0/headline?s={ticker}&region=US&lang=en-US";

#[derive(Debug, Clone)]
pub struct LoopEnvConfig {
    pub ticker: String,
    pub history: HistoryRange,
    pub rebalance_interval: Duration,
    pub probability_threshold: f64,
    pub decision_dead_zone: f64,
    pub order_quantity: Decimal,
    pub news_feed_url: String,
}

impl LoopEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&ConfigSource::process())
    }

    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        let ticker = source
            .get("TICKER")
            .map(|t| t.to_uppercase())
            .context("TICKER must be set")?;

        let start: Option<NaiveDate> = source.parse_opt("START_DATE")?;
        let end: Option<NaiveDate> = source.parse_opt("END_DATE")?;
        let history = match (start, end) {
            (Some(start), Some(end)) => HistoryRange::Fixed { start, end },
            (None, None) => HistoryRange::Trailing {
                days: source.parse_or("LOOKBACK_DAYS", DEFAULT_LOOKBACK_DAYS)?,
            },
            _ => bail!("START_DATE and END_DATE must be set together"),
        };

        let interval_secs: u64 =
            source.parse_or("REBALANCE_INTERVAL_SECS", DEFAULT_REBALANCE_INTERVAL_SECS)?;

        Ok(Self {
            ticker,
            history,
            rebalance_interval: Duration::from_secs(interval_secs),
            probability_threshold: source
                .parse_or("PROBABILITY_THRESHOLD", DEFAULT_PROBABILITY_THRESHOLD)?,
            decision_dead_zone: source.parse_or("DECISION_DEAD_ZONE", 0.0)?,
            order_quantity: source.parse_or("ORDER_QUANTITY", Decimal::ONE)?,
            news_feed_url: source.string_or("NEWS_FEED_URL", DEFAULT_NEWS_FEED_URL),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probability_threshold) {
            bail!(
                "PROBABILITY_THRESHOLD must be in [0, 1], got {}",
                self.probability_threshold
            );
        }
        if !(0.0..0.5).contains(&self.decision_dead_zone) {
            bail!(
                "DECISION_DEAD_ZONE must be in [0, 0.5), got {}",
                self.decision_dead_zone
            );
        }
        if self.order_quantity <= Decimal::ZERO {
            bail!("ORDER_QUANTITY must be positive, got {}", self.order_quantity);
        }
        if self.rebalance_interval.is_zero() {
            bail!("REBALANCE_INTERVAL_SECS must be positive");
        }
        match self.history {
            HistoryRange::Fixed { start, end } if start >= end => {
                bail!("START_DATE ({}) must be before END_DATE ({})", start, end)
            }
            HistoryRange::Trailing { days: 0 } => bail!("LOOKBACK_DAYS must be positive"),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config =
            LoopEnvConfig::from_source(&ConfigSource::from_pairs(&[("TICKER", "aapl")])).unwrap();

        assert_eq!(config.ticker, "AAPL");
        assert_eq!(config.history, HistoryRange::Trailing { days: 730 });
        assert_eq!(config.rebalance_interval, Duration::from_secs(86_400));
        assert_eq!(config.probability_threshold, 0.5);
        assert_eq!(config.decision_dead_zone, 0.0);
        assert_eq!(config.order_quantity, dec!(1));
        assert!(config.news_feed_url.contains("{ticker}"));
        config.validate().unwrap();
    }

    #[test]
    fn test_ticker_is_required() {
        assert!(LoopEnvConfig::from_source(&ConfigSource::from_pairs(&[])).is_err());
    }

    #[test]
    fn test_explicit_range() {
        let config = LoopEnvConfig::from_source(&ConfigSource::from_pairs(&[
            ("TICKER", "MSFT"),
            ("START_DATE", "2022-01-01"),
            ("END_DATE", "2023-12-31"),
        ]))
        .unwrap();

        assert_eq!(
            config.history,
            HistoryRange::Fixed {
                start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            }
        );
    }

    #[test]
    fn test_half_open_range_is_rejected() {
        let result = LoopEnvConfig::from_source(&ConfigSource::from_pairs(&[
            ("TICKER", "MSFT"),
            ("START_DATE", "2022-01-01"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let base = &[("TICKER", "MSFT")];
        let mut config = LoopEnvConfig::from_source(&ConfigSource::from_pairs(base)).unwrap();

        config.probability_threshold = 1.2;
        assert!(config.validate().is_err());

        config.probability_threshold = 0.5;
        config.history = HistoryRange::Fixed {
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert!(config.validate().is_err());

        config.history = HistoryRange::Trailing { days: 365 };
        config.order_quantity = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
