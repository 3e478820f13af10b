use crate::domain::errors::{BrokerageError, MarketDataError, SearchError, SentimentError};
use crate::domain::features::{Dataset, FeatureWindow};
use crate::domain::market::DailyClose;
use crate::domain::search_space::{Configuration, SearchSpace};
use crate::domain::sentiment::Headline;
use crate::domain::trading::{Credentials, Holdings, OrderConfirmation, OrderRequest, Session};
use async_trait::async_trait;
use chrono::NaiveDate;

// Need async_trait for async functions in traits
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Daily adjusted closes for `[start, end]`, oldest first.
    /// An empty result is `DataUnavailable`, never an empty vector.
    async fn get_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, MarketDataError>;
}

#[async_trait]
pub trait NewsDataService: Send + Sync {
    async fn fetch_headlines(&self) -> Result<Vec<Headline>, MarketDataError>;
}

pub trait SentimentClassifier: Send + Sync {
    /// Scores a single headline in [-1, 1].
    fn classify(&self, headline: &str) -> Result<f64, SentimentError>;
}

#[async_trait]
pub trait Brokerage: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, BrokerageError>;
    async fn get_holdings(&self, session: &Session) -> Result<Holdings, BrokerageError>;
    async fn submit_order(
        &self,
        session: &Session,
        order: &OrderRequest,
    ) -> Result<OrderConfirmation, BrokerageError>;
}

/// A fitted predictor. Exposes nothing but the probability of an up move.
pub trait Model: Send + Sync {
    fn predict(&self, window: &FeatureWindow) -> f64;
}

/// Prediction engine capability: declares its hyperparameters and fits models.
///
/// Implementations must not mutate the dataset or keep state between calls;
/// trials call `train` concurrently.
pub trait Trainer: Send + Sync {
    fn name(&self) -> &str;

    fn search_space(&self) -> SearchSpace;

    fn train(
        &self,
        config: &Configuration,
        dataset: &Dataset,
        epochs: usize,
    ) -> Result<Box<dyn Model>, SearchError>;
}
