use crate::application::decision::DecisionPolicy;
use crate::application::executor::{ExecutionOutcome, PortfolioExecutor};
use crate::application::optimization::{
    HyperparameterSearch, SearchReport, SearchSettings, train_best, validation_scorer,
};
use crate::domain::errors::{CycleError, MarketDataError, SearchError};
use crate::domain::features::{Dataset, FeatureBuilder};
use crate::domain::market::{HistoryRange, PriceSeries};
use crate::domain::ports::{
    Brokerage, MarketDataService, Model, NewsDataService, SentimentClassifier, Trainer,
};
use crate::domain::search_space::Configuration;
use crate::domain::sentiment::{Headline, SentimentAlignment, SentimentScore};
use crate::domain::trading::{Credentials, Decision};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One unit of work the scheduler repeats.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleOutcome, CycleError>;
}

/// External collaborators of a cycle.
#[derive(Clone)]
pub struct CyclePorts {
    pub market_data: Arc<dyn MarketDataService>,
    pub news: Arc<dyn NewsDataService>,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub brokerage: Arc<dyn Brokerage>,
}

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub ticker: String,
    pub history: HistoryRange,
    pub credentials: Credentials,
    pub validation_ratio: f64,
    pub training_epochs: usize,
    pub search: SearchSettings,
}

/// What a completed cycle did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub decision: Decision,
    pub execution: ExecutionOutcome,
    pub best_configuration: Configuration,
    pub best_score: f64,
    pub trials: usize,
    pub degenerate_trials: usize,
    pub windows: usize,
    pub sentiment_filled: usize,
}

/// fetch → align sentiment → build windows → search → train best → decide → execute.
///
/// Every artifact (series, windows, trials, model) is local to one `run` call.
pub struct TradingCycle {
    ports: CyclePorts,
    trainer: Arc<dyn Trainer>,
    features: FeatureBuilder,
    policy: DecisionPolicy,
    executor: PortfolioExecutor,
    settings: CycleSettings,
}

impl TradingCycle {
    pub fn new(
        ports: CyclePorts,
        trainer: Arc<dyn Trainer>,
        features: FeatureBuilder,
        policy: DecisionPolicy,
        executor: PortfolioExecutor,
        settings: CycleSettings,
    ) -> Self {
        Self {
            ports,
            trainer,
            features,
            policy,
            executor,
            settings,
        }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<CycleOutcome, CycleError> {
        let ticker = self.settings.ticker.as_str();
        let (start, end) = self.settings.history.resolve(today);
        info!("Cycle: {} from {} to {}", ticker, start, end);

        // 1. Data
        let closes = self
            .ports
            .market_data
            .get_daily_closes(ticker, start, end)
            .await?;
        let series = PriceSeries::from_closes(ticker, closes)?;

        let headlines = self.ports.news.fetch_headlines().await?;
        let daily = self.score_headlines(&headlines)?;
        let alignment = SentimentAlignment::align(&series.dates(), &daily)?;
        if alignment.filled > 0 {
            info!(
                "Cycle: {} of {} dates had no headline, filled with mean sentiment {:.4}",
                alignment.filled,
                series.len(),
                alignment.fallback
            );
        }

        // 2. Features
        let feature_set = self.features.build(&series, &alignment)?;
        let (train, validation) = feature_set.dataset.split(self.settings.validation_ratio)?;
        let (negatives, positives) = validation.class_counts();
        debug!(
            "Cycle: {} training / {} validation windows ({} up, {} down in validation)",
            train.len(),
            validation.len(),
            positives,
            negatives
        );
        // Every trial would score against the same labels, so none could succeed.
        if negatives == 0 || positives == 0 {
            return Err(SearchError::DegenerateLabels {
                class: u8::from(positives > 0),
                count: validation.len(),
            }
            .into());
        }

        // 3. Search + train best, off the async runtime
        let (report, model) = self
            .search_and_train(
                Arc::new(train),
                Arc::new(validation),
                feature_set.dataset.clone(),
            )
            .await?;

        // 4. Decide on fresh holdings
        let session = self
            .ports
            .brokerage
            .authenticate(&self.settings.credentials)
            .await?;
        let holdings = self.ports.brokerage.get_holdings(&session).await?;
        let decision = self
            .policy
            .decide(model.as_ref(), &feature_set.latest, &holdings, ticker);
        info!(
            "Cycle: {} {} (p={:.4}, θ={:.2}, held={})",
            decision.action,
            ticker,
            decision.prediction_probability,
            decision.threshold,
            holdings.quantity(ticker)
        );

        // 5. Execute
        let execution = self.executor.execute(&session, &decision).await?;

        Ok(CycleOutcome {
            decision,
            execution,
            best_configuration: report.best_configuration.clone(),
            best_score: report.best_score,
            trials: report.trials.len(),
            degenerate_trials: report.degenerate_count(),
            windows: feature_set.dataset.len(),
            sentiment_filled: alignment.filled,
        })
    }

    /// Classifies every headline; failures are skipped, but at least one must succeed.
    fn score_headlines(&self, headlines: &[Headline]) -> Result<Vec<SentimentScore>, CycleError> {
        let mut scored = Vec::with_capacity(headlines.len());
        for headline in headlines {
            match self.ports.classifier.classify(&headline.title) {
                Ok(score) => scored.push((headline.clone(), score)),
                Err(e) => warn!("Cycle: skipping headline '{}': {}", headline.title, e),
            }
        }

        if scored.is_empty() {
            return Err(MarketDataError::unavailable(
                "sentiment",
                format!("none of {} headlines could be classified", headlines.len()),
            )
            .into());
        }

        debug!(
            "Cycle: classified {} of {} headlines",
            scored.len(),
            headlines.len()
        );
        Ok(SentimentScore::daily_means(&scored))
    }

    async fn search_and_train(
        &self,
        train: Arc<Dataset>,
        validation: Arc<Dataset>,
        full: Arc<Dataset>,
    ) -> Result<(SearchReport, Box<dyn Model>), CycleError> {
        let trainer = self.trainer.clone();
        let settings = self.settings.search.clone();
        let epochs = self.settings.training_epochs;

        let task = tokio::task::spawn_blocking(move || {
            let space = trainer.search_space();
            let scorer = validation_scorer(trainer.clone(), train, validation, epochs);
            let report = HyperparameterSearch::new(settings).run(&space, scorer)?;
            let model = train_best(trainer.as_ref(), &report, &full, epochs)?;
            Ok::<_, CycleError>((report, model))
        });

        task.await.map_err(|e| CycleError::Internal {
            reason: format!("search task failed: {}", e),
        })?
    }
}

#[async_trait]
impl CycleRunner for TradingCycle {
    async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        self.run(Utc::now().date_naive()).await
    }
}
