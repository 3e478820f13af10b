use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sentitrade::application::cycle::{CyclePorts, CycleSettings, TradingCycle};
use sentitrade::application::decision::DecisionPolicy;
use sentitrade::application::executor::{ExecutionOutcome, PortfolioExecutor};
use sentitrade::application::optimization::SearchSettings;
use sentitrade::application::system::Application;
use sentitrade::config::{Config, ConfigSource, ModelEngine};
use sentitrade::domain::errors::{CycleError, MarketDataError};
use sentitrade::domain::features::FeatureBuilder;
use sentitrade::domain::market::HistoryRange;
use sentitrade::domain::trading::{Action, Credentials, Holdings};
use sentitrade::infrastructure::mock::{MockBrokerage, MockMarketDataService};
use sentitrade::infrastructure::models::trainer_for;
use sentitrade::infrastructure::news::{MockNewsService, SentimentAnalyzer};
use std::sync::Arc;
use tokio_test::assert_ok;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn one_year() -> HistoryRange {
    HistoryRange::Fixed {
        start: date(2022, 7, 1),
        end: date(2023, 6, 30),
    }
}

fn mock_cycle(
    engine: ModelEngine,
    brokerage: Arc<MockBrokerage>,
    threshold: f64,
    seed: u64,
) -> TradingCycle {
    cycle_over(one_year(), engine, brokerage, threshold, seed)
}

fn cycle_over(
    history: HistoryRange,
    engine: ModelEngine,
    brokerage: Arc<MockBrokerage>,
    threshold: f64,
    seed: u64,
) -> TradingCycle {
    let ports = CyclePorts {
        market_data: Arc::new(MockMarketDataService::new(3)),
        news: Arc::new(MockNewsService::new("MSFT", date(2023, 6, 30), 240)),
        classifier: Arc::new(SentimentAnalyzer::new()),
        brokerage: brokerage.clone(),
    };
    let settings = CycleSettings {
        ticker: "MSFT".to_string(),
        history,
        credentials: Credentials::default(),
        validation_ratio: 0.25,
        training_epochs: 5,
        search: SearchSettings {
            trial_budget: 8,
            seed,
            parallelism: 2,
            ..Default::default()
        },
    };

    TradingCycle::new(
        ports,
        trainer_for(engine),
        FeatureBuilder::new(15),
        DecisionPolicy::new(threshold),
        PortfolioExecutor::new(brokerage, dec!(1)),
        settings,
    )
}

#[tokio::test]
async fn test_zero_threshold_buys_once_and_then_skips() {
    init_logging();
    let brokerage = Arc::new(MockBrokerage::default());
    // Every probability is >= 0, so the policy always says BUY when flat.
    let cycle = mock_cycle(ModelEngine::Logistic, brokerage.clone(), 0.0, 1);

    let first = assert_ok!(cycle.run(date(2023, 7, 3)).await);
    assert_eq!(first.decision.action, Action::Buy);
    assert!(matches!(first.execution, ExecutionOutcome::Submitted(_)));

    // Holding now, so the same threshold maps to HOLD.
    let second = assert_ok!(cycle.run(date(2023, 7, 3)).await);
    assert_eq!(second.decision.action, Action::Hold);
    assert_eq!(second.execution, ExecutionOutcome::NoAction);

    assert_eq!(brokerage.submitted_orders().await.len(), 1);
    assert_eq!(brokerage.holdings().await.quantity("MSFT"), dec!(1));
}

#[tokio::test]
async fn test_threshold_one_sells_an_existing_position() {
    init_logging();
    let brokerage = Arc::new(MockBrokerage::new(
        Holdings::new().with_position("MSFT", dec!(1)),
    ));
    // No probability exceeds 1, so a held position is always sold.
    let cycle = mock_cycle(ModelEngine::Boosted, brokerage.clone(), 1.0, 2);

    let outcome = assert_ok!(cycle.run(date(2023, 7, 3)).await);

    assert_eq!(outcome.decision.action, Action::Sell);
    assert!(matches!(outcome.execution, ExecutionOutcome::Submitted(_)));
    assert!(!brokerage.holdings().await.holds("MSFT"));
}

#[tokio::test]
async fn test_same_seed_selects_the_same_configuration() {
    let first = mock_cycle(
        ModelEngine::Logistic,
        Arc::new(MockBrokerage::default()),
        0.5,
        9,
    );
    let second = mock_cycle(
        ModelEngine::Logistic,
        Arc::new(MockBrokerage::default()),
        0.5,
        9,
    );

    let a = assert_ok!(first.run(date(2023, 7, 3)).await);
    let b = assert_ok!(second.run(date(2023, 7, 3)).await);

    assert_eq!(a.best_configuration, b.best_configuration);
    assert_eq!(a.best_score, b.best_score);
    assert_eq!(a.decision.prediction_probability, b.decision.prediction_probability);
}

#[tokio::test]
async fn test_range_without_trading_days_skips_the_cycle() {
    let brokerage = Arc::new(MockBrokerage::default());
    // A weekend: the mock feed has no bars for it.
    let weekend = HistoryRange::Fixed {
        start: date(2023, 7, 1),
        end: date(2023, 7, 2),
    };
    let cycle = cycle_over(weekend, ModelEngine::Logistic, brokerage.clone(), 0.5, 1);

    let err = cycle.run(date(2023, 7, 3)).await.unwrap_err();

    assert!(matches!(
        err,
        CycleError::MarketData(MarketDataError::DataUnavailable { .. })
    ));
    assert!(!err.requires_operator());
    assert_eq!(brokerage.holdings_queries(), 0);
}

#[tokio::test]
async fn test_application_runs_one_mock_cycle_from_config() {
    init_logging();
    let config = Config::from_source(&ConfigSource::from_pairs(&[
        ("TICKER", "nvda"),
        ("START_DATE", "2023-01-02"),
        ("END_DATE", "2023-09-29"),
        ("TRIAL_BUDGET", "4"),
        ("WINDOW_LENGTH", "10"),
        ("TRAINING_EPOCHS", "3"),
    ]))
    .unwrap();

    let app = Application::build(config).unwrap();
    let outcome = assert_ok!(app.cycle.run(date(2023, 10, 2)).await);

    assert_eq!(outcome.decision.ticker, "NVDA");
    assert_eq!(outcome.trials, 4);
    assert!(outcome.windows > 100);
}
