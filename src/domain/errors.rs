use thiserror::Error;

/// Errors related to market data retrieval and dataset shape
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Data unavailable for {source_name}: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("Insufficient data: {available} observations for window length {window}")]
    InsufficientData { available: usize, window: usize },

    #[error(
        "Cannot split {total} windows: {training} for training and {validation} for validation"
    )]
    InsufficientSplit {
        total: usize,
        training: usize,
        validation: usize,
    },
}

impl MarketDataError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        MarketDataError::DataUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the sentiment classifier
#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("Sentiment classification failed: {reason}")]
    Classification { reason: String },
}

/// Errors raised while scoring or training model configurations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Degenerate validation labels: all {count} labels are class {class}")]
    DegenerateLabels { class: u8, count: usize },

    #[error("All {trials} trials were degenerate or failed; no configuration scored")]
    AllTrialsDegenerate { trials: usize },

    #[error("Training failed: {reason}")]
    Training { reason: String },

    #[error("Empty search space")]
    EmptySearchSpace,
}

/// Errors related to the brokerage account
#[derive(Debug, Error)]
pub enum BrokerageError {
    #[error("Brokerage authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("Order rejected for {ticker}: {reason}")]
    OrderRejected { ticker: String, reason: String },

    #[error("Brokerage unavailable: {reason}")]
    Unavailable { reason: String },

    /// The order may or may not have reached the book.
    #[error("Order {client_order_id} for {ticker} outcome unknown: {reason}")]
    OrderUnconfirmed {
        ticker: String,
        client_order_id: String,
        reason: String,
    },
}

/// Everything that can end a single retrain/decide/execute cycle.
///
/// None of these terminate the scheduler; they terminate the current cycle only.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    Sentiment(#[from] SentimentError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Brokerage(#[from] BrokerageError),

    #[error("Cycle task failed: {reason}")]
    Internal { reason: String },
}

impl CycleError {
    /// Errors an operator has to look at: an intended trade could not be executed
    /// or its outcome is unknown.
    pub fn requires_operator(&self) -> bool {
        matches!(
            self,
            CycleError::Brokerage(BrokerageError::Authentication { .. })
                | CycleError::Brokerage(BrokerageError::OrderRejected { .. })
                | CycleError::Brokerage(BrokerageError::OrderUnconfirmed { .. })
                | CycleError::Internal { .. }
        )
    }
}
