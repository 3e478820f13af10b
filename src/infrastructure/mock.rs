use crate::domain::errors::{BrokerageError, MarketDataError};
use crate::domain::market::DailyClose;
use crate::domain::ports::{Brokerage, MarketDataService};
use crate::domain::trading::{
    Credentials, Holdings, OrderConfirmation, OrderRequest, OrderSide, Session,
};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, TimeZone, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Deterministic random-walk daily closes, one per weekday.
#[derive(Clone)]
pub struct MockMarketDataService {
    seed: u64,
    base_price: f64,
    daily_volatility: f64,
}

impl MockMarketDataService {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            base_price: 150.0,
            daily_volatility: 0.015,
        }
    }
}

impl Default for MockMarketDataService {
    fn default() -> Self {
        Self::new(7)
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn get_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, MarketDataError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut price = self.base_price;
        let mut closes = Vec::new();

        let mut day = start;
        while day <= end {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                let shock: f64 = rng.random_range(-1.0..1.0) * self.daily_volatility;
                price *= 1.0 + shock;
                if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
                    closes.push(DailyClose {
                        timestamp: Utc.from_utc_datetime(&midnight),
                        adjusted_close: price,
                    });
                }
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        if closes.is_empty() {
            return Err(MarketDataError::unavailable(
                "mock",
                format!("no trading days for {} between {} and {}", ticker, start, end),
            ));
        }

        info!(
            "MockMarketDataService: generated {} closes for {}",
            closes.len(),
            ticker
        );
        Ok(closes)
    }
}

/// In-memory brokerage that fills market orders immediately.
#[derive(Clone)]
pub struct MockBrokerage {
    holdings: Arc<RwLock<Holdings>>,
    orders: Arc<RwLock<Vec<OrderRequest>>>,
    reject_reason: Option<String>,
    unconfirmed_reason: Option<String>,
    fail_auth: bool,
    holdings_queries: Arc<AtomicUsize>,
    submission_attempts: Arc<AtomicUsize>,
}

impl MockBrokerage {
    pub fn new(initial: Holdings) -> Self {
        Self {
            holdings: Arc::new(RwLock::new(initial)),
            orders: Arc::new(RwLock::new(Vec::new())),
            reject_reason: None,
            unconfirmed_reason: None,
            fail_auth: false,
            holdings_queries: Arc::new(AtomicUsize::new(0)),
            submission_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every order submission is rejected with `reason`.
    pub fn rejecting(mut self, reason: &str) -> Self {
        self.reject_reason = Some(reason.to_string());
        self
    }

    /// Every order submission is lost in transit: nothing fills and the caller
    /// gets `OrderUnconfirmed` with `reason`.
    pub fn unconfirming(mut self, reason: &str) -> Self {
        self.unconfirmed_reason = Some(reason.to_string());
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub async fn holdings(&self) -> Holdings {
        self.holdings.read().await.clone()
    }

    pub async fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.orders.read().await.clone()
    }

    pub fn holdings_queries(&self) -> usize {
        self.holdings_queries.load(Ordering::SeqCst)
    }

    pub fn submission_attempts(&self) -> usize {
        self.submission_attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockBrokerage {
    fn default() -> Self {
        Self::new(Holdings::new())
    }
}

#[async_trait]
impl Brokerage for MockBrokerage {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, BrokerageError> {
        if self.fail_auth {
            return Err(BrokerageError::Authentication {
                reason: "mock credentials refused".to_string(),
            });
        }
        Ok(Session {
            account_id: "mock-account".to_string(),
            credentials: credentials.clone(),
        })
    }

    async fn get_holdings(&self, _session: &Session) -> Result<Holdings, BrokerageError> {
        self.holdings_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.holdings.read().await.clone())
    }

    async fn submit_order(
        &self,
        _session: &Session,
        order: &OrderRequest,
    ) -> Result<OrderConfirmation, BrokerageError> {
        self.submission_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.reject_reason {
            return Err(BrokerageError::OrderRejected {
                ticker: order.ticker.clone(),
                reason: reason.clone(),
            });
        }
        if let Some(reason) = &self.unconfirmed_reason {
            return Err(BrokerageError::OrderUnconfirmed {
                ticker: order.ticker.clone(),
                client_order_id: order.client_order_id.clone(),
                reason: reason.clone(),
            });
        }

        {
            let mut holdings = self.holdings.write().await;
            let current = holdings.quantity(&order.ticker);
            let next = match order.side {
                OrderSide::Buy => current + order.quantity,
                OrderSide::Sell => (current - order.quantity).max(Decimal::ZERO),
            };
            holdings.insert(&order.ticker, next);
        }
        self.orders.write().await.push(order.clone());

        info!(
            "MockBrokerage: filled {} {} {}",
            order.side, order.quantity, order.ticker
        );

        Ok(OrderConfirmation {
            order_id: Uuid::new_v4().to_string(),
            client_order_id: order.client_order_id.clone(),
            ticker: order.ticker.clone(),
            side: order.side,
            quantity: order.quantity,
            status: "filled".to_string(),
            submitted_at: Utc::now(),
        })
    }
}
