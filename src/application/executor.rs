use crate::domain::errors::BrokerageError;
use crate::domain::ports::Brokerage;
use crate::domain::trading::{Action, Decision, OrderConfirmation, OrderRequest, Session};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Submitted(OrderConfirmation),
    /// The decision asked for an order but fresh holdings made it redundant.
    Skipped { reason: String },
    /// HOLD: nothing to do.
    NoAction,
}

/// Realises decisions against the brokerage account.
///
/// Holdings are re-queried for every decision and the check-then-act sequence runs
/// under a single lock, so at most one order per ticker goes out per call. Rejections
/// are returned to the caller as-is; there is no retry.
pub struct PortfolioExecutor {
    brokerage: Arc<dyn Brokerage>,
    quantity: Decimal,
    critical_section: Mutex<()>,
}

impl PortfolioExecutor {
    pub fn new(brokerage: Arc<dyn Brokerage>, quantity: Decimal) -> Self {
        Self {
            brokerage,
            quantity,
            critical_section: Mutex::new(()),
        }
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub async fn execute(
        &self,
        session: &Session,
        decision: &Decision,
    ) -> Result<ExecutionOutcome, BrokerageError> {
        let Some(side) = decision.action.order_side() else {
            info!(
                "PortfolioExecutor: HOLD {} (p={:.4}, θ={:.2}), no order",
                decision.ticker, decision.prediction_probability, decision.threshold
            );
            return Ok(ExecutionOutcome::NoAction);
        };

        let _guard = self.critical_section.lock().await;

        let holdings = self.brokerage.get_holdings(session).await?;
        let held = holdings.holds(&decision.ticker);

        match (decision.action, held) {
            (Action::Buy, true) => {
                let reason = format!(
                    "{} already held ({}), skipping BUY",
                    decision.ticker,
                    holdings.quantity(&decision.ticker)
                );
                info!("PortfolioExecutor: {}", reason);
                return Ok(ExecutionOutcome::Skipped { reason });
            }
            (Action::Sell, false) => {
                let reason = format!("{} not held, skipping SELL", decision.ticker);
                info!("PortfolioExecutor: {}", reason);
                return Ok(ExecutionOutcome::Skipped { reason });
            }
            _ => {}
        }

        let order = OrderRequest {
            client_order_id: Uuid::new_v4().to_string(),
            ticker: decision.ticker.clone(),
            side,
            quantity: self.quantity,
        };

        info!(
            "PortfolioExecutor: submitting {} {} {} (p={:.4}, θ={:.2}, client id {})",
            side,
            order.quantity,
            order.ticker,
            decision.prediction_probability,
            decision.threshold,
            order.client_order_id
        );

        match self.brokerage.submit_order(session, &order).await {
            Ok(confirmation) => {
                info!(
                    "PortfolioExecutor: order {} accepted (status: {})",
                    confirmation.order_id, confirmation.status
                );
                Ok(ExecutionOutcome::Submitted(confirmation))
            }
            Err(e @ BrokerageError::OrderUnconfirmed { .. }) => {
                error!(
                    "PortfolioExecutor: {} {} {} outcome unknown, check the account before the next cycle: {}",
                    side, order.quantity, order.ticker, e
                );
                Err(e)
            }
            Err(e) => {
                error!(
                    "PortfolioExecutor: {} {} {} NOT executed: {}",
                    side, order.quantity, order.ticker, e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::CycleError;
    use crate::domain::trading::{Credentials, Holdings, OrderSide};
    use crate::infrastructure::mock::MockBrokerage;
    use rust_decimal_macros::dec;

    fn decision(action: Action) -> Decision {
        Decision {
            action,
            ticker: "AAPL".to_string(),
            prediction_probability: 0.6,
            threshold: 0.5,
        }
    }

    async fn session(brokerage: &MockBrokerage) -> Session {
        brokerage
            .authenticate(&Credentials::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_buy_when_absent_submits_once() {
        let brokerage = Arc::new(MockBrokerage::new(Holdings::new()));
        let executor = PortfolioExecutor::new(brokerage.clone(), dec!(1));
        let session = session(&brokerage).await;

        let outcome = executor.execute(&session, &decision(Action::Buy)).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Submitted(_)));
        let orders = brokerage.submitted_orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].quantity, dec!(1));
        assert!(brokerage.holdings().await.holds("AAPL"));
    }

    #[tokio::test]
    async fn test_buy_when_already_held_is_noop() {
        let brokerage = Arc::new(MockBrokerage::new(
            Holdings::new().with_position("AAPL", dec!(1)),
        ));
        let executor = PortfolioExecutor::new(brokerage.clone(), dec!(1));
        let session = session(&brokerage).await;

        let outcome = executor.execute(&session, &decision(Action::Buy)).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Skipped { .. }));
        assert!(brokerage.submitted_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_sell_when_not_held_is_noop() {
        let brokerage = Arc::new(MockBrokerage::new(Holdings::new()));
        let executor = PortfolioExecutor::new(brokerage.clone(), dec!(1));
        let session = session(&brokerage).await;

        let outcome = executor.execute(&session, &decision(Action::Sell)).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Skipped { .. }));
        assert!(brokerage.submitted_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_hold_does_not_query_or_submit() {
        let brokerage = Arc::new(MockBrokerage::new(Holdings::new()));
        let executor = PortfolioExecutor::new(brokerage.clone(), dec!(1));
        let session = session(&brokerage).await;

        let outcome = executor.execute(&session, &decision(Action::Hold)).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::NoAction);
        assert_eq!(brokerage.holdings_queries(), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_surfaced_without_retry() {
        let brokerage = Arc::new(MockBrokerage::new(Holdings::new()).rejecting("market closed"));
        let executor = PortfolioExecutor::new(brokerage.clone(), dec!(1));
        let session = session(&brokerage).await;

        let result = executor.execute(&session, &decision(Action::Buy)).await;

        assert!(matches!(result, Err(BrokerageError::OrderRejected { .. })));
        assert_eq!(brokerage.submission_attempts(), 1);
        assert!(!brokerage.holdings().await.holds("AAPL"));
    }

    #[tokio::test]
    async fn test_lost_order_is_unconfirmed_and_flagged() {
        let brokerage =
            Arc::new(MockBrokerage::new(Holdings::new()).unconfirming("operation timed out"));
        let executor = PortfolioExecutor::new(brokerage.clone(), dec!(1));
        let session = session(&brokerage).await;

        let err = executor
            .execute(&session, &decision(Action::Buy))
            .await
            .unwrap_err();

        assert!(matches!(err, BrokerageError::OrderUnconfirmed { .. }));
        assert_eq!(brokerage.submission_attempts(), 1);
        let cycle_error: CycleError = err.into();
        assert!(cycle_error.requires_operator());
    }

    #[tokio::test]
    async fn test_concurrent_buys_submit_a_single_order() {
        let brokerage = Arc::new(MockBrokerage::new(Holdings::new()));
        let executor = Arc::new(PortfolioExecutor::new(brokerage.clone(), dec!(1)));
        let session = session(&brokerage).await;

        let mut handles = Vec::new();
        for _ in 0..5 {
            let executor = executor.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                executor.execute(&session, &decision(Action::Buy)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(brokerage.submitted_orders().await.len(), 1);
    }
}
