use super::common::{authorized, error_message};
use crate::domain::errors::BrokerageError;
use crate::domain::ports::Brokerage;
use crate::domain::trading::{
    Credentials, Holdings, OrderConfirmation, OrderRequest, Session,
};
use crate::infrastructure::core::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

// ===== Wire types =====

#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    trading_blocked: bool,
}

#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
}

#[derive(Debug, Serialize)]
struct AlpacaOrderRequest<'a> {
    symbol: &'a str,
    qty: String,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    time_in_force: &'a str,
    client_order_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct AlpacaOrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

// ===== Brokerage (REST API) =====

/// Alpaca trading API: account, positions and market orders.
///
/// Reads go through the retrying client behind a circuit breaker. Orders use a
/// client without retry middleware and are sent exactly once per call.
pub struct AlpacaBrokerage {
    read_client: ClientWithMiddleware,
    order_client: ClientWithMiddleware,
    base_url: String,
    circuit_breaker: CircuitBreaker,
}

impl AlpacaBrokerage {
    pub fn new(base_url: String) -> Self {
        Self {
            read_client: HttpClientFactory::create_client(),
            order_client: HttpClientFactory::create_client_without_retry(),
            base_url: base_url.trim_end_matches('/').to_string(),
            circuit_breaker: CircuitBreaker::new("AlpacaTrading", 5, Duration::from_secs(30)),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<T, BrokerageError> {
        let url = format!("{}{}", self.base_url, path);
        let request = authorized(
            self.read_client.get(&url),
            &credentials.api_key,
            &credentials.api_secret,
        );

        let call = async {
            let response = request.send().await.map_err(|e| BrokerageError::Unavailable {
                reason: format!("GET {}: {}", path, e),
            })?;

            let status = response.status();
            let body = response.text().await.map_err(|e| BrokerageError::Unavailable {
                reason: format!("GET {}: failed to read body: {}", path, e),
            })?;

            if !status.is_success() {
                return Err(classify_read_failure(status, &body));
            }

            serde_json::from_str::<T>(&body).map_err(|e| BrokerageError::Unavailable {
                reason: format!("GET {}: malformed response: {}", path, e),
            })
        };

        self.circuit_breaker
            .call_classified(call, |e| matches!(e, BrokerageError::Unavailable { .. }))
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Open { .. } => BrokerageError::Unavailable {
                    reason: e.to_string(),
                },
                CircuitBreakerError::Inner(inner) => inner,
            })
    }
}

fn classify_read_failure(status: StatusCode, body: &str) -> BrokerageError {
    let reason = format!("HTTP {}: {}", status, error_message(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BrokerageError::Authentication { reason },
        _ => BrokerageError::Unavailable { reason },
    }
}

/// A 5xx on the order path may still have placed the order, so it is unconfirmed
/// rather than unavailable.
fn classify_order_failure(status: StatusCode, body: &str, order: &OrderRequest) -> BrokerageError {
    let reason = format!("HTTP {}: {}", status, error_message(body));
    match status {
        StatusCode::UNAUTHORIZED => BrokerageError::Authentication { reason },
        s if s.is_server_error() => unconfirmed(order, reason),
        _ => BrokerageError::OrderRejected {
            ticker: order.ticker.clone(),
            reason,
        },
    }
}

fn unconfirmed(order: &OrderRequest, reason: impl Into<String>) -> BrokerageError {
    BrokerageError::OrderUnconfirmed {
        ticker: order.ticker.clone(),
        client_order_id: order.client_order_id.clone(),
        reason: reason.into(),
    }
}

fn holdings_from_positions(positions: Vec<AlpacaPosition>) -> Holdings {
    let mut holdings = Holdings::new();
    for position in positions {
        match position.qty.parse::<Decimal>() {
            Ok(qty) => holdings.insert(&position.symbol, qty),
            Err(e) => warn!(
                "AlpacaBrokerage: unparseable quantity '{}' for {}: {}",
                position.qty, position.symbol, e
            ),
        }
    }
    holdings
}

#[async_trait]
impl Brokerage for AlpacaBrokerage {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, BrokerageError> {
        if credentials.api_key.is_empty() || credentials.api_secret.is_empty() {
            return Err(BrokerageError::Authentication {
                reason: "API key or secret not configured".to_string(),
            });
        }

        let account: AlpacaAccount = self.get_json("/v2/account", credentials).await?;
        if account.trading_blocked {
            return Err(BrokerageError::Authentication {
                reason: format!("account {} is blocked from trading", account.id),
            });
        }

        info!(
            "AlpacaBrokerage: authenticated account {} (status: {})",
            account.id, account.status
        );
        Ok(Session {
            account_id: account.id,
            credentials: credentials.clone(),
        })
    }

    async fn get_holdings(&self, session: &Session) -> Result<Holdings, BrokerageError> {
        let positions: Vec<AlpacaPosition> =
            self.get_json("/v2/positions", &session.credentials).await?;
        Ok(holdings_from_positions(positions))
    }

    async fn submit_order(
        &self,
        session: &Session,
        order: &OrderRequest,
    ) -> Result<OrderConfirmation, BrokerageError> {
        let body = AlpacaOrderRequest {
            symbol: &order.ticker,
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: "market",
            time_in_force: "day",
            client_order_id: &order.client_order_id,
        };
        let payload = serde_json::to_string(&body).map_err(|e| BrokerageError::OrderRejected {
            ticker: order.ticker.clone(),
            reason: format!("failed to serialize order: {}", e),
        })?;

        let url = format!("{}/v2/orders", self.base_url);
        let response = authorized(
            self.order_client.post(&url),
            &session.credentials.api_key,
            &session.credentials.api_secret,
        )
        .header("Content-Type", "application/json")
        .body(payload)
        .send()
        .await
        .map_err(|e| unconfirmed(order, format!("POST /v2/orders: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(
                "AlpacaBrokerage: order {} for {} failed with {}: {}",
                order.client_order_id, order.ticker, status, text
            );
            return Err(classify_order_failure(status, &text, order));
        }

        let accepted: AlpacaOrderResponse = serde_json::from_str(&text)
            .map_err(|e| unconfirmed(order, format!("HTTP {} but response unreadable: {}", status, e)))?;

        info!(
            "AlpacaBrokerage: order placed: {} (status: {})",
            accepted.id, accepted.status
        );

        Ok(OrderConfirmation {
            order_id: accepted.id,
            client_order_id: order.client_order_id.clone(),
            ticker: order.ticker.clone(),
            side: order.side,
            quantity: order.quantity,
            status: accepted.status,
            submitted_at: accepted.submitted_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::OrderSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positions_map_to_holdings() {
        let positions: Vec<AlpacaPosition> = serde_json::from_str(
            r#"[{"symbol":"AAPL","qty":"3","avg_entry_price":"180.1"},
                {"symbol":"MSFT","qty":"0"},
                {"symbol":"TSLA","qty":"n/a"}]"#,
        )
        .unwrap();

        let holdings = holdings_from_positions(positions);
        assert_eq!(holdings.quantity("AAPL"), dec!(3));
        assert!(!holdings.holds("MSFT"));
        assert!(!holdings.holds("TSLA"));
    }

    #[test]
    fn test_read_failures_classified() {
        assert!(matches!(
            classify_read_failure(StatusCode::FORBIDDEN, "{}"),
            BrokerageError::Authentication { .. }
        ));
        assert!(matches!(
            classify_read_failure(StatusCode::BAD_GATEWAY, ""),
            BrokerageError::Unavailable { .. }
        ));
    }

    fn order() -> OrderRequest {
        OrderRequest {
            client_order_id: "9a8f-5b".to_string(),
            ticker: "AAPL".to_string(),
            side: OrderSide::Buy,
            quantity: dec!(1),
        }
    }

    #[test]
    fn test_order_failures_classified() {
        let rejected = classify_order_failure(
            StatusCode::FORBIDDEN,
            r#"{"code":40310000,"message":"insufficient buying power"}"#,
            &order(),
        );
        match rejected {
            BrokerageError::OrderRejected { ticker, reason } => {
                assert_eq!(ticker, "AAPL");
                assert!(reason.contains("insufficient buying power"));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            classify_order_failure(StatusCode::UNPROCESSABLE_ENTITY, "{}", &order()),
            BrokerageError::OrderRejected { .. }
        ));
    }

    #[test]
    fn test_server_error_on_order_is_unconfirmed() {
        match classify_order_failure(StatusCode::SERVICE_UNAVAILABLE, "", &order()) {
            BrokerageError::OrderUnconfirmed {
                ticker,
                client_order_id,
                ..
            } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(client_order_id, "9a8f-5b");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_order_endpoint_is_unconfirmed() {
        let brokerage = AlpacaBrokerage::new("http://127.0.0.1:9".to_string());
        let session = Session {
            account_id: "test".to_string(),
            credentials: Credentials {
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
            },
        };

        let result = brokerage.submit_order(&session, &order()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, BrokerageError::OrderUnconfirmed { .. }));
        assert!(err.to_string().contains("9a8f-5b"));
    }

    #[test]
    fn test_order_body_is_a_day_market_order() {
        let body = AlpacaOrderRequest {
            symbol: "AAPL",
            qty: dec!(1).to_string(),
            side: OrderSide::Buy.as_str(),
            order_type: "market",
            time_in_force: "day",
            client_order_id: "abc",
        };
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "market");
        assert_eq!(json["side"], "buy");
        assert_eq!(json["qty"], "1");
        assert_eq!(json["time_in_force"], "day");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_network() {
        let brokerage = AlpacaBrokerage::new("http://127.0.0.1:9".to_string());
        let result = brokerage.authenticate(&Credentials::default()).await;
        assert!(matches!(result, Err(BrokerageError::Authentication { .. })));
    }
}
