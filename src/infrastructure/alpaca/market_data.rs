use super::common::{AlpacaBar, authorized, error_message};
use crate::domain::errors::MarketDataError;
use crate::domain::market::DailyClose;
use crate::domain::ports::MarketDataService;
use crate::infrastructure::core::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};

const SOURCE_NAME: &str = "alpaca";
const PAGE_LIMIT: &str = "10000";

#[derive(Debug, Deserialize)]
struct BarsPage {
    #[serde(default)]
    bars: HashMap<String, Vec<AlpacaBar>>,
    next_page_token: Option<String>,
}

/// Daily split/dividend-adjusted bars from the Alpaca data API.
pub struct AlpacaMarketDataService {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    data_base_url: String,
    circuit_breaker: CircuitBreaker,
}

impl AlpacaMarketDataService {
    pub fn new(api_key: String, api_secret: String, data_base_url: String) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            api_key,
            api_secret,
            data_base_url: data_base_url.trim_end_matches('/').to_string(),
            circuit_breaker: CircuitBreaker::new("AlpacaMarketData", 3, Duration::from_secs(60)),
        }
    }

    async fn fetch_all_pages(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AlpacaBar>, MarketDataError> {
        let url = format!("{}/v2/stocks/bars", self.data_base_url);
        let start_rfc = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN)).to_rfc3339();
        let end_rfc = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| Utc.from_utc_datetime(&dt).to_rfc3339())
            .unwrap_or_else(|| format!("{}T23:59:59Z", end));

        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = vec![
                ("symbols", ticker.to_string()),
                ("timeframe", "1Day".to_string()),
                ("start", start_rfc.clone()),
                ("end", end_rfc.clone()),
                ("adjustment", "all".to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("page_token", token.clone()));
            }

            let request_url = build_url_with_query(&url, &params);
            debug!("AlpacaMarketDataService: GET {}", request_url);

            let response = authorized(self.client.get(&request_url), &self.api_key, &self.api_secret)
                .send()
                .await
                .map_err(|e| MarketDataError::unavailable(SOURCE_NAME, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(
                    "AlpacaMarketDataService: API error {} for {}: {}",
                    status, ticker, body
                );
                return Err(MarketDataError::unavailable(
                    SOURCE_NAME,
                    format!("HTTP {}: {}", status, error_message(&body)),
                ));
            }

            let page: BarsPage = response.json().await.map_err(|e| {
                MarketDataError::unavailable(SOURCE_NAME, format!("malformed bars response: {}", e))
            })?;

            page_token = collect_page(page, ticker, &mut bars);
            if page_token.is_none() {
                break;
            }
        }

        Ok(bars)
    }
}

/// Appends the ticker's bars from one page and returns the next page token.
fn collect_page(mut page: BarsPage, ticker: &str, into: &mut Vec<AlpacaBar>) -> Option<String> {
    if let Some(bars) = page.bars.remove(ticker) {
        into.extend(bars);
    }
    page.next_page_token.filter(|t| !t.is_empty())
}

fn closes_from_bars(bars: Vec<AlpacaBar>) -> Vec<DailyClose> {
    let mut closes: Vec<DailyClose> = bars
        .into_iter()
        .filter(|b| b.close.is_finite() && b.close > 0.0)
        .map(|b| DailyClose {
            timestamp: b.timestamp,
            adjusted_close: b.close,
        })
        .collect();
    closes.sort_by_key(|c| c.timestamp);
    closes.dedup_by_key(|c| c.timestamp.date_naive());
    closes
}

#[async_trait]
impl MarketDataService for AlpacaMarketDataService {
    async fn get_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, MarketDataError> {
        let bars = self
            .circuit_breaker
            .call(self.fetch_all_pages(ticker, start, end))
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Open { .. } => {
                    MarketDataError::unavailable(SOURCE_NAME, e.to_string())
                }
                CircuitBreakerError::Inner(inner) => inner,
            })?;

        let closes = closes_from_bars(bars);
        if closes.is_empty() {
            return Err(MarketDataError::unavailable(
                SOURCE_NAME,
                format!("no bars for {} between {} and {}", ticker, start, end),
            ));
        }

        info!(
            "AlpacaMarketDataService: {} daily closes for {} ({} to {})",
            closes.len(),
            ticker,
            start,
            end
        );
        Ok(closes)
    }
}
