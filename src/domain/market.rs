use crate::domain::errors::MarketDataError;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One trading day of the instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub adjusted_close: f64,
    pub periodic_return: f64,
}

impl PricePoint {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Daily close as delivered by a market data source, before returns are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub timestamp: DateTime<Utc>,
    pub adjusted_close: f64,
}

/// Time-ordered, immutable price history for a single ticker.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Derives simple returns from consecutive closes.
    ///
    /// The first close only seeds the first return, so `closes.len() - 1` points come out.
    pub fn from_closes(ticker: &str, mut closes: Vec<DailyClose>) -> Result<Self, MarketDataError> {
        if closes.len() < 2 {
            return Err(MarketDataError::unavailable(
                ticker,
                format!("need at least 2 closes to derive returns, got {}", closes.len()),
            ));
        }

        closes.sort_by_key(|c| c.timestamp);

        let mut points = Vec::with_capacity(closes.len() - 1);
        for pair in closes.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if !(prev.adjusted_close > 0.0) || !curr.adjusted_close.is_finite() {
                return Err(MarketDataError::unavailable(
                    ticker,
                    format!("invalid close {} at {}", prev.adjusted_close, prev.timestamp),
                ));
            }
            points.push(PricePoint {
                timestamp: curr.timestamp,
                adjusted_close: curr.adjusted_close,
                periodic_return: curr.adjusted_close / prev.adjusted_close - 1.0,
            });
        }

        Ok(Self {
            ticker: ticker.to_string(),
            points,
        })
    }

    /// Builds a series from already-derived points (tests, replays).
    pub fn from_points(ticker: &str, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.to_string(),
            points,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.periodic_return).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(PricePoint::date).collect()
    }
}

/// Price history range requested each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    Fixed { start: NaiveDate, end: NaiveDate },
    /// The `days` calendar days up to and including the cycle date.
    Trailing { days: u64 },
}

impl HistoryRange {
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            HistoryRange::Fixed { start, end } => (start, end),
            HistoryRange::Trailing { days } => {
                let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
                (start, today)
            }
        }
    }
}
