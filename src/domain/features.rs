//! Sliding-window feature construction.
//!
//! Returns and aligned sentiment are fused into fixed-length two-channel windows. Window
//! `i` covers observations `[i, i + L)` and is labelled `1` when the return at `i + L`
//! is positive, so a series of `N` observations yields exactly `N - L` labelled windows.
//! The unlabelled window over the final `L` observations is what the model scores when
//! deciding.

use crate::domain::errors::MarketDataError;
use crate::domain::market::PriceSeries;
use crate::domain::sentiment::SentimentAlignment;
use std::sync::Arc;

pub const DEFAULT_WINDOW_LENGTH: usize = 50;

/// `L` consecutive (return, sentiment) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    pub returns: Vec<f64>,
    pub sentiment: Vec<f64>,
}

impl FeatureWindow {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Both channels concatenated: returns first, then sentiment.
    pub fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.returns.len() * 2);
        flat.extend_from_slice(&self.returns);
        flat.extend_from_slice(&self.sentiment);
        flat
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledWindow {
    pub window: FeatureWindow,
    pub label: u8,
}

/// Immutable set of labelled windows, in chronological order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    windows: Vec<LabeledWindow>,
}

impl Dataset {
    pub fn new(windows: Vec<LabeledWindow>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[LabeledWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn labels(&self) -> Vec<u8> {
        self.windows.iter().map(|w| w.label).collect()
    }

    /// Count of (class 0, class 1) labels.
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.windows.iter().filter(|w| w.label == 1).count();
        (self.windows.len() - positives, positives)
    }

    /// Chronological split: the last `validation_ratio` share becomes the validation set.
    /// No shuffling, so validation windows are strictly later than training windows.
    pub fn split(&self, validation_ratio: f64) -> Result<(Dataset, Dataset), MarketDataError> {
        let total = self.windows.len();
        let validation_len = ((total as f64) * validation_ratio).round() as usize;
        let train_len = total.saturating_sub(validation_len);

        if validation_len == 0 || train_len == 0 {
            return Err(MarketDataError::InsufficientSplit {
                total,
                training: train_len,
                validation: validation_len,
            });
        }

        let (train, validation) = self.windows.split_at(train_len);
        Ok((Dataset::new(train.to_vec()), Dataset::new(validation.to_vec())))
    }
}

/// Everything one cycle needs from the feature stage.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub dataset: Arc<Dataset>,
    pub latest: FeatureWindow,
    pub sentiment_filled: usize,
    pub sentiment_fallback: f64,
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    window_length: usize,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_LENGTH)
    }
}

impl FeatureBuilder {
    pub fn new(window_length: usize) -> Self {
        Self { window_length }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn build(
        &self,
        series: &PriceSeries,
        sentiment: &SentimentAlignment,
    ) -> Result<FeatureSet, MarketDataError> {
        if sentiment.values.len() != series.len() {
            return Err(MarketDataError::unavailable(
                "sentiment",
                format!(
                    "sentiment channel has {} values for {} price points",
                    sentiment.values.len(),
                    series.len()
                ),
            ));
        }

        let returns = series.returns();
        let dataset = self.build_windows(&returns, &sentiment.values)?;
        let latest = self.latest_window(&returns, &sentiment.values)?;

        Ok(FeatureSet {
            dataset: Arc::new(dataset),
            latest,
            sentiment_filled: sentiment.filled,
            sentiment_fallback: sentiment.fallback,
        })
    }

    /// Labelled windows over aligned channels. Fails when `N <= L`.
    pub fn build_windows(
        &self,
        returns: &[f64],
        sentiment: &[f64],
    ) -> Result<Dataset, MarketDataError> {
        let n = returns.len().min(sentiment.len());
        let l = self.window_length;
        if n <= l {
            return Err(MarketDataError::InsufficientData {
                available: n,
                window: l,
            });
        }

        let windows = (0..n - l)
            .map(|i| LabeledWindow {
                window: FeatureWindow {
                    returns: returns[i..i + l].to_vec(),
                    sentiment: sentiment[i..i + l].to_vec(),
                },
                label: u8::from(returns[i + l] > 0.0),
            })
            .collect();

        Ok(Dataset::new(windows))
    }

    /// Window over the final `L` observations; it has no label yet.
    pub fn latest_window(
        &self,
        returns: &[f64],
        sentiment: &[f64],
    ) -> Result<FeatureWindow, MarketDataError> {
        let n = returns.len().min(sentiment.len());
        let l = self.window_length;
        if n < l {
            return Err(MarketDataError::InsufficientData {
                available: n,
                window: l,
            });
        }

        Ok(FeatureWindow {
            returns: returns[n - l..n].to_vec(),
            sentiment: sentiment[n - l..n].to_vec(),
        })
    }
}
