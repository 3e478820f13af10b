//! Gradient-boosted regression trees on window summary statistics.
//!
//! Each window is reduced to a handful of summary features (momentum, volatility,
//! sentiment level and trend). Every round fits a smartcore regression tree to the
//! log-loss residuals of the current ensemble; the probability of an up move is the
//! sigmoid of the shrunken sum of tree outputs.

use crate::domain::errors::SearchError;
use crate::domain::features::{Dataset, FeatureWindow};
use crate::domain::ports::{Model, Trainer};
use crate::domain::search_space::{Configuration, ParamRange, SearchSpace};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

const RECENT: usize = 5;
const RATE_CLAMP: f64 = 1e-3;

fn summarize(window: &FeatureWindow) -> Vec<f64> {
    let returns = &window.returns;
    let sentiment = &window.sentiment;
    let recent = |v: &[f64]| -> f64 {
        let tail = &v[v.len().saturating_sub(RECENT)..];
        mean(tail)
    };

    let mean_return = mean(returns);
    let volatility = (returns
        .iter()
        .map(|r| (r - mean_return).powi(2))
        .sum::<f64>()
        / returns.len().max(1) as f64)
        .sqrt();
    let cumulative = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;

    vec![
        mean_return,
        volatility,
        cumulative,
        returns.last().copied().unwrap_or(0.0),
        recent(returns),
        mean(sentiment),
        sentiment.last().copied().unwrap_or(0.0),
        recent(sentiment) - mean(sentiment),
    ]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub struct BoostedModel {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
    window_length: usize,
}

impl BoostedModel {
    fn raw_score(&self, row: Vec<f64>) -> Option<f64> {
        let x = DenseMatrix::from_2d_vec(&vec![row]).ok()?;
        let mut score = self.base_score;
        for tree in &self.trees {
            score += self.learning_rate * tree.predict(&x).ok()?.first()?;
        }
        Some(score)
    }
}

impl Model for BoostedModel {
    fn predict(&self, window: &FeatureWindow) -> f64 {
        if window.len() != self.window_length {
            return f64::NAN;
        }
        self.raw_score(summarize(window))
            .map(sigmoid)
            .unwrap_or(f64::NAN)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoostedTrainer;

impl BoostedTrainer {
    pub fn new() -> Self {
        Self
    }
}

fn training_error(reason: impl std::fmt::Display) -> SearchError {
    SearchError::Training {
        reason: reason.to_string(),
    }
}

impl Trainer for BoostedTrainer {
    fn name(&self) -> &str {
        "boosted"
    }

    fn search_space(&self) -> SearchSpace {
        SearchSpace::new()
            .add_param("n_trees", ParamRange::int(10, 120))
            .add_param("max_depth", ParamRange::int(1, 4))
            .add_param("learning_rate", ParamRange::float(0.01, 0.3))
            .add_param("min_samples_leaf", ParamRange::int(2, 20))
    }

    /// `epochs` does not apply; the number of trees is itself searched.
    fn train(
        &self,
        config: &Configuration,
        dataset: &Dataset,
        _epochs: usize,
    ) -> Result<Box<dyn Model>, SearchError> {
        let n_trees = config.int_or("n_trees", 50).max(1) as usize;
        let max_depth = config.int_or("max_depth", 2).clamp(1, 16) as u16;
        let learning_rate = config.float_or("learning_rate", 0.1);
        let min_samples_leaf = config.int_or("min_samples_leaf", 5).max(1) as usize;

        let Some(first) = dataset.windows().first() else {
            return Err(training_error("empty training set"));
        };
        let window_length = first.window.len();

        let rows: Vec<Vec<f64>> = dataset
            .windows()
            .iter()
            .map(|w| summarize(&w.window))
            .collect();
        let x = DenseMatrix::from_2d_vec(&rows)
            .map_err(|e| training_error(format!("feature matrix: {}", e)))?;
        let labels: Vec<f64> = dataset.labels().into_iter().map(f64::from).collect();

        let positive_rate = mean(&labels).clamp(RATE_CLAMP, 1.0 - RATE_CLAMP);
        let base_score = (positive_rate / (1.0 - positive_rate)).ln();

        let params = DecisionTreeRegressorParameters::default()
            .with_max_depth(max_depth)
            .with_min_samples_leaf(min_samples_leaf)
            .with_min_samples_split(2 * min_samples_leaf);

        let mut raw = vec![base_score; rows.len()];
        let mut trees = Vec::with_capacity(n_trees);

        for _ in 0..n_trees {
            let residuals: Vec<f64> = labels
                .iter()
                .zip(&raw)
                .map(|(y, z)| y - sigmoid(*z))
                .collect();

            let tree = Tree::fit(&x, &residuals, params.clone())
                .map_err(|e| training_error(format!("tree fit with {}: {}", config, e)))?;
            let step = tree
                .predict(&x)
                .map_err(|e| training_error(format!("tree predict: {}", e)))?;

            for (score, delta) in raw.iter_mut().zip(&step) {
                *score += learning_rate * delta;
            }
            trees.push(tree);
        }

        if raw.iter().any(|z| !z.is_finite()) {
            return Err(training_error(format!("boosting diverged with {}", config)));
        }

        Ok(Box::new(BoostedModel {
            base_score,
            learning_rate,
            trees,
            window_length,
        }))
    }
}
