//! Logistic regression over the flattened (returns, sentiment) window.
//!
//! Inputs are standardised with statistics from the training set only and the
//! weights are fitted with mini-batch gradient descent in chronological order, so
//! the same configuration and dataset always give the same model.

use crate::domain::errors::SearchError;
use crate::domain::features::{Dataset, FeatureWindow};
use crate::domain::ports::{Model, Trainer};
use crate::domain::search_space::{Configuration, ParamRange, SearchSpace};
use ndarray::{Array1, Array2, Axis, s};

const MIN_STD: f64 = 1e-8;

pub struct LogisticModel {
    weights: Array1<f64>,
    bias: f64,
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl LogisticModel {
    fn standardize(&self, flat: Vec<f64>) -> Option<Array1<f64>> {
        if flat.len() != self.weights.len() {
            return None;
        }
        Some((Array1::from(flat) - &self.mean) / &self.std)
    }
}

impl Model for LogisticModel {
    /// Probability of an up move. A window of the wrong length yields NaN.
    fn predict(&self, window: &FeatureWindow) -> f64 {
        match self.standardize(window.flatten()) {
            Some(x) => sigmoid(x.dot(&self.weights) + self.bias),
            None => f64::NAN,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogisticTrainer;

impl LogisticTrainer {
    pub fn new() -> Self {
        Self
    }
}

fn design_matrix(dataset: &Dataset) -> Result<(Array2<f64>, Array1<f64>), SearchError> {
    let windows = dataset.windows();
    let Some(first) = windows.first() else {
        return Err(SearchError::Training {
            reason: "empty training set".to_string(),
        });
    };
    let width = first.window.len() * 2;

    let mut flat = Vec::with_capacity(windows.len() * width);
    for labeled in windows {
        let row = labeled.window.flatten();
        if row.len() != width {
            return Err(SearchError::Training {
                reason: format!("window width {} differs from {}", row.len(), width),
            });
        }
        flat.extend(row);
    }

    let x = Array2::from_shape_vec((windows.len(), width), flat).map_err(|e| {
        SearchError::Training {
            reason: e.to_string(),
        }
    })?;
    let y = Array1::from_iter(windows.iter().map(|w| f64::from(w.label)));
    Ok((x, y))
}

impl Trainer for LogisticTrainer {
    fn name(&self) -> &str {
        "logistic"
    }

    fn search_space(&self) -> SearchSpace {
        SearchSpace::new()
            .add_param("learning_rate", ParamRange::float(0.001, 0.5))
            .add_param("l2", ParamRange::float(0.0, 0.1))
            .add_param("batch_size", ParamRange::int(8, 64))
    }

    fn train(
        &self,
        config: &Configuration,
        dataset: &Dataset,
        epochs: usize,
    ) -> Result<Box<dyn Model>, SearchError> {
        let learning_rate = config.float_or("learning_rate", 0.05);
        let l2 = config.float_or("l2", 0.0);
        let batch_size = config.int_or("batch_size", 32).max(1) as usize;

        let (raw, y) = design_matrix(dataset)?;
        let n = raw.nrows();

        let mean = raw.mean_axis(Axis(0)).ok_or_else(|| SearchError::Training {
            reason: "cannot standardise an empty matrix".to_string(),
        })?;
        let std = raw.std_axis(Axis(0), 0.0).mapv(|s| s.max(MIN_STD));
        let x = (&raw - &mean) / &std;

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..epochs.max(1) {
            let mut start = 0;
            while start < n {
                let end = (start + batch_size).min(n);
                let xb = x.slice(s![start..end, ..]);
                let yb = y.slice(s![start..end]);
                let m = (end - start) as f64;

                let predictions = (xb.dot(&weights) + bias).mapv(sigmoid);
                let errors = &predictions - &yb;

                let grad_w = xb.t().dot(&errors) / m + &weights * l2;
                let grad_b = errors.sum() / m;

                weights = weights - grad_w * learning_rate;
                bias -= learning_rate * grad_b;
                start = end;
            }
        }

        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(SearchError::Training {
                reason: format!("logistic regression diverged with {}", config),
            });
        }

        Ok(Box::new(LogisticModel {
            weights,
            bias,
            mean,
            std,
        }))
    }
}
