use super::metrics;
use super::tpe::TpeSampler;
use crate::domain::errors::SearchError;
use crate::domain::features::Dataset;
use crate::domain::ports::{Model, Trainer};
use crate::domain::search_space::{Configuration, SearchSpace};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_TRIAL_BUDGET: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TrialOutcome {
    Scored(f64),
    /// Validation labels were single-class; the trial carries no score.
    Degenerate,
    Failed(String),
}

/// Single search trial
#[derive(Debug, Clone, Serialize)]
pub struct TrialResult {
    pub index: usize,
    pub configuration: Configuration,
    pub outcome: TrialOutcome,
}

impl TrialResult {
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            TrialOutcome::Scored(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub best_configuration: Configuration,
    pub best_score: f64,
    pub best_trial: usize,
    pub trials: Vec<TrialResult>,
}

impl SearchReport {
    pub fn degenerate_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.outcome == TrialOutcome::Degenerate)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| matches!(t.outcome, TrialOutcome::Failed(_)))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub trial_budget: usize,
    pub seed: u64,
    /// Trials evaluated concurrently per batch. 1 means strictly sequential.
    pub parallelism: usize,
    pub sampler: TpeSampler,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            trial_budget: DEFAULT_TRIAL_BUDGET,
            seed: 42,
            parallelism: 1,
            sampler: TpeSampler::default(),
        }
    }
}

/// Black-box hyperparameter search over a fixed trial budget.
pub struct HyperparameterSearch {
    settings: SearchSettings,
}

impl HyperparameterSearch {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }

    /// Runs the trial budget and returns the maximum-score configuration.
    ///
    /// Suggestions are drawn sequentially from one seeded RNG; a batch of
    /// `parallelism` suggestions only sees history up to the previous batch, and
    /// results are merged back in trial order. The winner therefore depends on the
    /// seed and batch size, never on thread scheduling. Ties go to the earlier trial.
    pub fn run<F>(&self, space: &SearchSpace, score: F) -> Result<SearchReport, SearchError>
    where
        F: Fn(&Configuration) -> Result<f64, SearchError> + Sync,
    {
        if space.is_empty() {
            return Err(SearchError::EmptySearchSpace);
        }

        let budget = self.settings.trial_budget;
        let batch_size = self.settings.parallelism.max(1);
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let mut trials: Vec<TrialResult> = Vec::with_capacity(budget);

        while trials.len() < budget {
            let batch_len = batch_size.min(budget - trials.len());
            let candidates: Vec<Configuration> = (0..batch_len)
                .map(|_| self.settings.sampler.suggest(space, &trials, &mut rng))
                .collect();

            let outcomes: Vec<TrialOutcome> = if batch_len == 1 {
                candidates.iter().map(|c| run_trial(&score, c)).collect()
            } else {
                candidates.par_iter().map(|c| run_trial(&score, c)).collect()
            };

            for (configuration, outcome) in candidates.into_iter().zip(outcomes) {
                let index = trials.len();
                match &outcome {
                    TrialOutcome::Scored(s) => {
                        debug!("Search: trial {} scored {:.4} with {}", index, s, configuration)
                    }
                    TrialOutcome::Degenerate => {
                        debug!("Search: trial {} degenerate, excluded", index)
                    }
                    TrialOutcome::Failed(reason) => {
                        warn!("Search: trial {} failed: {}", index, reason)
                    }
                }
                trials.push(TrialResult {
                    index,
                    configuration,
                    outcome,
                });
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for trial in &trials {
            if let Some(score) = trial.score() {
                if best.is_none_or(|(_, best_score)| score > best_score) {
                    best = Some((trial.index, score));
                }
            }
        }

        let (best_trial, best_score) =
            best.ok_or(SearchError::AllTrialsDegenerate { trials: trials.len() })?;
        let best_configuration = trials[best_trial].configuration.clone();

        let report = SearchReport {
            best_configuration,
            best_score,
            best_trial,
            trials,
        };

        info!(
            "Search: best trial {} of {} scored {:.4} ({} degenerate, {} failed) with {}",
            report.best_trial,
            report.trials.len(),
            report.best_score,
            report.degenerate_count(),
            report.failed_count(),
            report.best_configuration
        );

        Ok(report)
    }
}

fn run_trial<F>(score: &F, configuration: &Configuration) -> TrialOutcome
where
    F: Fn(&Configuration) -> Result<f64, SearchError>,
{
    match score(configuration) {
        Ok(s) if s.is_finite() => TrialOutcome::Scored(s),
        Ok(s) => TrialOutcome::Failed(format!("non-finite score {}", s)),
        Err(SearchError::DegenerateLabels { .. }) => TrialOutcome::Degenerate,
        Err(e) => TrialOutcome::Failed(e.to_string()),
    }
}

/// Score function for one engine: fit on the training split, ROC-AUC on validation.
///
/// Both splits are shared read-only; every call builds its own model.
pub fn validation_scorer(
    trainer: Arc<dyn Trainer>,
    train: Arc<Dataset>,
    validation: Arc<Dataset>,
    epochs: usize,
) -> impl Fn(&Configuration) -> Result<f64, SearchError> + Sync {
    move |config: &Configuration| {
        let model = trainer.train(config, &train, epochs)?;
        metrics::evaluate(model.as_ref(), &validation)
    }
}

/// Retrains the winning configuration on the full dataset to get the deployable model.
pub fn train_best(
    trainer: &dyn Trainer,
    report: &SearchReport,
    dataset: &Dataset,
    epochs: usize,
) -> Result<Box<dyn Model>, SearchError> {
    info!(
        "Search: training {} with best configuration {} on {} windows",
        trainer.name(),
        report.best_configuration,
        dataset.len()
    );
    trainer.train(&report.best_configuration, dataset, epochs)
}
