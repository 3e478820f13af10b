// Hyperparameter search: sampling, scoring and best-trial selection
pub mod metrics;
pub mod search;
pub mod tpe;

pub use search::{
    HyperparameterSearch, SearchReport, SearchSettings, TrialOutcome, TrialResult, train_best,
    validation_scorer,
};
