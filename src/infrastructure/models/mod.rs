pub mod boosted;
pub mod logistic;

pub use boosted::BoostedTrainer;
pub use logistic::LogisticTrainer;

use crate::config::ModelEngine;
use crate::domain::ports::Trainer;
use std::sync::Arc;

/// Trainer for the configured prediction engine.
pub fn trainer_for(engine: ModelEngine) -> Arc<dyn Trainer> {
    match engine {
        ModelEngine::Logistic => Arc::new(LogisticTrainer::new()),
        ModelEngine::Boosted => Arc::new(BoostedTrainer::new()),
    }
}
