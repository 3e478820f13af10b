// One retrain → decide → execute pass
pub mod cycle;

// Prediction to action
pub mod decision;

// Idempotent order placement
pub mod executor;

// Hyperparameter search
pub mod optimization;

// Cancellable loop over cycles
pub mod scheduler;

// Adapter wiring per mode
pub mod system;
