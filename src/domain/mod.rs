// Price history and returns
pub mod market;

// Headline sentiment and date alignment
pub mod sentiment;

// Sliding-window datasets
pub mod features;

// Hyperparameter search space
pub mod search_space;

// Orders, holdings and decisions
pub mod trading;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
