//! Prediction-to-action policy.
//!
//! The rule is a pure function of (prediction, holding state, threshold):
//! BUY when `prediction > θ` and the ticker is not held, SELL when `prediction <= θ`
//! and it is held, HOLD otherwise. There is no memory between cycles, so a prediction
//! oscillating around θ flips BUY/SELL every cycle. `dead_zone` widens the band in
//! which nothing happens; at its default of 0 the rule is exactly the one above.

use crate::domain::features::FeatureWindow;
use crate::domain::ports::Model;
use crate::domain::trading::{Action, Decision, Holdings};
use tracing::warn;

pub const DEFAULT_PROBABILITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    threshold: f64,
    dead_zone: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PROBABILITY_THRESHOLD)
    }
}

impl DecisionPolicy {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            dead_zone: 0.0,
        }
    }

    pub fn with_dead_zone(mut self, dead_zone: f64) -> Self {
        self.dead_zone = dead_zone.max(0.0);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn action(&self, prediction: f64, held: bool) -> Action {
        if !prediction.is_finite() {
            return Action::Hold;
        }

        if prediction > self.threshold + self.dead_zone && !held {
            Action::Buy
        } else if prediction <= self.threshold - self.dead_zone && held {
            Action::Sell
        } else {
            Action::Hold
        }
    }

    pub fn decide(
        &self,
        model: &dyn Model,
        latest: &FeatureWindow,
        holdings: &Holdings,
        ticker: &str,
    ) -> Decision {
        let prediction = model.predict(latest);
        if !prediction.is_finite() {
            warn!(
                "DecisionPolicy: non-finite prediction {} for {}, holding",
                prediction, ticker
            );
        }

        Decision {
            action: self.action(prediction, holdings.holds(ticker)),
            ticker: ticker.to_string(),
            prediction_probability: prediction,
            threshold: self.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FixedModel(f64);

    impl Model for FixedModel {
        fn predict(&self, _window: &FeatureWindow) -> f64 {
            self.0
        }
    }

    fn window() -> FeatureWindow {
        FeatureWindow {
            returns: vec![0.01; 3],
            sentiment: vec![0.0; 3],
        }
    }

    #[test]
    fn test_buy_when_above_threshold_and_not_held() {
        let policy = DecisionPolicy::new(0.5);
        let decision = policy.decide(&FixedModel(0.7), &window(), &Holdings::new(), "AAPL");

        assert_eq!(decision.action, Action::Buy);
        assert_eq!(decision.prediction_probability, 0.7);
        assert_eq!(decision.threshold, 0.5);
        assert_eq!(decision.ticker, "AAPL");
    }

    #[test]
    fn test_sell_when_below_threshold_and_held() {
        let policy = DecisionPolicy::new(0.5);
        let holdings = Holdings::new().with_position("AAPL", dec!(1));
        let decision = policy.decide(&FixedModel(0.3), &window(), &holdings, "AAPL");

        assert_eq!(decision.action, Action::Sell);
    }

    #[test]
    fn test_exact_threshold_never_buys() {
        let policy = DecisionPolicy::new(0.5);
        assert_eq!(policy.action(0.5, false), Action::Hold);
        // <= side: exactly θ while held sells
        assert_eq!(policy.action(0.5, true), Action::Sell);
    }

    #[test]
    fn test_never_buys_when_held_or_sells_when_flat() {
        let policy = DecisionPolicy::new(0.5);
        for i in 0..=100 {
            let p = i as f64 / 100.0;
            assert_ne!(policy.action(p, true), Action::Buy);
            assert_ne!(policy.action(p, false), Action::Sell);
        }
    }

    #[test]
    fn test_action_is_pure() {
        let policy = DecisionPolicy::new(0.55);
        for i in 0..=20 {
            let p = i as f64 / 20.0;
            for held in [true, false] {
                assert_eq!(policy.action(p, held), policy.action(p, held));
            }
        }
    }

    #[test]
    fn test_oscillation_around_threshold_flips_every_cycle() {
        let policy = DecisionPolicy::new(0.5);
        let mut held = false;
        let mut actions = Vec::new();
        for p in [0.51, 0.49, 0.51, 0.49] {
            let action = policy.action(p, held);
            held = match action {
                Action::Buy => true,
                Action::Sell => false,
                Action::Hold => held,
            };
            actions.push(action);
        }
        assert_eq!(
            actions,
            vec![Action::Buy, Action::Sell, Action::Buy, Action::Sell]
        );
    }

    #[test]
    fn test_dead_zone_suppresses_oscillation() {
        let policy = DecisionPolicy::new(0.5).with_dead_zone(0.05);
        assert_eq!(policy.action(0.51, false), Action::Hold);
        assert_eq!(policy.action(0.49, true), Action::Hold);
        assert_eq!(policy.action(0.56, false), Action::Buy);
        assert_eq!(policy.action(0.44, true), Action::Sell);
    }

    #[test]
    fn test_nan_prediction_holds() {
        let policy = DecisionPolicy::new(0.5);
        assert_eq!(policy.action(f64::NAN, true), Action::Hold);
        assert_eq!(policy.action(f64::NAN, false), Action::Hold);
    }
}
