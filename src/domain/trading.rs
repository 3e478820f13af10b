use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Order side needed to realise the action, if any.
    pub fn order_side(&self) -> Option<OrderSide> {
        match self {
            Action::Buy => Some(OrderSide::Buy),
            Action::Sell => Some(OrderSide::Sell),
            Action::Hold => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Outcome of the decision policy for one cycle. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub ticker: String,
    pub prediction_probability: f64,
    pub threshold: f64,
}

/// Quantity currently held per ticker, as reported by the brokerage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Holdings {
    positions: HashMap<String, Decimal>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, ticker: &str, quantity: Decimal) -> Self {
        self.insert(ticker, quantity);
        self
    }

    pub fn insert(&mut self, ticker: &str, quantity: Decimal) {
        if quantity.is_zero() {
            self.positions.remove(ticker);
        } else {
            self.positions.insert(ticker.to_string(), quantity);
        }
    }

    pub fn quantity(&self, ticker: &str) -> Decimal {
        self.positions.get(ticker).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn holds(&self, ticker: &str) -> bool {
        self.quantity(ticker) > Decimal::ZERO
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Brokerage API credentials. Loaded from the environment, never from source.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask(&self.api_key))
            .field("api_secret", &"***")
            .finish()
    }
}

fn mask(key: &str) -> String {
    if key.chars().count() <= 4 {
        "***".to_string()
    } else {
        format!("{}***", key.chars().take(4).collect::<String>())
    }
}

/// Authenticated brokerage session, valid for one cycle.
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub client_order_id: String,
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}
