use chrono::{DateTime, Utc};
use reqwest_middleware::RequestBuilder;
use serde::{Deserialize, Serialize};

pub const API_KEY_HEADER: &str = "APCA-API-KEY-ID";
pub const API_SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

/// Attaches the key pair headers every Alpaca endpoint expects.
pub fn authorized(request: RequestBuilder, api_key: &str, api_secret: &str) -> RequestBuilder {
    request
        .header(API_KEY_HEADER, api_key)
        .header(API_SECRET_HEADER, api_secret)
}

/// Alpaca error bodies are `{"code": ..., "message": ...}`; fall back to the raw text.
pub fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_deserializes_rfc3339_timestamp() {
        let bar: AlpacaBar = serde_json::from_str(
            r#"{"t":"2024-03-01T05:00:00Z","o":1.0,"h":2.0,"l":0.5,"c":1.5,"v":1000}"#,
        )
        .unwrap();
        assert_eq!(bar.close, 1.5);
        assert_eq!(bar.timestamp.date_naive().to_string(), "2024-03-01");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"code":40310000,"message":"insufficient buying power"}"#),
            "insufficient buying power"
        );
        assert_eq!(error_message("  gateway timeout \n"), "gateway timeout");
    }
}
