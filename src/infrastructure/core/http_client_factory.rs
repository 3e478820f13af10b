use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_READ_RETRIES: u32 = 3;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Client for idempotent reads (bars, account, positions, news).
    /// Transient failures are retried with exponential backoff.
    pub fn create_client() -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_READ_RETRIES);

        ClientBuilder::new(Self::base_client())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    /// Client for order submission. Never retries: a timed-out POST may still
    /// have reached the broker, and resending it would double the order.
    pub fn create_client_without_retry() -> ClientWithMiddleware {
        ClientBuilder::new(Self::base_client()).build()
    }

    fn base_client() -> Client {
        Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Appends percent-encoded query parameters to `base_url`.
///
/// reqwest-middleware's request builder has no `.query()`, so the string is built here.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base_url.to_string();
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k.as_ref()), encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base_url, separator, query)
}

fn encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
