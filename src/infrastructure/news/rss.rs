use crate::domain::errors::MarketDataError;
use crate::domain::ports::NewsDataService;
use crate::domain::sentiment::Headline;
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use rss::Channel;
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{debug, info, warn};

const SOURCE_NAME: &str = "rss";

/// One-shot headline fetch from a per-ticker RSS feed.
///
/// The feed URL is a template; `{ticker}` is replaced with the traded symbol.
pub struct RssNewsService {
    url: String,
    client: ClientWithMiddleware,
}

impl RssNewsService {
    pub fn new(url_template: &str, ticker: &str) -> Self {
        Self {
            url: url_template.replace("{ticker}", ticker),
            client: HttpClientFactory::create_client(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parses an RSS document into dated headlines.
///
/// Items without a parseable RFC 2822 `pubDate` cannot be placed on a trading
/// day and are dropped. Duplicate links are collapsed.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Headline>, MarketDataError> {
    let channel = Channel::read_from(Cursor::new(bytes))
        .map_err(|e| MarketDataError::unavailable(SOURCE_NAME, format!("invalid feed: {}", e)))?;

    let mut seen = HashSet::new();
    let mut headlines = Vec::new();
    let mut undated = 0usize;

    for item in channel.items() {
        let Some(title) = item.title().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(published) = item
            .pub_date()
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
            .map(|d| d.with_timezone(&Utc))
        else {
            undated += 1;
            continue;
        };

        let url = item
            .link()
            .map(str::to_string)
            .or_else(|| item.guid().map(|g| g.value().to_string()))
            .unwrap_or_default();

        let key = if url.is_empty() { title.to_string() } else { url.clone() };
        if !seen.insert(key) {
            continue;
        }

        headlines.push(Headline {
            title: title.to_string(),
            url,
            published,
        });
    }

    if undated > 0 {
        debug!("RssNewsService: dropped {} undated items", undated);
    }
    Ok(headlines)
}

#[async_trait]
impl NewsDataService for RssNewsService {
    async fn fetch_headlines(&self) -> Result<Vec<Headline>, MarketDataError> {
        debug!("RssNewsService: fetching {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| MarketDataError::unavailable(SOURCE_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("RssNewsService: feed returned {}", status);
            return Err(MarketDataError::unavailable(
                SOURCE_NAME,
                format!("HTTP {} from {}", status, self.url),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MarketDataError::unavailable(SOURCE_NAME, e.to_string()))?;

        let headlines = parse_feed(&bytes)?;
        if headlines.is_empty() {
            return Err(MarketDataError::unavailable(
                SOURCE_NAME,
                format!("no dated headlines in {}", self.url),
            ));
        }

        info!("RssNewsService: {} headlines from feed", headlines.len());
        Ok(headlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Yahoo! Finance: AAPL News</title>
  <link>https://finance.yahoo.com</link>
  <description>Latest news</description>
  <item>
    <title>Apple beats estimates</title>
    <link>https://news.example/a</link>
    <pubDate>Tue, 05 Mar 2024 14:30:00 +0000</pubDate>
  </item>
  <item>
    <title>Apple beats estimates</title>
    <link>https://news.example/a</link>
    <pubDate>Tue, 05 Mar 2024 14:30:00 +0000</pubDate>
  </item>
  <item>
    <title>Undated rumor</title>
    <link>https://news.example/b</link>
  </item>
  <item>
    <title>Late headline</title>
    <link>https://news.example/c</link>
    <pubDate>Tue, 05 Mar 2024 23:30:00 -0500</pubDate>
  </item>
</channel></rss>"#;

    #[test]
    fn test_parse_feed_dedups_and_drops_undated() {
        let headlines = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[0].title, "Apple beats estimates");
        // converted to UTC, so it lands on the next calendar day
        assert_eq!(headlines[1].published.date_naive().to_string(), "2024-03-06");
    }

    #[test]
    fn test_garbage_is_unavailable() {
        assert!(matches!(
            parse_feed(b"not xml at all"),
            Err(MarketDataError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_url_template_substitutes_ticker() {
        let service = RssNewsService::new("https://feeds.example/rss?s={ticker}&lang=en", "MSFT");
        assert_eq!(service.url(), "https://feeds.example/rss?s=MSFT&lang=en");
    }
}
