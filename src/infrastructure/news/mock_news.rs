use crate::domain::errors::MarketDataError;
use crate::domain::market::HistoryRange;
use crate::domain::ports::NewsDataService;
use crate::domain::sentiment::Headline;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tracing::info;

const TEMPLATES: &[&str] = &[
    "{t} beats estimates as revenue climbs",
    "Analysts upgrade {t} on strong outlook",
    "{t} shares tumble after guidance cut",
    "{t} faces lawsuit over product recall",
    "{t} announces buyback program",
    "{t} trading volume steady ahead of earnings",
    "{t} downgraded as margins slump",
    "{t} rallies to record high",
];

/// Offline headline source.
///
/// Either replays a fixed list or generates one templated headline every other
/// day over a date range. A range given as `HistoryRange` is resolved on every
/// fetch, so a trailing range follows the calendar like the price feed does.
pub struct MockNewsService {
    feed: Feed,
}

enum Feed {
    Fixed(Vec<Headline>),
    Covering { ticker: String, history: HistoryRange },
}

fn generate(ticker: &str, until: NaiveDate, days: i64) -> Vec<Headline> {
    (0..days)
        .step_by(2)
        .enumerate()
        .filter_map(|(i, back)| {
            let date = until - Duration::days(back);
            let published = Utc.from_utc_datetime(&date.and_hms_opt(13, 0, 0)?);
            let title = TEMPLATES[i % TEMPLATES.len()].replace("{t}", ticker);
            Some(Headline {
                url: format!("https://news.mock/{}/{}", ticker, date),
                title,
                published,
            })
        })
        .collect()
}

impl MockNewsService {
    /// Headlines over the `days` preceding `until`, fixed at construction.
    pub fn new(ticker: &str, until: NaiveDate, days: i64) -> Self {
        Self {
            feed: Feed::Fixed(generate(ticker, until, days)),
        }
    }

    /// Headlines over `history` as resolved on the day of each fetch.
    pub fn covering(ticker: &str, history: HistoryRange) -> Self {
        Self {
            feed: Feed::Covering {
                ticker: ticker.to_string(),
                history,
            },
        }
    }

    pub fn with_headlines(headlines: Vec<Headline>) -> Self {
        Self {
            feed: Feed::Fixed(headlines),
        }
    }

    pub fn headlines_on(&self, today: NaiveDate) -> Vec<Headline> {
        match &self.feed {
            Feed::Fixed(headlines) => headlines.clone(),
            Feed::Covering { ticker, history } => {
                let (start, end) = history.resolve(today);
                generate(ticker, end, (end - start).num_days() + 1)
            }
        }
    }
}

#[async_trait]
impl NewsDataService for MockNewsService {
    async fn fetch_headlines(&self) -> Result<Vec<Headline>, MarketDataError> {
        let headlines = self.headlines_on(Utc::now().date_naive());
        if headlines.is_empty() {
            return Err(MarketDataError::unavailable("mock-news", "no headlines"));
        }
        info!("MockNewsService: serving {} headlines", headlines.len());
        Ok(headlines)
    }
}
