pub mod mock_news;
pub mod rss;
pub mod sentiment_analyzer;

pub use mock_news::MockNewsService;
pub use rss::RssNewsService;
pub use sentiment_analyzer::SentimentAnalyzer;
