use crate::domain::errors::MarketDataError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A news headline as delivered by the content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub url: String,
    pub published: DateTime<Utc>,
}

/// Mean sentiment of all headlines published on one date, in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub date: NaiveDate,
    pub score: f64,
}

impl SentimentScore {
    /// Collapses per-headline scores into one mean score per publication date.
    pub fn daily_means(scored: &[(Headline, f64)]) -> Vec<SentimentScore> {
        let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for (headline, score) in scored {
            let entry = buckets
                .entry(headline.published.date_naive())
                .or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }

        buckets
            .into_iter()
            .map(|(date, (sum, count))| SentimentScore {
                date,
                score: (sum / count as f64).clamp(-1.0, 1.0),
            })
            .collect()
    }
}

/// Sentiment channel aligned 1:1 with a price series.
///
/// Dates without a headline carry `fallback`, the mean of the dates that do have one.
/// `filled` reports how many dates received the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentAlignment {
    pub values: Vec<f64>,
    pub fallback: f64,
    pub filled: usize,
}

impl SentimentAlignment {
    /// Aligns daily scores onto `dates`.
    ///
    /// The fallback is computed once from the matched dates before any filling. If no
    /// scored date falls inside the series it is the mean of every daily score supplied.
    pub fn align(
        dates: &[NaiveDate],
        daily: &[SentimentScore],
    ) -> Result<Self, MarketDataError> {
        if daily.is_empty() {
            return Err(MarketDataError::unavailable(
                "news",
                "no sentiment scores to align",
            ));
        }

        let by_date: HashMap<NaiveDate, f64> = daily.iter().map(|s| (s.date, s.score)).collect();

        let matched: Vec<f64> = dates.iter().filter_map(|d| by_date.get(d).copied()).collect();
        let fallback = if matched.is_empty() {
            mean(daily.iter().map(|s| s.score))
        } else {
            mean(matched.iter().copied())
        };

        let mut filled = 0;
        let values = dates
            .iter()
            .map(|d| match by_date.get(d) {
                Some(score) => *score,
                None => {
                    filled += 1;
                    fallback
                }
            })
            .collect();

        Ok(Self {
            values,
            fallback,
            filled,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn headline(d: u32, hour: u32) -> Headline {
        Headline {
            title: format!("headline {}-{}", d, hour),
            url: format!("https://news.example/{}/{}", d, hour),
            published: Utc.with_ymd_and_hms(2024, 3, d, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_daily_means_average_same_day_headlines() {
        let scored = vec![
            (headline(1, 9), 0.6),
            (headline(1, 15), 0.2),
            (headline(2, 10), -0.5),
        ];

        let daily = SentimentScore::daily_means(&scored);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, day(1));
        assert!((daily[0].score - 0.4).abs() < 1e-12);
        assert!((daily[1].score + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_dates_use_mean_of_matched_dates() {
        let dates = vec![day(1), day(2), day(3), day(4), day(5)];
        let daily = vec![
            SentimentScore { date: day(2), score: 0.8 },
            SentimentScore { date: day(4), score: -0.2 },
        ];

        let aligned = SentimentAlignment::align(&dates, &daily).unwrap();
        assert_eq!(aligned.filled, 3);
        assert!((aligned.fallback - 0.3).abs() < 1e-12);
        assert_eq!(aligned.values[1], 0.8);
        assert_eq!(aligned.values[3], -0.2);

        // Several simultaneous gaps: the fallback is still the mean of all assigned values.
        let overall = aligned.values.iter().sum::<f64>() / aligned.values.len() as f64;
        for idx in [0, 2, 4] {
            assert!((aligned.values[idx] - overall).abs() < 1e-12);
        }
    }

    #[test]
    fn test_no_overlap_uses_mean_of_all_scores() {
        let dates = vec![day(10), day(11)];
        let daily = vec![
            SentimentScore { date: day(1), score: 1.0 },
            SentimentScore { date: day(2), score: 0.0 },
        ];

        let aligned = SentimentAlignment::align(&dates, &daily).unwrap();
        assert_eq!(aligned.filled, 2);
        assert_eq!(aligned.values, vec![0.5, 0.5]);
    }

    #[test]
    fn test_no_scores_is_unavailable() {
        let result = SentimentAlignment::align(&[day(1)], &[]);
        assert!(matches!(result, Err(MarketDataError::DataUnavailable { .. })));
    }
}
