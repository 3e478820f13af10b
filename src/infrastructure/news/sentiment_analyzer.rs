//! Headline sentiment with VADER plus an equity-news lexicon.
//!
//! VADER's compound score covers general polarity. Market jargon it misses
//! ("downgrade", "beats estimates") is added through a small keyword boost,
//! matched on whole words so "sec" never fires inside "second".

use crate::domain::errors::SentimentError;
use crate::domain::ports::SentimentClassifier;
use vader_sentiment::SentimentIntensityAnalyzer;

const BOOST_WEIGHT: f64 = 0.5;

const BULLISH_TERMS: &[(&str, f64)] = &[
    ("beats estimates", 0.5),
    ("beat estimates", 0.5),
    ("record revenue", 0.4),
    ("record high", 0.4),
    ("all-time high", 0.4),
    ("raises guidance", 0.5),
    ("buyback", 0.3),
    ("upgrade", 0.4),
    ("upgraded", 0.4),
    ("outperform", 0.3),
    ("surge", 0.4),
    ("surges", 0.4),
    ("soar", 0.4),
    ("soars", 0.4),
    ("rally", 0.3),
    ("rallies", 0.3),
    ("bullish", 0.4),
    ("dividend hike", 0.3),
    ("breakthrough", 0.3),
];

const BEARISH_TERMS: &[(&str, f64)] = &[
    ("misses estimates", -0.5),
    ("missed estimates", -0.5),
    ("cuts guidance", -0.5),
    ("lowers guidance", -0.5),
    ("downgrade", -0.4),
    ("downgraded", -0.4),
    ("underperform", -0.3),
    ("plunge", -0.5),
    ("plunges", -0.5),
    ("tumble", -0.4),
    ("tumbles", -0.4),
    ("slump", -0.4),
    ("bearish", -0.4),
    ("lawsuit", -0.4),
    ("probe", -0.3),
    ("recall", -0.3),
    ("layoffs", -0.3),
    ("sec", -0.2),
    ("sell-off", -0.4),
    ("fraud", -0.5),
];

/// VADER-backed headline classifier. Stateless after construction, shareable across threads.
pub struct SentimentAnalyzer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    fn lexicon_boost(text: &str) -> f64 {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .filter(|w| !w.is_empty())
            .collect();

        BULLISH_TERMS
            .iter()
            .chain(BEARISH_TERMS.iter())
            .filter(|(term, _)| {
                if term.contains(' ') {
                    lower.contains(term)
                } else {
                    words.contains(term)
                }
            })
            .map(|(_, weight)| weight)
            .sum()
    }

    /// Score in [-1, 1]: VADER compound plus the weighted lexicon boost.
    pub fn analyze(&self, text: &str) -> Result<f64, SentimentError> {
        if text.trim().is_empty() {
            return Err(SentimentError::Classification {
                reason: "empty headline".to_string(),
            });
        }

        let scores = self.analyzer.polarity_scores(text);
        let compound = scores
            .get("compound")
            .copied()
            .ok_or_else(|| SentimentError::Classification {
                reason: "analyzer returned no compound score".to_string(),
            })?;

        let combined = compound + Self::lexicon_boost(text) * BOOST_WEIGHT;
        if !combined.is_finite() {
            return Err(SentimentError::Classification {
                reason: format!("non-finite score for '{}'", text),
            });
        }
        Ok(combined.clamp(-1.0, 1.0))
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentClassifier for SentimentAnalyzer {
    fn classify(&self, headline: &str) -> Result<f64, SentimentError> {
        self.analyze(headline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_headlines() {
        let analyzer = SentimentAnalyzer::new();
        for headline in [
            "Apple beats estimates as iPhone sales surge",
            "Analysts upgrade Microsoft after record revenue quarter",
            "Nvidia shares soar to all-time high",
        ] {
            let score = analyzer.classify(headline).unwrap();
            assert!(score > 0.0, "expected bullish score for '{}', got {}", headline, score);
        }
    }

    #[test]
    fn test_bearish_headlines() {
        let analyzer = SentimentAnalyzer::new();
        for headline in [
            "Tesla plunges after company cuts guidance",
            "Bank hit with fraud lawsuit, shares tumble",
            "Retailer downgraded as sales slump",
        ] {
            let score = analyzer.classify(headline).unwrap();
            assert!(score < 0.0, "expected bearish score for '{}', got {}", headline, score);
        }
    }

    #[test]
    fn test_scores_are_bounded() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer
            .classify("Amazing fantastic record high surge soars rally bullish upgrade beats estimates")
            .unwrap();
        assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn test_blank_headline_is_a_classification_error() {
        let analyzer = SentimentAnalyzer::new();
        assert!(matches!(
            analyzer.classify("   "),
            Err(SentimentError::Classification { .. })
        ));
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        assert_eq!(SentimentAnalyzer::lexicon_boost("Second quarter results"), 0.0);
        assert_eq!(SentimentAnalyzer::lexicon_boost("SEC opens inquiry"), -0.2);
    }
}
