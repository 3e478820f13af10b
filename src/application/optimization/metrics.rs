use crate::domain::errors::SearchError;
use crate::domain::features::Dataset;
use crate::domain::ports::Model;

/// Area under the ROC curve over every threshold.
///
/// Computed as the Mann-Whitney statistic with average ranks for tied scores, which
/// equals the trapezoidal area under the full ROC curve. Single-class labels make the
/// curve undefined and return `DegenerateLabels`.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Result<f64, SearchError> {
    if labels.len() != scores.len() {
        return Err(SearchError::Training {
            reason: format!(
                "{} labels but {} scores",
                labels.len(),
                scores.len()
            ),
        });
    }

    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(SearchError::DegenerateLabels {
            class: if positives == 0 { 0 } else { 1 },
            count: labels.len(),
        });
    }

    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(SearchError::Training {
            reason: format!("model produced non-finite score {}", bad),
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their average
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                positive_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = positives as f64;
    let n_neg = negatives as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Scores a fitted model on a held-out dataset.
pub fn evaluate(model: &dyn Model, validation: &Dataset) -> Result<f64, SearchError> {
    let scores: Vec<f64> = validation
        .windows()
        .iter()
        .map(|w| model.predict(&w.window))
        .collect();
    roc_auc(&validation.labels(), &scores)
}
