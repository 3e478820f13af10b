//! Tree-structured Parzen Estimator sampler.
//!
//! Models the probability of being in "good" vs "bad" parameter regions using kernel
//! density estimates over the trial history, and proposes the candidate maximising
//! l(x)/g(x). Until `n_startup_trials` trials have been scored it samples uniformly.

use super::search::TrialResult;
use crate::domain::search_space::{Configuration, ParamRange, ParamValue, SearchSpace};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

#[derive(Debug, Clone)]
pub struct TpeSampler {
    pub n_startup_trials: usize,
    /// Fraction of the scored history treated as "good".
    pub gamma: f64,
    /// Candidates drawn per parameter per suggestion.
    pub n_candidates: usize,
    /// Kernel width as a fraction of each parameter's range.
    pub bandwidth: f64,
}

impl Default for TpeSampler {
    fn default() -> Self {
        Self {
            n_startup_trials: 10,
            gamma: 0.2,
            n_candidates: 24,
            bandwidth: 0.1,
        }
    }
}

impl TpeSampler {
    /// Suggests the next configuration given every trial evaluated so far.
    pub fn suggest(
        &self,
        space: &SearchSpace,
        history: &[TrialResult],
        rng: &mut impl Rng,
    ) -> Configuration {
        let mut scored: Vec<(&Configuration, f64)> = history
            .iter()
            .filter_map(|t| t.score().map(|s| (&t.configuration, s)))
            .collect();

        if scored.len() < self.n_startup_trials.max(2) {
            return space.sample(rng);
        }

        // Stable sort keeps earlier trials first among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let n_good = ((scored.len() as f64) * self.gamma).ceil().max(1.0) as usize;
        let (good, bad) = scored.split_at(n_good.min(scored.len()));

        let mut suggested = Configuration::new();
        for (name, range) in space.iter() {
            let good_vals = values_of(name, good);
            let bad_vals = values_of(name, bad);
            let value = self.sample_numerical(range, &good_vals, &bad_vals, rng);
            suggested.insert(name, value);
        }
        suggested
    }

    fn sample_numerical(
        &self,
        range: &ParamRange,
        good_vals: &[f64],
        bad_vals: &[f64],
        rng: &mut impl Rng,
    ) -> ParamValue {
        let sigma = self.bandwidth * range.width();
        if good_vals.is_empty() || sigma <= 0.0 {
            return range.sample(rng);
        }

        let mut best_val = good_vals[0];
        let mut best_ratio = f64::NEG_INFINITY;

        for _ in 0..self.n_candidates {
            let base_val = good_vals[rng.random_range(0..good_vals.len())];
            let candidate = match Normal::new(base_val, sigma) {
                Ok(normal) => normal.sample(rng),
                Err(_) => base_val,
            };
            let (min, max) = range.bounds();
            let candidate = candidate.clamp(min, max);

            let lx = mixture_density(candidate, good_vals, sigma);
            let gx = mixture_density(candidate, bad_vals, sigma);

            let ratio = lx / (gx + 1e-10);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_val = candidate;
            }
        }

        range.clip(best_val)
    }
}

fn values_of(name: &str, trials: &[(&Configuration, f64)]) -> Vec<f64> {
    trials
        .iter()
        .filter_map(|(config, _)| config.get(name))
        .map(|v| v.as_f64())
        .collect()
}

fn mixture_density(x: f64, centres: &[f64], sigma: f64) -> f64 {
    if centres.is_empty() {
        return 0.0;
    }
    centres.iter().map(|&c| gaussian_pdf(x, c, sigma)).sum::<f64>() / centres.len() as f64
}

fn gaussian_pdf(x: f64, mean: f64, sigma: f64) -> f64 {
    let exponent = -0.5 * ((x - mean) / sigma).powi(2);
    (1.0 / (sigma * (2.0 * PI).sqrt())) * exponent.exp()
}
