//! Hyperparameter search space definition.
//!
//! Parameters are kept in `BTreeMap`s so iteration order is by name; the sampler draws
//! from its RNG in that order, which keeps a seeded search reproducible.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared numeric range of a single hyperparameter (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamRange {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

impl ParamRange {
    pub fn int(min: i64, max: i64) -> Self {
        ParamRange::Int {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn float(min: f64, max: f64) -> Self {
        ParamRange::Float {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            ParamRange::Int { min, max } => (min as f64, max as f64),
            ParamRange::Float { min, max } => (min, max),
        }
    }

    pub fn width(&self) -> f64 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Uniformly sample a value from the range.
    pub fn sample(&self, rng: &mut impl Rng) -> ParamValue {
        match *self {
            ParamRange::Int { min, max } => ParamValue::Int(rng.random_range(min..=max)),
            ParamRange::Float { min, max } => {
                if max > min {
                    ParamValue::Float(rng.random_range(min..max))
                } else {
                    ParamValue::Float(min)
                }
            }
        }
    }

    /// Clip a continuous candidate into the range, rounding for integer parameters.
    pub fn clip(&self, candidate: f64) -> ParamValue {
        match *self {
            ParamRange::Int { min, max } => {
                ParamValue::Int((candidate.round() as i64).clamp(min, max))
            }
            ParamRange::Float { min, max } => ParamValue::Float(candidate.clamp(min, max)),
        }
    }

    pub fn contains(&self, value: &ParamValue) -> bool {
        match (*self, *value) {
            (ParamRange::Int { min, max }, ParamValue::Int(v)) => (min..=max).contains(&v),
            (ParamRange::Float { min, max }, ParamValue::Float(v)) => v >= min && v <= max,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{:.5}", v),
        }
    }
}

/// One candidate assignment of every parameter in a search space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    values: BTreeMap<String, ParamValue>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    pub fn float_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).map(|v| v.as_f64()).unwrap_or(default)
    }

    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        match self.get(name) {
            Some(ParamValue::Int(v)) => v,
            Some(ParamValue::Float(v)) => v.round() as i64,
            None => default,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    params: BTreeMap<String, ParamRange>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_param(mut self, name: &str, range: ParamRange) -> Self {
        self.params.insert(name.to_string(), range);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamRange)> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Uniform random configuration.
    pub fn sample(&self, rng: &mut impl Rng) -> Configuration {
        let mut config = Configuration::new();
        for (name, range) in &self.params {
            config.insert(name, range.sample(rng));
        }
        config
    }

    pub fn contains(&self, config: &Configuration) -> bool {
        self.params.iter().all(|(name, range)| {
            config
                .get(name)
                .map(|value| range.contains(&value))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn space() -> SearchSpace {
        SearchSpace::new()
            .add_param("rounds", ParamRange::int(10, 20))
            .add_param("learning_rate", ParamRange::float(0.01, 0.3))
    }

    #[test]
    fn test_samples_stay_in_range() {
        let space = space();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let config = space.sample(&mut rng);
            assert!(space.contains(&config), "{} out of range", config);
        }
    }

    #[test]
    fn test_same_seed_same_samples() {
        let space = space();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            assert_eq!(space.sample(&mut a), space.sample(&mut b));
        }
    }

    #[test]
    fn test_clip_rounds_integers() {
        let range = ParamRange::int(1, 5);
        assert_eq!(range.clip(3.6), ParamValue::Int(4));
        assert_eq!(range.clip(-2.0), ParamValue::Int(1));
        assert_eq!(range.clip(42.0), ParamValue::Int(5));

        let range = ParamRange::float(0.0, 1.0);
        assert_eq!(range.clip(1.5), ParamValue::Float(1.0));
    }

    #[test]
    fn test_degenerate_float_range_samples_its_bound() {
        let range = ParamRange::float(0.5, 0.5);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(range.sample(&mut rng), ParamValue::Float(0.5));
    }

    #[test]
    fn test_configuration_display_is_ordered() {
        let config = Configuration::new()
            .with("b", ParamValue::Int(2))
            .with("a", ParamValue::Float(0.5));
        assert_eq!(config.to_string(), "{a=0.50000, b=2}");
    }
}
