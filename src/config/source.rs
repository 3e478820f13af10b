//! Key lookup shared by every sub-config.
//!
//! Process environment variables win; values from an optional TOML file fill the
//! gaps. File keys are upper-cased so `trial_budget = 20` answers `TRIAL_BUDGET`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    file: HashMap<String, String>,
    use_process_env: bool,
}

impl ConfigSource {
    /// Environment only.
    pub fn process() -> Self {
        Self {
            file: HashMap::new(),
            use_process_env: true,
        }
    }

    /// Environment with a TOML file underneath it.
    pub fn with_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let mut source = Self::from_toml(&content)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        source.use_process_env = true;
        Ok(source)
    }

    /// Parses a flat TOML document. Nested tables are flattened one level deep,
    /// so `[search] seed = 7` and `seed = 7` both answer `SEED`.
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut file = HashMap::new();
        for (key, value) in table {
            match value {
                toml::Value::Table(inner) => {
                    for (inner_key, inner_value) in inner {
                        file.insert(inner_key.to_uppercase(), scalar_to_string(&inner_value)?);
                    }
                }
                other => {
                    file.insert(key.to_uppercase(), scalar_to_string(&other)?);
                }
            }
        }
        Ok(Self {
            file,
            use_process_env: false,
        })
    }

    /// Fixed key/value pairs, no process environment. Used by tests.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            file: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            use_process_env: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let from_env = if self.use_process_env {
            env::var(key).ok()
        } else {
            None
        };
        from_env
            .or_else(|| self.file.get(key).cloned())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse::<T>()
                .context(format!("Failed to parse {}='{}'", key, raw)),
            None => Ok(default),
        }
    }

    pub fn parse_opt<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .context(format!("Failed to parse {}='{}'", key, raw))
            })
            .transpose()
    }
}

fn scalar_to_string(value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        other => anyhow::bail!("unsupported config value: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_keys_are_upper_cased_and_flattened() {
        let source = ConfigSource::from_toml(
            r#"
            ticker = "AAPL"
            probability_threshold = 0.6

            [search]
            trial_budget = 20
            "#,
        )
        .unwrap();

        assert_eq!(source.get("TICKER").as_deref(), Some("AAPL"));
        assert_eq!(source.parse_or("PROBABILITY_THRESHOLD", 0.5).unwrap(), 0.6);
        assert_eq!(source.parse_or("TRIAL_BUDGET", 50usize).unwrap(), 20);
    }

    #[test]
    fn test_missing_and_blank_values_use_default() {
        let source = ConfigSource::from_pairs(&[("WINDOW_LENGTH", "  ")]);
        assert_eq!(source.parse_or("WINDOW_LENGTH", 50usize).unwrap(), 50);
        assert_eq!(source.parse_or("TRIAL_BUDGET", 50usize).unwrap(), 50);
    }

    #[test]
    fn test_unparseable_value_names_the_key() {
        let source = ConfigSource::from_pairs(&[("TRIAL_BUDGET", "many")]);
        let err = source.parse_or("TRIAL_BUDGET", 50usize).unwrap_err();
        assert!(err.to_string().contains("TRIAL_BUDGET"));
    }

    #[test]
    fn test_arrays_are_rejected() {
        assert!(ConfigSource::from_toml("tickers = [\"A\", \"B\"]").is_err());
    }
}
