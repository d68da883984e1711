use std::str::FromStr;

use crate::error::{Result, TunerError};

/// Flat engine configuration: string keys to string values, in file order.
///
/// Values are opaque to the tuner except for the handful of numeric fields it
/// reads (`size`, `slide`) or overrides (`lives`, `size`, `zscore`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    entries: Vec<(String, String)>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value. An existing key keeps its position.
    ///
    /// Surrounding whitespace is stripped from both key and value, matching
    /// what [`load_config`](crate::config::load_config) reads back.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().trim().to_string();
        let value = value.into().trim().to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return a copy of this configuration with `overrides` applied key by key.
    pub fn merge<K, V, I>(&self, overrides: I) -> Configuration
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut merged = self.clone();
        for (key, value) in overrides {
            merged.set(key, value);
        }
        merged
    }

    /// Parse a typed value, failing if the key is missing or malformed.
    pub fn parse_value<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.get(key);
        raw.and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| TunerError::InvalidConfigValue {
                key: key.to_string(),
                value: raw.map(str::to_string),
            })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Configuration::new();
        for (key, value) in iter {
            config.set(key, value);
        }
        config
    }
}
