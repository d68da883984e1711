use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Result, TunerError};
use crate::tuner::constants::{
    AVG_WINDOW_SIZE, EXECUTION_TIME, REQUIRED_METRICS, RESULTING_PATHS, WINDOWS_CREATED,
};

/// Metrics reported by one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSnapshot {
    values: BTreeMap<String, f64>,
}

impl MetricSnapshot {
    /// Parse engine output.
    ///
    /// Lines of the form `name: value` with a finite numeric value are
    /// collected; a metric printed more than once keeps its last value.
    /// Everything else, including `WARNING: ...` lines, is ignored. Fails if a
    /// required metric is missing or its last value is not a finite number
    /// (the engine prints `-nan` for averages over zero windows).
    pub fn parse(output: &str) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut malformed: BTreeMap<String, String> = BTreeMap::new();

        for line in output.lines() {
            let Some((name, raw)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    malformed.remove(name);
                    values.insert(name.to_string(), value);
                }
                _ => {
                    malformed.insert(name.to_string(), raw.trim().to_string());
                }
            }
        }

        for required in REQUIRED_METRICS {
            if let Some(raw) = malformed.get(required) {
                return Err(TunerError::MetricParse(format!(
                    "'{required}' is not a finite number: {raw:?}"
                )));
            }
            if !values.contains_key(required) {
                return Err(TunerError::MetricParse(format!(
                    "'{required}' missing from engine output"
                )));
            }
        }

        Ok(Self { values })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<f64> {
        self.get(name)
            .ok_or_else(|| TunerError::MetricParse(format!("'{name}' missing from snapshot")))
    }

    pub fn resulting_paths(&self) -> Result<f64> {
        self.require(RESULTING_PATHS)
    }

    pub fn execution_time(&self) -> Result<f64> {
        self.require(EXECUTION_TIME)
    }

    /// Result paths per unit of execution time.
    pub fn throughput(&self) -> Result<f64> {
        let time = self.execution_time()?;
        if time <= 0.0 {
            return Err(TunerError::MetricParse(format!(
                "'{EXECUTION_TIME}' must be positive, got {time}"
            )));
        }
        Ok(self.resulting_paths()? / time)
    }

    /// Window memory estimate: windows created times average window size.
    pub fn memory_estimate(&self) -> Result<f64> {
        Ok(self.require(WINDOWS_CREATED)? * self.require(AVG_WINDOW_SIZE)?)
    }

    /// Compact `name=value` rendering for logs.
    pub fn display(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
