use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::coefficients::as_float;
use crate::error::ConfigError;
use crate::record::Metric;

/// Operator-supplied metric values that replace the measured value on every
/// record of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    values: BTreeMap<Metric, f64>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.values.insert(metric, value);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = value else {
            return Err(ConfigError::NotAnObject {
                what: "overrides",
                got: value.to_string(),
            });
        };
        let mut out = Self::new();
        for (name, raw) in map {
            let metric = name.parse::<Metric>()?;
            out.values.insert(metric, as_float(name, raw)?);
        }
        Ok(out)
    }
}

impl Serialize for OverrideSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (metric, value) in &self.values {
            map.serialize_entry(metric.as_str(), value)?;
        }
        map.end()
    }
}
