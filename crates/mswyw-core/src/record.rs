use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ConfigError;

pub const LABEL_APP_NAME: &str = "_appname";
pub const LABEL_CONTAINER_ID: &str = "_container_id";
pub const LABEL_INSTANCE_ID: &str = "_id";
pub const LABEL_LANGUAGE: &str = "_lang";

/// A runtime metric the formula knows how to weigh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Mem,
    Cpu,
    Rpm,
    Epm,
    Apdex,
    Endpoints,
}

impl Metric {
    pub const ALL: [Self; 6] = [
        Self::Mem,
        Self::Cpu,
        Self::Rpm,
        Self::Epm,
        Self::Apdex,
        Self::Endpoints,
    ];

    /// Metrics summed into the cost side of the ratio.
    pub const COST: [Self; 3] = [Self::Mem, Self::Cpu, Self::Epm];

    /// Metrics summed into the value side of the ratio.
    pub const VALUE: [Self; 3] = [Self::Apdex, Self::Rpm, Self::Endpoints];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mem => "mem",
            Self::Cpu => "cpu",
            Self::Rpm => "rpm",
            Self::Epm => "epm",
            Self::Apdex => "apdex",
            Self::Endpoints => "endpoints",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownMetric(s.to_string()))
    }
}

/// Metrics observed for one running instance over one sampling window.
///
/// Built once by a provider and read-only afterwards. Serializes to a flat
/// JSON object where metrics are numbers and identity labels (`_appname`,
/// `_container_id`, ...) are strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    metrics: BTreeMap<Metric, f64>,
    labels: BTreeMap<String, String>,
}

impl MetricRecord {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.metrics.iter().map(|(m, v)| (*m, *v))
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn missing_metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| !self.metrics.contains_key(m))
            .collect()
    }
}

impl TryFrom<Map<String, Value>> for MetricRecord {
    type Error = ConfigError;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut record = Self::new();
        for (key, value) in raw {
            if let Ok(metric) = key.parse::<Metric>() {
                match value {
                    Value::Null => {}
                    Value::Number(n) => {
                        let v = n.as_f64().ok_or_else(|| ConfigError::NotANumber {
                            name: key.clone(),
                            value: n.to_string(),
                        })?;
                        record.metrics.insert(metric, v);
                    }
                    other => {
                        return Err(ConfigError::NotANumber {
                            name: key,
                            value: other.to_string(),
                        })
                    }
                }
                continue;
            }
            match value {
                Value::Null => {}
                Value::String(s) => {
                    record.labels.insert(key, s);
                }
                other => {
                    record.labels.insert(key, other.to_string());
                }
            }
        }
        Ok(record)
    }
}

impl Serialize for MetricRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metrics.len() + self.labels.len()))?;
        for (metric, value) in &self.metrics {
            map.serialize_entry(metric.as_str(), value)?;
        }
        for (key, value) in &self.labels {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetricRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        Self::try_from(raw).map_err(de::Error::custom)
    }
}
