use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::record::Metric;

pub const REQUIRED_COEFFICIENTS: [&str; 7] =
    ["total", "apdex", "rpm", "endpoints", "mem", "cpu", "epm"];

/// Weights applied to each metric, plus the `total` multiplier on the ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoefficientSet {
    pub total: f64,
    pub apdex: f64,
    pub rpm: f64,
    pub endpoints: f64,
    pub mem: f64,
    pub cpu: f64,
    pub epm: f64,
}

impl Default for CoefficientSet {
    fn default() -> Self {
        Self {
            total: 1000.0,
            apdex: 1000.0,
            rpm: 1000.0,
            endpoints: 100.0,
            mem: 1.0,
            cpu: 1000.0,
            epm: 100.0,
        }
    }
}

impl CoefficientSet {
    pub fn weight(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Mem => self.mem,
            Metric::Cpu => self.cpu,
            Metric::Rpm => self.rpm,
            Metric::Epm => self.epm,
            Metric::Apdex => self.apdex,
            Metric::Endpoints => self.endpoints,
        }
    }

    /// Validates a JSON object of coefficients.
    ///
    /// Every required key must be present and every value, extra keys
    /// included, must read as a float. Numeric strings such as `"1e3"` are
    /// accepted.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = value else {
            return Err(ConfigError::NotAnObject {
                what: "coefficients",
                got: value.to_string(),
            });
        };

        for name in REQUIRED_COEFFICIENTS {
            if !map.contains_key(name) {
                return Err(ConfigError::MissingCoefficient(name));
            }
        }
        for (name, raw) in map {
            as_float(name, raw)?;
        }

        let get = |name: &'static str| -> Result<f64, ConfigError> {
            lookup(map, name).and_then(|raw| as_float(name, raw))
        };
        Ok(Self {
            total: get("total")?,
            apdex: get("apdex")?,
            rpm: get("rpm")?,
            endpoints: get("endpoints")?,
            mem: get("mem")?,
            cpu: get("cpu")?,
            epm: get("epm")?,
        })
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, ConfigError> {
    map.get(name).ok_or(ConfigError::MissingCoefficient(name))
}

/// Reads a JSON number or a numeric string as `f64`. `NaN` and the
/// infinities are not numbers here, even though `str::parse` takes them.
pub fn as_float(name: &str, raw: &Value) -> Result<f64, ConfigError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).ok_or_else(|| ConfigError::NotANumber {
        name: name.to_string(),
        value: raw.to_string(),
    })
}
