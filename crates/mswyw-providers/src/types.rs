use std::fmt;

use serde_json::{Map, Value};

/// Provider-specific parameters, keyed `<provider>.<KEY>` (e.g. `nrelic.APIKEY`).
pub type ProviderArgs = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderRole {
    RuntimeMetrics,
    Formula,
    Overrides,
    Params,
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeMetrics => write!(f, "runtime-metrics"),
            Self::Formula => write!(f, "formula"),
            Self::Overrides => write!(f, "overrides"),
            Self::Params => write!(f, "params"),
        }
    }
}

pub fn param_key(provider: &str, key: &str) -> String {
    format!("{provider}.{key}")
}

/// Reads a string parameter. Numbers are accepted and rendered as text;
/// blank strings count as absent.
pub fn arg_string(args: &ProviderArgs, provider: &str, key: &str) -> Option<String> {
    match args.get(&param_key(provider, key))? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a list parameter given either as one string or as an array of
/// strings.
pub fn arg_list(args: &ProviderArgs, provider: &str, key: &str) -> Vec<String> {
    match args.get(&param_key(provider, key)) {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn arg_f64(args: &ProviderArgs, provider: &str, key: &str) -> Option<Result<f64, String>> {
    let name = param_key(provider, key);
    let raw = args.get(&name)?;
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Some(parsed.ok_or_else(|| format!("{name} is set to {raw}, which is not a valid number")))
}
