use std::time::Duration;

use clap::Parser;
use mswyw_providers::{ProviderArgs, ProviderSettings};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_COEFFICIENTS: &str =
    r#"{"endpoints":100.0,"mem":1.0,"cpu":1000.0,"apdex":1000.0,"rpm":1000.0,"epm":100.0,"total":1000.0}"#;

/// Microservice: worth your weight?
///
/// Every reference-typed option accepts a local JSON file path, a URL, a JSON
/// literal, or (where noted) the name of a registered provider.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "mswyw", version, about, long_about = None)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    /// Parameters for the providers: file, URL, JSON literal or params provider name.
    #[arg(long = "providerParams", env = "MSWYW_PROVIDER_PARAMS", default_value = "{}")]
    #[serde(skip_serializing)]
    pub provider_params: String,

    /// Where runtime metrics come from: provider name, or a JSON array of records.
    #[arg(long = "runtimeProvider", env = "MSWYW_RUNTIME_PROVIDER", default_value = "nrelic")]
    pub runtime_provider: String,

    /// Formula provider that computes the score.
    #[arg(long = "calcProvider", env = "MSWYW_CALC_PROVIDER", default_value = "formula")]
    pub calc_provider: String,

    /// Formula coefficients.
    #[arg(long, env = "MSWYW_COEFFICIENTS", default_value = DEFAULT_COEFFICIENTS)]
    pub coefficients: String,

    /// Values used instead of measured ones: file, URL, JSON literal or override provider name.
    #[arg(long, env = "MSWYW_OVERRIDES", default_value = "{}")]
    pub overrides: String,

    /// Minimum accepted score; below it the process exits non-zero.
    #[arg(long = "minResult", env = "MSWYW_MIN_RESULT", default_value = "0.0", allow_hyphen_values = true)]
    pub min_result: String,

    /// Sampling interval in minutes.
    #[arg(long, env = "MSWYW_INTERVAL", default_value = "30")]
    pub interval: String,

    /// How many minutes ago the sampling interval ends (now=0, 1h ago=60).
    #[arg(long = "endMinutesAgo", env = "MSWYW_END_MINUTES_AGO", default_value = "0", allow_hyphen_values = true)]
    pub end_minutes_ago: String,

    /// Per-request timeout in seconds for every HTTP call.
    #[arg(
        long = "timeoutSecs",
        env = "MSWYW_TIMEOUT_SECS",
        default_value_t = 4,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Print a human-readable report instead of JSON.
    #[arg(long)]
    pub verbose: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            provider_params: "{}".to_string(),
            runtime_provider: "nrelic".to_string(),
            calc_provider: "formula".to_string(),
            coefficients: DEFAULT_COEFFICIENTS.to_string(),
            overrides: "{}".to_string(),
            min_result: "0.0".to_string(),
            interval: "30".to_string(),
            end_minutes_ago: "0".to_string(),
            timeout_secs: 4,
            verbose: false,
        }
    }
}

impl RunSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            timeout: self.timeout(),
        }
    }

    /// The settings as a JSON object, minus `providerParams` which may
    /// carry credentials inline.
    pub fn cli_args(&self) -> ProviderArgs {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => ProviderArgs::new(),
        }
    }
}
