use std::fmt::Display;

use mswyw_core::ConfigError;
use mswyw_providers::{ProviderError, ResolveError};
use thiserror::Error;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_CONFIGURATION: u8 = 2;
pub const EXIT_PROVIDER_RESOLUTION: u8 = 3;
pub const EXIT_PROVIDER_EXECUTION: u8 = 4;
pub const EXIT_BELOW_THRESHOLD: u8 = 10;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    ProviderResolution(#[from] ResolveError),

    #[error("provider `{provider}` failed: {source}")]
    ProviderExecution {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

impl RunError {
    /// Configuration error naming the reference that could not be used.
    pub fn reference(reference: &str, detail: impl Display) -> Self {
        Self::Configuration(format!("`{reference}`: {detail}"))
    }

    /// Configuration problems reported by a provider stay configuration
    /// errors; everything else a provider raises is an execution failure.
    pub fn from_provider(provider: &str, err: ProviderError) -> Self {
        match err {
            ProviderError::Config(msg) => Self::Configuration(format!("{provider}: {msg}")),
            source => Self::ProviderExecution {
                provider: provider.to_string(),
                source,
            },
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => EXIT_CONFIGURATION,
            Self::ProviderResolution(_) => EXIT_PROVIDER_RESOLUTION,
            Self::ProviderExecution { .. } => EXIT_PROVIDER_EXECUTION,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mswyw_providers::ProviderRole;

    #[test]
    fn each_failure_kind_has_its_own_exit_code() {
        let config = RunError::from(ConfigError::MissingCoefficient("epm"));
        let resolution = RunError::from(ResolveError::Unregistered {
            role: ProviderRole::RuntimeMetrics,
            name: "datadog".to_string(),
        });
        let execution = RunError::from_provider(
            "nrelic",
            ProviderError::Api {
                status: 503,
                body: "unavailable".to_string(),
            },
        );

        let codes = [
            config.exit_code(),
            resolution.exit_code(),
            execution.exit_code(),
            EXIT_BELOW_THRESHOLD,
            EXIT_SUCCESS,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert_eq!(config.to_string(), "configuration error: missing coefficient epm");
    }

    #[test]
    fn provider_config_errors_stay_configuration() {
        let err = RunError::from_provider(
            "elastic",
            ProviderError::Config("no target applications given: elastic.APPS is empty".to_string()),
        );
        assert_eq!(err.exit_code(), EXIT_CONFIGURATION);
        assert_eq!(
            err.to_string(),
            "configuration error: elastic: no target applications given: elastic.APPS is empty"
        );
    }
}
