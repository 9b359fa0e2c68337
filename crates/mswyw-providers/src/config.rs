use std::time::Duration;

use mswyw_core::MetricRecord;

use crate::error::ProviderError;
use crate::types::{arg_f64, arg_list, arg_string, ProviderArgs};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRelicConfig {
    pub api_key: String,
    pub base_url: String,
    pub app_id: Option<String>,
    pub app_name_pattern: Option<String>,
}

impl NewRelicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.newrelic.com".to_string(),
            app_id: None,
            app_name_pattern: None,
        }
    }

    /// Reads `<provider>.APIKEY`, `.APPID`, `.APPS` and `.URL`.
    pub fn from_args(provider: &str, args: &ProviderArgs) -> Self {
        let mut config = Self::new(arg_string(args, provider, "APIKEY").unwrap_or_default());
        if let Some(url) = arg_string(args, provider, "URL") {
            config.base_url = url;
        }
        config.app_id = arg_string(args, provider, "APPID");
        config.app_name_pattern = arg_string(args, provider, "APPS");
        config
    }
}

#[derive(Debug, Clone)]
pub struct ElasticConfig {
    pub base_url: String,
    pub user: String,
    pub password: String,
    pub apps: Vec<String>,
    pub apdex_t: f64,
    pub index: String,
}

impl ElasticConfig {
    pub const DEFAULT_APDEX_T: f64 = 0.5;

    pub fn new(base_url: impl Into<String>, apps: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user: String::new(),
            password: String::new(),
            apps,
            apdex_t: Self::DEFAULT_APDEX_T,
            index: "apm-*".to_string(),
        }
    }

    /// Reads `<provider>.URL`, `.USER`, `.PASSWORD`, `.APPS`, `.APDEX_T` and
    /// `.INDEX`. Fails when no target application is named.
    pub fn from_args(provider: &str, args: &ProviderArgs) -> Result<Self, ProviderError> {
        let apps = arg_list(args, provider, "APPS");
        if apps.is_empty() {
            return Err(ProviderError::Config(format!(
                "no target applications given: {provider}.APPS is empty"
            )));
        }
        let base_url = arg_string(args, provider, "URL").ok_or_else(|| {
            ProviderError::Config(format!("{provider}.URL is required"))
        })?;

        let mut config = Self::new(base_url, apps);
        config.user = arg_string(args, provider, "USER").unwrap_or_default();
        config.password = arg_string(args, provider, "PASSWORD").unwrap_or_default();
        if let Some(apdex_t) = arg_f64(args, provider, "APDEX_T") {
            config.apdex_t = apdex_t.map_err(ProviderError::Config)?;
        }
        if config.apdex_t.is_nan() || config.apdex_t <= 0.0 {
            return Err(ProviderError::Config(format!(
                "{provider}.APDEX_T must be a positive number of seconds, got {}",
                config.apdex_t
            )));
        }
        if let Some(index) = arg_string(args, provider, "INDEX") {
            config.index = index;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub enum RuntimeProviderConfig {
    NewRelic(ProviderSettings),
    Elastic(ProviderSettings),
    Static(Vec<MetricRecord>),
}
