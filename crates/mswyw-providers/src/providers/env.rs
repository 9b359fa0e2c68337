use std::ffi::OsString;

use mswyw_core::{as_float, Metric, OverrideSet};
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::traits::{OverrideProvider, ParamsProvider};
use crate::types::{param_key, ProviderArgs};

const PARAM_PREFIX: &str = "MSWYW_PARAM_";
const OVERRIDE_PREFIX: &str = "MSWYW_OVERRIDE_";

#[derive(Debug, Clone, Default)]
struct EnvSource {
    snapshot: Option<Vec<(String, String)>>,
}

impl EnvSource {
    fn vars(&self) -> Vec<(String, String)> {
        let mut vars = match &self.snapshot {
            Some(vars) => vars.clone(),
            None => utf8_vars(std::env::vars_os()),
        };
        vars.sort();
        vars
    }
}

// Entries that are not valid UTF-8 cannot name a param or override; skip them.
fn utf8_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Vec<(String, String)> {
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (name, _) => {
                debug!(var = ?name, "skipping non utf-8 environment variable");
                None
            }
        })
        .collect()
}

/// Builds provider parameters from `MSWYW_PARAM_<PROVIDER>_<KEY>` variables,
/// so `MSWYW_PARAM_NRELIC_APIKEY` becomes `nrelic.APIKEY`.
#[derive(Debug, Clone, Default)]
pub struct EnvParamsProvider {
    source: EnvSource,
}

impl EnvParamsProvider {
    pub const NAME: &'static str = "env";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            source: EnvSource {
                snapshot: Some(vars.into_iter().collect()),
            },
        }
    }
}

impl ParamsProvider for EnvParamsProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compute_params(&self, _cli_args: &ProviderArgs) -> Result<ProviderArgs, ProviderError> {
        let mut out = ProviderArgs::new();
        for (name, value) in self.source.vars() {
            let Some((provider, key)) = name
                .strip_prefix(PARAM_PREFIX)
                .and_then(|rest| rest.split_once('_'))
            else {
                continue;
            };
            if provider.is_empty() || key.is_empty() {
                continue;
            }
            out.insert(
                param_key(&provider.to_ascii_lowercase(), key),
                Value::String(value),
            );
        }
        Ok(out)
    }
}

/// Reads overrides from `MSWYW_OVERRIDE_<METRIC>` variables, e.g.
/// `MSWYW_OVERRIDE_APDEX=1` for platforms that report no Apdex.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrideProvider {
    source: EnvSource,
}

impl EnvOverrideProvider {
    pub const NAME: &'static str = "env";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            source: EnvSource {
                snapshot: Some(vars.into_iter().collect()),
            },
        }
    }
}

impl OverrideProvider for EnvOverrideProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compute_overrides(&self, _cli_args: &ProviderArgs) -> Result<OverrideSet, ProviderError> {
        let mut out = OverrideSet::new();
        for (name, value) in self.source.vars() {
            let Some(metric) = name.strip_prefix(OVERRIDE_PREFIX) else {
                continue;
            };
            let metric = metric
                .to_ascii_lowercase()
                .parse::<Metric>()
                .map_err(|e| ProviderError::Config(format!("{name}: {e}")))?;
            let value = as_float(&name, &Value::String(value))
                .map_err(|e| ProviderError::Config(e.to_string()))?;
            out = out.with(metric, value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let raw = vec![
            (OsString::from("MSWYW_PARAM_NRELIC_APIKEY"), OsString::from("secret")),
            (OsString::from("BAD_VALUE"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(vec![0xff, 0xfe]), OsString::from("x")),
            (
                OsString::from("MSWYW_OVERRIDE_APDEX"),
                OsString::from_vec(vec![b'1', 0xff]),
            ),
        ];
        let vars = utf8_vars(raw);
        assert_eq!(
            vars,
            vec![("MSWYW_PARAM_NRELIC_APIKEY".to_string(), "secret".to_string())]
        );

        let params = EnvParamsProvider::with_vars(vars)
            .compute_params(&ProviderArgs::new())
            .expect("params");
        assert_eq!(params["nrelic.APIKEY"], "secret");
    }

    #[test]
    fn live_environment_is_read_without_panicking() {
        assert!(EnvParamsProvider::new().compute_params(&ProviderArgs::new()).is_ok());
    }

    #[test]
    fn params_map_provider_and_key() {
        let provider = EnvParamsProvider::with_vars(vars(&[
            ("MSWYW_PARAM_NRELIC_APIKEY", "secret"),
            ("MSWYW_PARAM_ELASTIC_APDEX_T", "0.25"),
            ("MSWYW_PARAM_BROKEN", "x"),
            ("HOME", "/root"),
        ]));
        let params = provider.compute_params(&ProviderArgs::new()).expect("params");
        assert_eq!(params.len(), 2);
        assert_eq!(params["nrelic.APIKEY"], "secret");
        assert_eq!(params["elastic.APDEX_T"], "0.25");
    }

    #[test]
    fn overrides_parse_metric_names() {
        let provider = EnvOverrideProvider::with_vars(vars(&[
            ("MSWYW_OVERRIDE_APDEX", "1"),
            ("MSWYW_OVERRIDE_epm", "0.5"),
        ]));
        let set = provider.compute_overrides(&ProviderArgs::new()).expect("overrides");
        assert_eq!(set.get(Metric::Apdex), Some(1.0));
        assert_eq!(set.get(Metric::Epm), Some(0.5));
    }

    #[test]
    fn overrides_reject_unknown_metric_and_bad_number() {
        let unknown = EnvOverrideProvider::with_vars(vars(&[("MSWYW_OVERRIDE_LATENCY", "1")]));
        assert!(unknown.compute_overrides(&ProviderArgs::new()).is_err());

        let bad = EnvOverrideProvider::with_vars(vars(&[("MSWYW_OVERRIDE_MEM", "lots")]));
        let err = bad
            .compute_overrides(&ProviderArgs::new())
            .expect_err("must fail");
        assert!(err.is_config());
    }
}
