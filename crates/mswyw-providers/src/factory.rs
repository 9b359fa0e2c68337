use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ProviderSettings, RuntimeProviderConfig};
use crate::error::{ProviderError, ResolveError};
use crate::providers::{
    ElasticMetricsProvider, EnvOverrideProvider, EnvParamsProvider, LinearFormula,
    NewRelicMetricsProvider, StaticMetricsProvider,
};
use crate::traits::{FormulaProvider, OverrideProvider, ParamsProvider, RuntimeMetricsProvider};
use crate::types::ProviderRole;

pub fn build_runtime_provider(
    cfg: RuntimeProviderConfig,
) -> Result<Arc<dyn RuntimeMetricsProvider>, ProviderError> {
    match cfg {
        RuntimeProviderConfig::NewRelic(s) => Ok(Arc::new(NewRelicMetricsProvider::new(s)?)),
        RuntimeProviderConfig::Elastic(s) => Ok(Arc::new(ElasticMetricsProvider::new(s)?)),
        RuntimeProviderConfig::Static(records) => Ok(Arc::new(StaticMetricsProvider::new(records))),
    }
}

/// Name-to-implementation lookup for every provider role.
///
/// Built once at startup; an unknown name fails immediately with
/// [`ResolveError::Unregistered`].
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    runtime: BTreeMap<String, Arc<dyn RuntimeMetricsProvider>>,
    formula: BTreeMap<String, Arc<dyn FormulaProvider>>,
    overrides: BTreeMap<String, Arc<dyn OverrideProvider>>,
    params: BTreeMap<String, Arc<dyn ParamsProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        for cfg in [
            RuntimeProviderConfig::NewRelic(settings.clone()),
            RuntimeProviderConfig::Elastic(settings.clone()),
        ] {
            let provider = build_runtime_provider(cfg)?;
            registry.register_runtime(provider.name(), provider);
        }
        registry.register_formula(LinearFormula::NAME, Arc::new(LinearFormula));
        registry.register_overrides(EnvOverrideProvider::NAME, Arc::new(EnvOverrideProvider::new()));
        registry.register_params(EnvParamsProvider::NAME, Arc::new(EnvParamsProvider::new()));
        Ok(registry)
    }

    pub fn register_runtime(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn RuntimeMetricsProvider>,
    ) -> &mut Self {
        self.runtime.insert(name.into(), provider);
        self
    }

    pub fn register_formula(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn FormulaProvider>,
    ) -> &mut Self {
        self.formula.insert(name.into(), provider);
        self
    }

    pub fn register_overrides(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn OverrideProvider>,
    ) -> &mut Self {
        self.overrides.insert(name.into(), provider);
        self
    }

    pub fn register_params(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn ParamsProvider>,
    ) -> &mut Self {
        self.params.insert(name.into(), provider);
        self
    }

    pub fn runtime(&self, name: &str) -> Result<Arc<dyn RuntimeMetricsProvider>, ResolveError> {
        lookup(&self.runtime, ProviderRole::RuntimeMetrics, name)
    }

    pub fn formula(&self, name: &str) -> Result<Arc<dyn FormulaProvider>, ResolveError> {
        lookup(&self.formula, ProviderRole::Formula, name)
    }

    pub fn overrides(&self, name: &str) -> Result<Arc<dyn OverrideProvider>, ResolveError> {
        lookup(&self.overrides, ProviderRole::Overrides, name)
    }

    pub fn params(&self, name: &str) -> Result<Arc<dyn ParamsProvider>, ResolveError> {
        lookup(&self.params, ProviderRole::Params, name)
    }

    pub fn names(&self, role: ProviderRole) -> Vec<&str> {
        match role {
            ProviderRole::RuntimeMetrics => self.runtime.keys().map(String::as_str).collect(),
            ProviderRole::Formula => self.formula.keys().map(String::as_str).collect(),
            ProviderRole::Overrides => self.overrides.keys().map(String::as_str).collect(),
            ProviderRole::Params => self.params.keys().map(String::as_str).collect(),
        }
    }
}

fn lookup<T: ?Sized>(
    table: &BTreeMap<String, Arc<T>>,
    role: ProviderRole,
    name: &str,
) -> Result<Arc<T>, ResolveError> {
    table
        .get(name.trim())
        .cloned()
        .ok_or_else(|| ResolveError::Unregistered {
            role,
            name: name.to_string(),
        })
}
