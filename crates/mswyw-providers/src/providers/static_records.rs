use mswyw_core::{MetricRecord, ScoringWindow};

use crate::error::ProviderError;
use crate::traits::RuntimeMetricsProvider;
use crate::types::ProviderArgs;

/// Serves a fixed set of records, e.g. a JSON array given on the command
/// line or captured from an earlier run.
#[derive(Debug, Clone)]
pub struct StaticMetricsProvider {
    records: Vec<MetricRecord>,
}

impl StaticMetricsProvider {
    pub fn new(records: Vec<MetricRecord>) -> Self {
        Self { records }
    }
}

#[async_trait::async_trait]
impl RuntimeMetricsProvider for StaticMetricsProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn compute_metrics(
        &self,
        _args: &ProviderArgs,
        _window: &ScoringWindow,
    ) -> Result<Vec<MetricRecord>, ProviderError> {
        Ok(self.records.clone())
    }
}
