use async_trait::async_trait;
use mswyw_core::{CoefficientSet, MetricRecord, OverrideSet, ScoringWindow};

use crate::error::ProviderError;
use crate::types::ProviderArgs;

/// Source of per-instance runtime metrics.
///
/// Implementations return one record per running instance found in the
/// window and fail rather than return an empty set when no target
/// application is configured.
#[async_trait]
pub trait RuntimeMetricsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn compute_metrics(
        &self,
        args: &ProviderArgs,
        window: &ScoringWindow,
    ) -> Result<Vec<MetricRecord>, ProviderError>;
}

pub trait FormulaProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn calc_mswyw(
        &self,
        records: &[MetricRecord],
        coefficients: &CoefficientSet,
        overrides: &OverrideSet,
        default_for_missing: f64,
    ) -> f64;
}

pub trait OverrideProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn compute_overrides(&self, cli_args: &ProviderArgs) -> Result<OverrideSet, ProviderError>;
}

pub trait ParamsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn compute_params(&self, cli_args: &ProviderArgs) -> Result<ProviderArgs, ProviderError>;
}
