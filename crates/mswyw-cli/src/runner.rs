use std::fmt;

use chrono::{DateTime, Utc};
use mswyw_core::{ScoringWindow, DEFAULT_VALUE_FOR_MISSING_METRIC};
use mswyw_providers::{collect_metrics, ProviderRegistry};
use tracing::{debug, info};

use crate::error::RunError;
use crate::report::RunReport;
use crate::resolver::ParamResolver;
use crate::settings::RunSettings;

/// Checkpoints a run passes through, in order. A failure at any point
/// aborts the run; there is no way back to an earlier stage.
///
/// [`Runner::run`] ends at `Scored`; `Reported` is reached once
/// [`RunReport::emit`] has flushed the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    ConfigResolved,
    WindowComputed,
    MetricsFetched,
    OverridesResolved,
    Scored,
    Reported,
}

impl RunStage {
    pub fn reached(self) {
        info!(stage = %self, "run stage reached");
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigResolved => "config-resolved",
            Self::WindowComputed => "window-computed",
            Self::MetricsFetched => "metrics-fetched",
            Self::OverridesResolved => "overrides-resolved",
            Self::Scored => "scored",
            Self::Reported => "reported",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Runner {
    registry: ProviderRegistry,
    resolver: ParamResolver,
}

impl Runner {
    pub fn new(registry: ProviderRegistry, resolver: ParamResolver) -> Self {
        Self { registry, resolver }
    }

    /// Runner with the built-in providers, using the settings' timeout.
    pub fn from_settings(settings: &RunSettings) -> Result<Self, RunError> {
        let provider_settings = settings.provider_settings();
        let registry = ProviderRegistry::with_builtins(&provider_settings)
            .map_err(|e| RunError::from_provider("registry", e))?;
        let resolver = ParamResolver::new(provider_settings.timeout)?;
        Ok(Self::new(registry, resolver))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// One scoring run. The window closes `endMinutesAgo` before `now`.
    pub async fn run(
        &self,
        settings: &RunSettings,
        now: DateTime<Utc>,
    ) -> Result<RunReport, RunError> {
        let started_at = Utc::now();
        let cli_args = settings.cli_args();

        // Coefficients are validated before anything touches a provider.
        let coefficients = self
            .resolver
            .resolve_coefficients(&settings.coefficients)
            .await?;
        let provider_params = self
            .resolver
            .resolve_provider_params(&settings.provider_params, &cli_args, &self.registry)
            .await?;
        let interval = self
            .resolver
            .resolve_minutes(&settings.interval, "interval")
            .await?;
        let end_minutes_ago = self
            .resolver
            .resolve_minutes(&settings.end_minutes_ago, "endMinutesAgo")
            .await?;
        let min_result = self
            .resolver
            .resolve_float(&settings.min_result, "minResult")
            .await?;
        let formula = self.registry.formula(settings.calc_provider.trim())?;
        let runtime = self
            .resolver
            .resolve_runtime_provider(&settings.runtime_provider, &self.registry)
            .await?;
        RunStage::ConfigResolved.reached();
        debug!(
            runtime = runtime.name(),
            formula = formula.name(),
            params = provider_params.len(),
            "providers resolved"
        );

        let window = ScoringWindow::ending_at(now, interval, end_minutes_ago)?;
        info!(start = %window.start(), end = %window.end(), "sampling window");
        RunStage::WindowComputed.reached();

        let records = collect_metrics(runtime.as_ref(), &provider_params, &window)
            .await
            .map_err(|e| RunError::from_provider(runtime.name(), e))?;
        RunStage::MetricsFetched.reached();

        let overrides = self
            .resolver
            .resolve_overrides(&settings.overrides, &cli_args, &self.registry)
            .await?;
        debug!(overrides = overrides.len(), "overrides resolved");
        RunStage::OverridesResolved.reached();

        let score = formula.calc_mswyw(
            &records,
            &coefficients,
            &overrides,
            DEFAULT_VALUE_FOR_MISSING_METRIC,
        );
        let failed_performance = score.is_nan() || score < min_result;
        info!(score, min_result, failed_performance, "scored");
        RunStage::Scored.reached();

        let report = RunReport {
            arguments: cli_args,
            window,
            runtime_data: records,
            mswyw_score: score,
            min_result,
            failed_performance,
            started_at,
            finished_at: Utc::now(),
        };
        Ok(report)
    }
}
