use mswyw_core::{MetricRecord, ScoringWindow};
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::traits::RuntimeMetricsProvider;
use crate::types::ProviderArgs;

/// Invokes `provider` once for `window` and checks what came back.
///
/// Non-finite metric values are rejected as an invalid response. Records
/// lacking a metric are kept; the formula substitutes a default for them.
pub async fn collect_metrics(
    provider: &dyn RuntimeMetricsProvider,
    args: &ProviderArgs,
    window: &ScoringWindow,
) -> Result<Vec<MetricRecord>, ProviderError> {
    info!(
        provider = provider.name(),
        start = %window.start(),
        end = %window.end(),
        "fetching runtime metrics"
    );
    let records = provider.compute_metrics(args, window).await?;

    for (idx, record) in records.iter().enumerate() {
        if let Some((metric, value)) = record.metrics().find(|(_, v)| !v.is_finite()) {
            return Err(ProviderError::InvalidResponse(format!(
                "{} returned {metric}={value} for instance #{idx}",
                provider.name()
            )));
        }
        let missing = record.missing_metrics();
        if !missing.is_empty() {
            let missing = missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            warn!(
                provider = provider.name(),
                instance = idx,
                missing = %missing,
                "instance is missing metrics"
            );
        }
    }

    info!(
        provider = provider.name(),
        instances = records.len(),
        "runtime metrics collected"
    );
    Ok(records)
}
