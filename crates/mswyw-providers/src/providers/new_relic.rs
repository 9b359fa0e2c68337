use std::collections::{BTreeSet, HashMap};

use chrono::SecondsFormat;
use mswyw_core::{
    Metric, MetricRecord, ScoringWindow, LABEL_APP_NAME, LABEL_INSTANCE_ID, LABEL_LANGUAGE,
};
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{NewRelicConfig, ProviderSettings};
use crate::error::ProviderError;
use crate::traits::RuntimeMetricsProvider;
use crate::types::ProviderArgs;

/// New Relic metric name, value field, and the metric it feeds.
const SUMMARY_METRICS: [(&str, &str, Metric); 5] = [
    ("Memory/Physical", "used_bytes_by_host", Metric::Mem),
    ("Apdex", "score", Metric::Apdex),
    ("CPU/User/Utilization", "percent", Metric::Cpu),
    ("WebTransactionTotalTime", "calls_per_minute", Metric::Rpm),
    ("Errors/all", "errors_per_minute", Metric::Epm),
];

// WebTransaction/RestWebService/ alone misses Spring Boot services.
const ENDPOINT_PREFIXES: [&str; 2] = ["WebTransaction/", "Apdex/RestWebService/"];

/// Per-instance metrics from the New Relic REST API (v2).
///
/// Application ids come from `nrelic.APPID`, or from matching the
/// `nrelic.APPS` regex against the account's application names. Each
/// instance of each application then costs two requests: one summarized
/// metric payload and one metric-name listing used to count endpoints.
#[derive(Clone)]
pub struct NewRelicMetricsProvider {
    client: Client,
}

impl NewRelicMetricsProvider {
    pub const NAME: &'static str = "nrelic";

    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client })
    }

    fn url(config: &NewRelicConfig, path: &str) -> String {
        format!("{}/v2/{path}", config.base_url.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        config: &NewRelicConfig,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = Self::url(config, path);
        debug!(url = %url, "new relic request");
        let res = self
            .client
            .get(&url)
            .header("X-Api-Key", &config.api_key)
            .query(query)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let body = error_title(&body).unwrap_or(body);
            return Err(ProviderError::Api { status, body });
        }

        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn resolve_app_ids(&self, config: &NewRelicConfig) -> Result<Vec<String>, ProviderError> {
        if let Some(app_id) = &config.app_id {
            return Ok(vec![app_id.clone()]);
        }
        let Some(pattern) = &config.app_name_pattern else {
            return Err(ProviderError::Config(format!(
                "no target applications given: set {0}.APPID or {0}.APPS",
                Self::NAME
            )));
        };
        let matcher = Regex::new(pattern).map_err(|e| {
            ProviderError::Config(format!("{}.APPS is not a valid regex: {e}", Self::NAME))
        })?;

        let listing: ApplicationsResponse = self.get_json(config, "applications.json", &[]).await?;
        let ids = select_app_ids(&listing, &matcher);
        if ids.is_empty() {
            return Err(ProviderError::Config(format!(
                "no apps found under the parameters provided: {pattern}"
            )));
        }
        Ok(ids)
    }

    async fn instance_record(
        &self,
        config: &NewRelicConfig,
        app_id: &str,
        instance: &ApplicationInstance,
        window: &ScoringWindow,
    ) -> Result<MetricRecord, ProviderError> {
        let mut query: Vec<(&str, String)> = SUMMARY_METRICS
            .iter()
            .map(|(name, _, _)| ("names[]", (*name).to_string()))
            .collect();
        query.push((
            "from",
            window.start().to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
        query.push(("to", window.end().to_rfc3339_opts(SecondsFormat::Secs, true)));
        query.push(("summarize", "true".to_string()));

        let data_path = format!(
            "applications/{app_id}/instances/{}/metrics/data.json",
            instance.id
        );
        let data: MetricDataResponse = self.get_json(config, &data_path, &query).await?;

        let names_path = format!("applications/{app_id}/instances/{}/metrics.json", instance.id);
        let names: MetricNamesResponse = self.get_json(config, &names_path, &[]).await?;

        let mut record = summary_record(&data).with_metric(Metric::Endpoints, count_endpoints(&names));
        record = record
            .with_label(LABEL_INSTANCE_ID, instance.id.to_string())
            .with_label(LABEL_APP_NAME, instance.application_name.clone());
        if let Some(language) = &instance.language {
            record = record.with_label(LABEL_LANGUAGE, language.clone());
        }
        Ok(record)
    }
}

#[async_trait::async_trait]
impl RuntimeMetricsProvider for NewRelicMetricsProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn compute_metrics(
        &self,
        args: &ProviderArgs,
        window: &ScoringWindow,
    ) -> Result<Vec<MetricRecord>, ProviderError> {
        let config = NewRelicConfig::from_args(self.name(), args);
        let app_ids = self.resolve_app_ids(&config).await?;

        let mut records = Vec::new();
        for app_id in &app_ids {
            let path = format!("applications/{app_id}/instances.json");
            let instances: InstancesResponse = self.get_json(&config, &path, &[]).await?;
            if instances.application_instances.is_empty() {
                warn!(app_id = %app_id, "application has no running instances");
            }
            for instance in &instances.application_instances {
                records.push(self.instance_record(&config, app_id, instance, window).await?);
            }
        }
        Ok(records)
    }
}

fn select_app_ids(listing: &ApplicationsResponse, matcher: &Regex) -> Vec<String> {
    listing
        .applications
        .iter()
        .filter(|app| matcher.is_match(&app.name))
        .map(|app| app.id.to_string())
        .collect()
}

fn summary_record(data: &MetricDataResponse) -> MetricRecord {
    let series: HashMap<&str, &MetricSeries> = data
        .metric_data
        .metrics
        .iter()
        .map(|m| (m.name.as_str(), m))
        .collect();

    let mut record = MetricRecord::new();
    for (name, field, metric) in SUMMARY_METRICS {
        let value = series
            .get(name)
            .and_then(|s| s.timeslices.first())
            .and_then(|slice| slice.values.get(field))
            .and_then(Value::as_f64);
        match value {
            Some(v) => record = record.with_metric(metric, v),
            None => debug!(metric = name, "metric absent from new relic summary"),
        }
    }
    record
}

#[allow(clippy::cast_precision_loss)]
fn count_endpoints(names: &MetricNamesResponse) -> f64 {
    let unique: BTreeSet<&str> = names
        .metrics
        .iter()
        .map(|m| m.name.as_str())
        .filter(|name| ENDPOINT_PREFIXES.iter().any(|p| name.starts_with(p)))
        .collect();
    unique.len() as f64
}

fn error_title(body: &str) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_str(body).ok()?;
    Some(parsed.error.title)
}

#[derive(Debug, Deserialize)]
struct ApplicationsResponse {
    #[serde(default)]
    applications: Vec<Application>,
}

#[derive(Debug, Deserialize)]
struct Application {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct InstancesResponse {
    #[serde(default)]
    application_instances: Vec<ApplicationInstance>,
}

#[derive(Debug, Deserialize)]
struct ApplicationInstance {
    id: u64,
    application_name: String,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetricDataResponse {
    metric_data: MetricData,
}

#[derive(Debug, Deserialize)]
struct MetricData {
    #[serde(default)]
    metrics: Vec<MetricSeries>,
}

#[derive(Debug, Deserialize)]
struct MetricSeries {
    name: String,
    #[serde(default)]
    timeslices: Vec<Timeslice>,
}

#[derive(Debug, Deserialize)]
struct Timeslice {
    #[serde(default)]
    values: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MetricNamesResponse {
    #[serde(default)]
    metrics: Vec<MetricName>,
}

#[derive(Debug, Deserialize)]
struct MetricName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    title: String,
}
