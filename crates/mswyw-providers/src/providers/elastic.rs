use std::collections::BTreeMap;

use chrono::SecondsFormat;
use mswyw_core::{Metric, MetricRecord, ScoringWindow, LABEL_APP_NAME, LABEL_CONTAINER_ID};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{ElasticConfig, ProviderSettings};
use crate::error::ProviderError;
use crate::traits::RuntimeMetricsProvider;
use crate::types::ProviderArgs;

const BUCKET_LIMIT: u32 = 999;

// Satisfied at apdex_t, tolerating up to 4 * apdex_t, frustrated beyond.
const APDEX_SCRIPT: &str = "if (doc['transaction.duration.us'].size() == 0) { return null; } \
double d = doc['transaction.duration.us'].value; \
if (d <= params.apdex_t_us) { return 1; } \
if (d <= params.apdex_t_us * 4) { return 0.5; } \
return 0;";

/// Elastic APM metrics via two aggregation queries over all containers of
/// all requested services, joined on `(service.name, container.id)`.
#[derive(Clone)]
pub struct ElasticMetricsProvider {
    client: Client,
}

impl ElasticMetricsProvider {
    pub const NAME: &'static str = "elastic";

    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client })
    }

    async fn search<T: DeserializeOwned>(
        &self,
        config: &ElasticConfig,
        body: &Value,
    ) -> Result<T, ProviderError> {
        let url = format!(
            "{}/{}/_search",
            config.base_url.trim_end_matches('/'),
            config.index
        );
        debug!(url = %url, "elastic search");
        let mut req = self.client.post(&url).json(body);
        if !config.user.is_empty() {
            req = req.basic_auth(&config.user, Some(&config.password));
        }
        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl RuntimeMetricsProvider for ElasticMetricsProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn compute_metrics(
        &self,
        args: &ProviderArgs,
        window: &ScoringWindow,
    ) -> Result<Vec<MetricRecord>, ProviderError> {
        let config = ElasticConfig::from_args(self.name(), args)?;
        let minutes = window.minutes();
        if minutes < 1.0 {
            return Err(ProviderError::Config(format!(
                "window too short: per-minute rates need at least one minute, got {minutes:.3}"
            )));
        }

        let query = ApmQuery::new(&config.apps, window);
        let resources: SearchResponse<ContainerResources> =
            self.search(&config, &query.resource_usage()).await?;
        let throughput: SearchResponse<ContainerThroughput> =
            self.search(&config, &query.throughput(config.apdex_t)).await?;

        Ok(join_on_container(resources, throughput, minutes))
    }
}

/// Typed builder for the two APM aggregation queries.
#[derive(Debug, Clone, Copy)]
pub struct ApmQuery<'a> {
    apps: &'a [String],
    window: &'a ScoringWindow,
}

impl<'a> ApmQuery<'a> {
    pub fn new(apps: &'a [String], window: &'a ScoringWindow) -> Self {
        Self { apps, window }
    }

    fn filters(&self) -> Vec<Value> {
        vec![
            json!({ "terms": { "service.name": self.apps } }),
            json!({
                "range": {
                    "@timestamp": {
                        "format": "strict_date_optional_time",
                        "gte": self.window.start().to_rfc3339_opts(SecondsFormat::Millis, true),
                        "lt": self.window.end().to_rfc3339_opts(SecondsFormat::Millis, true),
                    }
                }
            }),
        ]
    }

    fn per_container(&self, filters: Vec<Value>, metrics: Value) -> Value {
        json!({
            "size": 0,
            "query": { "bool": { "filter": filters } },
            "aggs": {
                "service_name": {
                    "terms": { "field": "service.name", "size": BUCKET_LIMIT },
                    "aggs": {
                        "container_id": {
                            "terms": { "field": "container.id", "size": BUCKET_LIMIT },
                            "aggs": metrics
                        }
                    }
                }
            }
        })
    }

    /// Peak memory and peak normalized CPU per container.
    pub fn resource_usage(&self) -> Value {
        self.per_container(
            self.filters(),
            json!({
                "ram_used": { "max": { "field": "system.process.memory.size" } },
                "cpu_percent_max": { "max": { "field": "system.process.cpu.total.norm.pct" } }
            }),
        )
    }

    /// Apdex, distinct endpoints, errors and requests per container, over
    /// request transactions only.
    pub fn throughput(&self, apdex_t_secs: f64) -> Value {
        let mut filters = self.filters();
        filters.push(json!({ "term": { "transaction.type": "request" } }));
        self.per_container(
            filters,
            json!({
                "apdex_avg": {
                    "avg": {
                        "script": {
                            "source": APDEX_SCRIPT,
                            "lang": "painless",
                            "params": { "apdex_t_us": apdex_t_secs * 1_000_000.0 }
                        }
                    }
                },
                "trans_name_count": { "cardinality": { "field": "transaction.name" } },
                "error_count": { "cardinality": { "field": "error.id" } },
                "trans_id_count": { "cardinality": { "field": "transaction.id" } }
            }),
        )
    }
}

fn join_on_container(
    resources: SearchResponse<ContainerResources>,
    throughput: SearchResponse<ContainerThroughput>,
    minutes: f64,
) -> Vec<MetricRecord> {
    let mut rates: BTreeMap<(String, String), ContainerThroughput> = throughput
        .aggregations
        .service_name
        .buckets
        .into_iter()
        .flat_map(|service| {
            let app = service.key;
            service
                .container_id
                .buckets
                .into_iter()
                .map(move |c| ((app.clone(), c.key.clone()), c))
        })
        .collect();

    let mut records = Vec::new();
    for service in resources.aggregations.service_name.buckets {
        for container in service.container_id.buckets {
            let mut record = MetricRecord::new()
                .with_label(LABEL_APP_NAME, service.key.clone())
                .with_label(LABEL_CONTAINER_ID, container.key.clone());
            if let Some(mem) = container.ram_used.value {
                record = record.with_metric(Metric::Mem, mem);
            }
            if let Some(cpu) = container.cpu_percent_max.value {
                record = record.with_metric(Metric::Cpu, cpu * 100.0);
            }

            let key = (service.key.clone(), container.key);
            record = match rates.remove(&key) {
                Some(t) => with_throughput(record, &t, minutes),
                None => {
                    warn!(
                        app = %key.0,
                        container = %key.1,
                        "no request transactions for container; using zero throughput"
                    );
                    record
                        .with_metric(Metric::Apdex, 0.0)
                        .with_metric(Metric::Endpoints, 0.0)
                        .with_metric(Metric::Rpm, 0.0)
                        .with_metric(Metric::Epm, 0.0)
                }
            };
            records.push(record);
        }
    }

    // Kept without mem/cpu so the missing-metric default applies to them.
    for ((app, container), t) in rates {
        warn!(
            app = %app,
            container = %container,
            "transactions without resource usage; mem and cpu left unset"
        );
        let record = MetricRecord::new()
            .with_label(LABEL_APP_NAME, app)
            .with_label(LABEL_CONTAINER_ID, container);
        records.push(with_throughput(record, &t, minutes));
    }
    records
}

fn with_throughput(mut record: MetricRecord, t: &ContainerThroughput, minutes: f64) -> MetricRecord {
    if let Some(apdex) = t.apdex_avg.value {
        record = record.with_metric(Metric::Apdex, apdex);
    }
    record
        .with_metric(Metric::Endpoints, t.trans_name_count.value.unwrap_or(0.0))
        .with_metric(Metric::Rpm, t.trans_id_count.value.unwrap_or(0.0) / minutes)
        .with_metric(Metric::Epm, t.error_count.value.unwrap_or(0.0) / minutes)
}

#[derive(Debug, Deserialize)]
struct SearchResponse<C> {
    aggregations: ServiceAggs<C>,
}

#[derive(Debug, Deserialize)]
struct ServiceAggs<C> {
    service_name: Terms<ServiceBucket<C>>,
}

#[derive(Debug, Deserialize)]
struct Terms<B> {
    #[serde(default = "Vec::new")]
    buckets: Vec<B>,
}

#[derive(Debug, Deserialize)]
struct ServiceBucket<C> {
    key: String,
    container_id: Terms<C>,
}

#[derive(Debug, Deserialize)]
struct ContainerResources {
    key: String,
    ram_used: SingleValue,
    cpu_percent_max: SingleValue,
}

#[derive(Debug, Deserialize)]
struct ContainerThroughput {
    key: String,
    apdex_avg: SingleValue,
    trans_name_count: SingleValue,
    error_count: SingleValue,
    trans_id_count: SingleValue,
}

#[derive(Debug, Deserialize)]
struct SingleValue {
    value: Option<f64>,
}
