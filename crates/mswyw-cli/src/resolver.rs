use std::fs;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mswyw_core::{as_float, CoefficientSet, MetricRecord, OverrideSet};
use mswyw_providers::{
    build_runtime_provider, ProviderArgs, ProviderRegistry, RuntimeMetricsProvider,
    RuntimeProviderConfig,
};
use regex::{Regex, RegexBuilder};
use reqwest::{Client, Url};
use serde_json::Value;
use suppaftp::FtpStream;
use tracing::{debug, warn};

use crate::error::RunError;

const URL_PATTERN: &str = r"^(?:http|ftp|file)s?://";

/// What a reference string turned out to be, in resolution priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamReference {
    File(PathBuf),
    Url(String),
    Literal(Value),
    Named(String),
}

/// Turns reference strings (file path, URL, JSON literal or provider name)
/// into concrete values.
///
/// A reference naming an existing file is always read as a file, even when
/// its text would also parse as JSON.
pub struct ParamResolver {
    client: Client,
    url_pattern: Regex,
    timeout: Duration,
}

impl ParamResolver {
    pub fn new(timeout: Duration) -> Result<Self, RunError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RunError::Configuration(format!("cannot build http client: {e}")))?;
        let url_pattern = RegexBuilder::new(URL_PATTERN)
            .case_insensitive(true)
            .build()
            .map_err(|e| RunError::Configuration(format!("bad url pattern: {e}")))?;
        Ok(Self {
            client,
            url_pattern,
            timeout,
        })
    }

    pub fn classify(&self, raw: &str) -> ParamReference {
        let path = Path::new(raw);
        if path.is_file() {
            return ParamReference::File(path.to_path_buf());
        }
        if self.url_pattern.is_match(raw) {
            return ParamReference::Url(raw.to_string());
        }
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return ParamReference::Literal(value);
        }
        ParamReference::Named(raw.trim().to_string())
    }

    /// Resolves a reference that must yield JSON; provider names are not
    /// accepted here.
    pub async fn resolve(&self, raw: &str) -> Result<Value, RunError> {
        match self.classify(raw) {
            ParamReference::Named(_) => Err(RunError::reference(
                raw,
                "not an existing file, a URL or valid JSON",
            )),
            reference => self.load(raw, reference).await,
        }
    }

    async fn load(&self, raw: &str, reference: ParamReference) -> Result<Value, RunError> {
        match reference {
            ParamReference::File(path) => read_json_file(raw, &path),
            ParamReference::Url(url) => self.fetch(raw, &url).await,
            ParamReference::Literal(value) => Ok(value),
            ParamReference::Named(name) => Err(RunError::reference(
                raw,
                format!("`{name}` cannot be loaded as JSON"),
            )),
        }
    }

    async fn fetch(&self, raw: &str, url: &str) -> Result<Value, RunError> {
        let parsed = Url::parse(url).map_err(|e| RunError::reference(raw, e))?;
        let scheme = parsed.scheme().to_ascii_lowercase();
        match scheme.as_str() {
            "http" | "https" => {
                debug!(url = %parsed, "fetching parameter");
                let res = self
                    .client
                    .get(parsed)
                    .send()
                    .await
                    .map_err(|e| RunError::reference(raw, e))?;
                if !res.status().is_success() {
                    return Err(RunError::reference(
                        raw,
                        format!("server answered {}", res.status()),
                    ));
                }
                let body = res.text().await.map_err(|e| RunError::reference(raw, e))?;
                serde_json::from_str(&body).map_err(|e| RunError::reference(raw, e))
            }
            "ftp" => {
                debug!(url = %parsed, "fetching parameter over ftp");
                let timeout = self.timeout;
                let owned = raw.to_string();
                let body = tokio::task::spawn_blocking(move || ftp_get(&owned, &parsed, timeout))
                    .await
                    .map_err(|e| RunError::reference(raw, e))??;
                serde_json::from_str(&body).map_err(|e| RunError::reference(raw, e))
            }
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|()| RunError::reference(raw, "not a local file URL"))?;
                read_json_file(raw, &path)
            }
            other => Err(RunError::reference(
                raw,
                format!("unsupported URL scheme `{other}`"),
            )),
        }
    }

    pub async fn resolve_coefficients(&self, raw: &str) -> Result<CoefficientSet, RunError> {
        let value = self.resolve(raw).await?;
        Ok(CoefficientSet::from_value(&value)?)
    }

    /// Provider parameters; a bare name invokes the registered params
    /// provider with `cli_args`.
    pub async fn resolve_provider_params(
        &self,
        raw: &str,
        cli_args: &ProviderArgs,
        registry: &ProviderRegistry,
    ) -> Result<ProviderArgs, RunError> {
        let value = match self.classify(raw) {
            ParamReference::Named(name) => {
                let provider = registry.params(&name)?;
                return provider
                    .compute_params(cli_args)
                    .map_err(|e| RunError::from_provider(provider.name(), e));
            }
            reference => self.load(raw, reference).await?,
        };
        match value {
            Value::Object(map) => Ok(map),
            other => Err(RunError::reference(
                raw,
                format!("provider parameters must be a JSON object, got {other}"),
            )),
        }
    }

    /// Overrides; a bare name invokes the registered override provider, and
    /// a name nobody registered means no overrides.
    pub async fn resolve_overrides(
        &self,
        raw: &str,
        cli_args: &ProviderArgs,
        registry: &ProviderRegistry,
    ) -> Result<OverrideSet, RunError> {
        match self.classify(raw) {
            ParamReference::Named(name) => match registry.overrides(&name) {
                Ok(provider) => provider
                    .compute_overrides(cli_args)
                    .map_err(|e| RunError::from_provider(provider.name(), e)),
                Err(err) => {
                    warn!(error = %err, "no override provider; using no overrides");
                    Ok(OverrideSet::new())
                }
            },
            reference => {
                let value = self.load(raw, reference).await?;
                OverrideSet::from_value(&value).map_err(|e| RunError::reference(raw, e))
            }
        }
    }

    /// A registered runtime provider by name, or a fixed record set when the
    /// reference resolves to a JSON array.
    pub async fn resolve_runtime_provider(
        &self,
        raw: &str,
        registry: &ProviderRegistry,
    ) -> Result<Arc<dyn RuntimeMetricsProvider>, RunError> {
        let value = match self.classify(raw) {
            ParamReference::Named(name) => return Ok(registry.runtime(&name)?),
            reference => self.load(raw, reference).await?,
        };
        let records: Vec<MetricRecord> =
            serde_json::from_value(value).map_err(|e| RunError::reference(raw, e))?;
        build_runtime_provider(RuntimeProviderConfig::Static(records))
            .map_err(|e| RunError::from_provider("static", e))
    }

    pub async fn resolve_minutes(&self, raw: &str, what: &str) -> Result<i64, RunError> {
        let value = self.resolve(raw).await?;
        as_whole_minutes(&value)
            .ok_or_else(|| RunError::reference(raw, format!("{what} must be a whole number of minutes")))
    }

    pub async fn resolve_float(&self, raw: &str, what: &str) -> Result<f64, RunError> {
        let value = self.resolve(raw).await?;
        as_float(what, &value).map_err(|e| RunError::reference(raw, e))
    }
}

/// Blocking RETR of `url`, anonymous unless the URL carries credentials.
fn ftp_get(raw: &str, url: &Url, timeout: Duration) -> Result<String, RunError> {
    let host = url
        .host_str()
        .ok_or_else(|| RunError::reference(raw, "ftp URL has no host"))?;
    let addr = (host, url.port().unwrap_or(21))
        .to_socket_addrs()
        .map_err(|e| RunError::reference(raw, e))?
        .next()
        .ok_or_else(|| RunError::reference(raw, format!("cannot resolve host {host}")))?;

    let mut ftp = FtpStream::connect_timeout(addr, timeout).map_err(|e| RunError::reference(raw, e))?;
    ftp.get_ref()
        .set_read_timeout(Some(timeout))
        .map_err(|e| RunError::reference(raw, e))?;
    let user = match url.username() {
        "" => "anonymous",
        user => user,
    };
    ftp.login(user, url.password().unwrap_or("anonymous"))
        .map_err(|e| RunError::reference(raw, e))?;
    let body = ftp
        .retr_as_buffer(url.path())
        .map_err(|e| RunError::reference(raw, e))?;
    let _ = ftp.quit();
    String::from_utf8(body.into_inner()).map_err(|e| RunError::reference(raw, e))
}

fn read_json_file(raw: &str, path: &Path) -> Result<Value, RunError> {
    let content = fs::read_to_string(path).map_err(|e| RunError::reference(raw, e))?;
    serde_json::from_str(&content).map_err(|e| RunError::reference(raw, e))
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn as_whole_minutes(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            (f.fract() == 0.0 && f.abs() < 1.0e12).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
