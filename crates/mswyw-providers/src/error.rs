use thiserror::Error;

use crate::types::ProviderRole;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("provider returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider API error: status={status}, body={body}")]
    Api { status: u16, body: String },
}

impl ProviderError {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cannot resolve `{name}`: no {role} provider registered under that name")]
    Unregistered { role: ProviderRole, name: String },
}
