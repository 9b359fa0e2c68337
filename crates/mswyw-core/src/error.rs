use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing coefficient {0}")]
    MissingCoefficient(&'static str),

    #[error("{name} is set to {value}, which is not a valid number")]
    NotANumber { name: String, value: String },

    #[error("{what} must be a JSON object, got {got}")]
    NotAnObject { what: &'static str, got: String },

    #[error("unknown metric `{0}` (expected one of mem, cpu, rpm, epm, apdex, endpoints)")]
    UnknownMetric(String),

    #[error("invalid sampling window: {0}")]
    Window(String),
}
