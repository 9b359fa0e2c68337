pub mod aggregate;
pub mod config;
pub mod error;
pub mod factory;
pub mod providers;
pub mod traits;
pub mod types;

pub use aggregate::collect_metrics;
pub use config::*;
pub use error::{ProviderError, ResolveError};
pub use factory::*;
pub use providers::{
    ElasticMetricsProvider, EnvOverrideProvider, EnvParamsProvider, LinearFormula,
    NewRelicMetricsProvider, StaticMetricsProvider,
};
pub use traits::*;
pub use types::*;
