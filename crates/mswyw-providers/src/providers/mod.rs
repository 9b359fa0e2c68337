pub mod elastic;
pub mod env;
pub mod formula;
pub mod new_relic;
pub mod static_records;

pub use elastic::ElasticMetricsProvider;
pub use env::{EnvOverrideProvider, EnvParamsProvider};
pub use formula::LinearFormula;
pub use new_relic::NewRelicMetricsProvider;
pub use static_records::StaticMetricsProvider;
