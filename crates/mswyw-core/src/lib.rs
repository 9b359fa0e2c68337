pub mod coefficients;
pub mod error;
pub mod formula;
pub mod overrides;
pub mod record;
pub mod window;

pub use coefficients::*;
pub use error::ConfigError;
pub use formula::*;
pub use overrides::*;
pub use record::*;
pub use window::*;
