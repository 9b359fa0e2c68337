pub mod error;
pub mod logging;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod settings;

pub use error::RunError;
pub use report::RunReport;
pub use resolver::{ParamReference, ParamResolver};
pub use runner::{RunStage, Runner};
pub use settings::RunSettings;
