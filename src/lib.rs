pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod sink;
pub mod table;
pub mod window;

pub use config::{FetchSettings, PipelineVars, RunEnv};
pub use error::ExtractError;
pub use extract::Extractor;
