pub mod config;
pub mod error;
pub mod types;

pub use config::ScriptEngineConfig;
pub use error::ScriptEngineError;
pub use types::*;
