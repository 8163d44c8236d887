mod collect;
mod context;
mod context_pool;
mod immediate;
mod lifecycle;

pub use context::{ContextState, ScriptContext};
pub use context_pool::{ContextPool, MAX_SCRIPT_NESTING_LEVEL};
pub use immediate::IMMEDIATE_MODULE_NAME;
pub use lifecycle::ScriptEngine;
